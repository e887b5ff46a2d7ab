//! # Event Pipeline
//!
//! The orchestrator: one [`pipeline::EventPipeline::handle_row`] invocation
//! per change-feed row, running the sequence
//!
//! 1. filter by event kind,
//! 2. resolve the acting address from the role slot,
//! 3. decode the operation blob,
//! 4. (strict mode) validate the operator's primary list,
//! 5. look up subscribers of target and operator,
//! 6. short-circuit when nobody is watching,
//! 7. resolve human-readable names (raw address fallback),
//! 8. dispatch.
//!
//! Rows are independent: the pipeline holds no per-row scratch state, so
//! concurrent rows may interleave their external calls freely. External
//! lookups at the pipeline boundary are wrapped in a bounded
//! retry-with-backoff policy; the codec and the index are never retried.

pub mod error;
pub mod pipeline;
pub mod ports;
pub mod retry;

pub use error::PipelineError;
pub use pipeline::{EventPipeline, PipelineConfig, RowOutcome};
pub use ports::{DirectoryError, ListRegistry, NameDirectory, RegistryError};
pub use retry::RetryPolicy;
