//! The per-row pipeline service.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::PipelineError;
use crate::ports::{ListRegistry, NameDirectory};
use crate::retry::RetryPolicy;
use relay_codec::decode_operation;
use relay_dispatch::{DeliveryReport, Dispatcher, Messenger, RecipientGroups};
use relay_index::{SubscriptionIndex, SubscriptionStore};
use relay_types::{format_address, Address, FeedRow, LIST_OP_EVENT};

/// Pipeline policy knobs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// When set, rows whose operator has no primary list are dropped as
    /// noise. Off by default; some deployments skip the check entirely.
    pub require_primary_list: bool,
    /// Retry policy for on-chain reads and name lookups.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            require_primary_list: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Terminal state of one row's pipeline.
#[derive(Debug)]
pub enum RowOutcome {
    /// Not a list-operation row.
    Ignored,
    /// The acting address could not be resolved from the role slot.
    ResolutionFailed,
    /// The operation blob was malformed.
    DecodeFailed,
    /// Strict mode: the operator has no primary list.
    NotValidated,
    /// Nobody watches either party.
    NoRecipients,
    /// Delivered (or attempted) to every distinct recipient.
    Dispatched(DeliveryReport),
}

/// Orchestrates one change-feed row end to end.
///
/// Shared across rows via `Arc`; holds no per-row mutable state, so
/// concurrent rows cannot corrupt each other.
pub struct EventPipeline<S, R, N, M>
where
    S: SubscriptionStore,
    R: ListRegistry,
    N: NameDirectory,
    M: Messenger,
{
    index: SubscriptionIndex<S>,
    registry: Arc<R>,
    names: Arc<N>,
    dispatcher: Dispatcher<M>,
    config: PipelineConfig,
}

impl<S, R, N, M> EventPipeline<S, R, N, M>
where
    S: SubscriptionStore,
    R: ListRegistry,
    N: NameDirectory,
    M: Messenger,
{
    pub fn new(
        index: SubscriptionIndex<S>,
        registry: Arc<R>,
        names: Arc<N>,
        dispatcher: Dispatcher<M>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            index,
            registry,
            names,
            dispatcher,
            config,
        }
    }

    /// Run the full pipeline for one row.
    ///
    /// Only a store failure is an `Err`; every other failure mode is a
    /// logged terminal [`RowOutcome`].
    pub async fn handle_row(&self, row: &FeedRow) -> Result<RowOutcome, PipelineError> {
        if row.event_name != LIST_OP_EVENT {
            debug!(event = %row.event_name, "Ignoring non list-op row");
            return Ok(RowOutcome::Ignored);
        }

        // Step 2: who performed the operation.
        let operator = match self
            .config
            .retry
            .run("list_user", || {
                self.registry
                    .list_user(row.event_args.slot, row.chain_id, row.contract_address)
            })
            .await
        {
            Ok(address) => address,
            Err(e) => {
                warn!(
                    slot = %row.event_args.slot,
                    chain_id = row.chain_id,
                    error = %e,
                    "Role slot resolution failed, dropping row"
                );
                return Ok(RowOutcome::ResolutionFailed);
            }
        };

        // Step 3: what they did.
        let operation = match decode_operation(&row.event_args.op) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(op = %row.event_args.op, error = %e, "Undecodable operation, dropping row");
                return Ok(RowOutcome::DecodeFailed);
            }
        };

        // Step 4: strict mode suppresses operations on non-primary lists.
        if self.config.require_primary_list && !self.operator_validated(operator).await {
            info!(operator = %format_address(&operator), "Operator has no primary list, dropping row");
            return Ok(RowOutcome::NotValidated);
        }

        // Step 5: who cares. Two logical groups, target-watchers first.
        let target = operation.record_address;
        let groups = RecipientGroups::new(
            self.index.list_subscribers(&target).await?,
            self.index.list_subscribers(&operator).await?,
        );

        // Step 6: short-circuit before any name resolution.
        if groups.is_empty() {
            debug!(
                operator = %format_address(&operator),
                target = %format_address(&target),
                "No subscribers for either party"
            );
            return Ok(RowOutcome::NoRecipients);
        }

        // Step 7: names, falling back to the raw address.
        let operator_name = self.display_name(operator).await;
        let target_name = self.display_name(target).await;

        // Step 8: fan out.
        let report = self
            .dispatcher
            .notify(&operation, &operator_name, &target_name, &groups)
            .await;
        info!(
            delivered = report.delivered(),
            failed = report.failed(),
            action = operation.opcode.description(),
            "Row dispatched"
        );
        Ok(RowOutcome::Dispatched(report))
    }

    /// Whether the operator has designated a primary list. A resolution
    /// error counts as not validated; it never crashes the row.
    async fn operator_validated(&self, operator: Address) -> bool {
        match self
            .config
            .retry
            .run("primary_list", || self.registry.primary_list(operator))
            .await
        {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(operator = %format_address(&operator), error = %e, "Primary list lookup failed");
                false
            }
        }
    }

    async fn display_name(&self, address: Address) -> String {
        match self
            .config
            .retry
            .run("name_for_address", || self.names.name_for_address(address))
            .await
        {
            Ok(Some(name)) => name,
            Ok(None) => format_address(&address),
            Err(e) => {
                warn!(address = %format_address(&address), error = %e, "Name resolution failed, using raw address");
                format_address(&address)
            }
        }
    }
}
