//! Outbound ports for on-chain reads and name resolution.

use async_trait::async_trait;
use relay_types::{Address, U256};
use thiserror::Error;

/// Errors from on-chain read calls.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The remote call failed or returned an undecodable value.
    #[error("Chain read failed: {0}")]
    Call(String),
}

/// On-chain reads against the list-records and account-metadata contracts.
///
/// Both calls are point-in-time reads with no caching in the core.
#[async_trait]
pub trait ListRegistry: Send + Sync {
    /// Resolve the acting address for a role slot of a list-records
    /// contract on the given chain.
    async fn list_user(
        &self,
        slot: U256,
        chain_id: u64,
        contract: Address,
    ) -> Result<Address, RegistryError>;

    /// Resolve the user's primary list identity, or `None` when the user
    /// has not designated one.
    async fn primary_list(&self, user: Address) -> Result<Option<U256>, RegistryError>;
}

/// Errors from the name-resolution service.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    #[error("Name lookup failed: {0}")]
    Lookup(String),
}

/// Address <-> human-name lookups, single and batched.
#[async_trait]
pub trait NameDirectory: Send + Sync {
    /// Resolve a human name to an address, `None` when unknown.
    async fn address_for_name(&self, name: &str) -> Result<Option<Address>, DirectoryError>;

    /// Resolve an address to a human name, `None` when it has none.
    async fn name_for_address(&self, address: Address) -> Result<Option<String>, DirectoryError>;

    /// Resolve many addresses at once, chunked internally. Returns one
    /// entry per input: the resolved name, or the raw address when
    /// resolution failed for that entry.
    async fn names_for_addresses(
        &self,
        addresses: &[Address],
    ) -> Result<Vec<String>, DirectoryError>;
}
