//! Opt-out source port (driven/secondary port)

use std::collections::HashSet;

use async_trait::async_trait;

/// Port for fetching the addresses of users who opted out of receiving
/// the managed contacts
#[async_trait]
pub trait IOptOutSource: Send + Sync {
    /// Lower-cased email addresses that must not be targeted.
    ///
    /// # Errors
    /// Fails when the list cannot be fetched or has an unexpected shape;
    /// both are fatal to a run.
    async fn fetch_opt_out_list(&self) -> anyhow::Result<HashSet<String>>;
}

/// Opt-out source for deployments without an opt-out service
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOptOut;

#[async_trait]
impl IOptOutSource for NoOptOut {
    async fn fetch_opt_out_list(&self) -> anyhow::Result<HashSet<String>> {
        Ok(HashSet::new())
    }
}
