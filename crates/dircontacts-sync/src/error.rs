//! Sync error types

use thiserror::Error;

/// Errors surfaced by single-record writes during a sync pass
///
/// These never abort the run: the reconciler logs them and moves on to the
/// next contact, leaving the rejected one in its prior state.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store refused a conditional update
    #[error("Update of {contact} for {account} rejected: {reason}")]
    UpdateRejected {
        account: String,
        contact: String,
        reason: String,
    },
}
