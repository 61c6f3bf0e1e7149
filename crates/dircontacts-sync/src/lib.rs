//! dircontacts Sync - Per-account contact reconciliation
//!
//! Provides:
//! - Reconciliation of one account's managed group against the directory
//! - Bounded batching of inserts and deletes with per-item outcome logging
//! - The undo pass removing everything the system created
//! - Run and per-account summaries
//!
//! ## Modules
//!
//! - [`engine`] - Walks the target accounts and dispatches sync or undo
//! - [`session`] - Run-wide settings and the per-account session
//! - [`reconcile`] - The sync pass for one account
//! - [`undo`] - The undo pass for one account
//! - [`batch`] - Batch submitter
//! - [`summary`] - Operation counts

pub mod batch;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod summary;
pub mod undo;

pub use engine::{RunOutcome, SyncEngine};
pub use error::SyncError;
pub use reconcile::DesiredContacts;
pub use session::{AccountSession, SyncContext};
pub use summary::{AccountSummary, RunSummary};
