//! Contact store port (driven/secondary port)
//!
//! A contact store is always scoped to one target account ("acting as"
//! that account). [`IContactService`] hands out such scoped stores; the
//! reconciler only ever talks to one [`IContactStore`] at a time.
//!
//! ## Design Notes
//!
//! - Single-record `update` and `delete` are conditional writes (they carry
//!   the record's etag) and are issued outside the batch path.
//! - `submit_batch` reports per-operation outcomes instead of failing, so
//!   one rejected write never hides the others.

use std::fmt::{self, Display, Formatter};

use async_trait::async_trait;

use crate::domain::{ContactGroup, ContactRecord, Email, Markers};

/// Kind of a batched write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchOperationKind {
    Insert,
    Delete,
}

impl Display for BatchOperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => f.write_str("insert"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// A write queued for batch submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Insert(ContactRecord),
    Delete(ContactRecord),
}

impl BatchOperation {
    #[must_use]
    pub fn kind(&self) -> BatchOperationKind {
        match self {
            Self::Insert(_) => BatchOperationKind::Insert,
            Self::Delete(_) => BatchOperationKind::Delete,
        }
    }

    #[must_use]
    pub fn contact(&self) -> &ContactRecord {
        match self {
            Self::Insert(contact) | Self::Delete(contact) => contact,
        }
    }
}

/// Result of one operation within a submitted batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub kind: BatchOperationKind,
    /// Position of the operation within the submitted batch
    pub batch_id: usize,
    /// HTTP-style status code reported for the operation
    pub status_code: u16,
    pub reason: String,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
}

impl BatchOutcome {
    /// Success covers the 2xx and 3xx ranges.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }
}

/// Port for one target account's contacts
#[async_trait]
pub trait IContactStore: Send + Sync {
    /// The account this store acts as.
    fn account(&self) -> &Email;

    async fn list_groups(&self) -> anyhow::Result<Vec<ContactGroup>>;

    async fn create_group(&self, title: &str, markers: &Markers) -> anyhow::Result<ContactGroup>;

    async fn delete_group(&self, group: &ContactGroup) -> anyhow::Result<()>;

    /// List contacts, optionally restricted to members of `group`, up to
    /// `max_results`.
    async fn list_contacts(
        &self,
        group: Option<&ContactGroup>,
        max_results: usize,
    ) -> anyhow::Result<Vec<ContactRecord>>;

    async fn insert(&self, contact: &ContactRecord) -> anyhow::Result<ContactRecord>;

    /// Conditional full-record update.
    async fn update(&self, contact: &ContactRecord) -> anyhow::Result<ContactRecord>;

    async fn delete(&self, contact: &ContactRecord) -> anyhow::Result<()>;

    /// Submit operations as one combined request. Outcomes are returned in
    /// submission order.
    async fn submit_batch(&self, operations: &[BatchOperation]) -> anyhow::Result<Vec<BatchOutcome>>;
}

/// Port handing out per-account contact stores
#[async_trait]
pub trait IContactService: Send + Sync {
    /// Open a store acting as `account`.
    async fn acting_as(&self, account: &Email) -> anyhow::Result<Box<dyn IContactStore>>;
}
