//! Run and per-account operation counts

use chrono::{DateTime, Utc};
use serde::Serialize;

use dircontacts_core::ports::{BatchOperationKind, BatchOutcome};

/// Counts of what one account's pass did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Contacts created
    pub inserted: u32,
    /// Managed contacts rewritten from fresh directory data
    pub updated: u32,
    /// Surplus contacts given the rename suffix
    pub renamed: u32,
    /// Renamed contacts whose user came back
    pub restored: u32,
    /// Contacts removed, by surplus deletion or undo
    pub deleted: u32,
    /// Managed groups removed by undo
    pub groups_deleted: u32,
    /// Writes rejected by the store and records that could not be built
    pub failed: u32,
}

impl AccountSummary {
    #[must_use]
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            started_at: Utc::now(),
            finished_at: None,
            inserted: 0,
            updated: 0,
            renamed: 0,
            restored: 0,
            deleted: 0,
            groups_deleted: 0,
            failed: 0,
        }
    }

    /// Tally the outcomes of one submitted batch.
    pub fn record_batch(&mut self, outcomes: &[BatchOutcome]) {
        for outcome in outcomes {
            if !outcome.is_success() {
                self.failed += 1;
                continue;
            }
            match outcome.kind {
                BatchOperationKind::Insert => self.inserted += 1,
                BatchOperationKind::Delete => self.deleted += 1,
            }
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Total number of successful writes.
    #[must_use]
    pub fn changes(&self) -> u32 {
        self.inserted + self.updated + self.renamed + self.deleted + self.groups_deleted
    }
}

/// Summary of a whole run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub undo: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub accounts: Vec<AccountSummary>,
}

impl RunSummary {
    #[must_use]
    pub fn new(undo: bool) -> Self {
        Self {
            undo,
            started_at: Utc::now(),
            finished_at: None,
            accounts: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    #[must_use]
    pub fn account(&self, account: &str) -> Option<&AccountSummary> {
        self.accounts.iter().find(|a| a.account == account)
    }

    #[must_use]
    pub fn total_failed(&self) -> u32 {
        self.accounts.iter().map(|a| a.failed).sum()
    }

    #[must_use]
    pub fn total_changes(&self) -> u32 {
        self.accounts.iter().map(AccountSummary::changes).sum()
    }
}
