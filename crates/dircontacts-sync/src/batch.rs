//! Batch submitter
//!
//! Inserts and deletes of one account are queued and sent as combined
//! requests of at most `max` operations. A rejected operation is logged
//! with enough context to find the contact and never aborts the run.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use dircontacts_core::ports::{BatchOperation, BatchOutcome, IContactStore};

/// Bounded queue of pending writes for one account
#[derive(Debug)]
pub struct BatchSubmitter {
    max: usize,
    pending: Vec<BatchOperation>,
}

impl BatchSubmitter {
    /// A submitter flushing every `max` operations. Zero is treated as one.
    #[must_use]
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            max,
            pending: Vec::with_capacity(max),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Queue an operation, submitting the queue once it is full.
    ///
    /// Returns the outcomes of the submitted batch, or an empty vector
    /// when nothing was sent.
    ///
    /// # Errors
    /// Returns an error only if the store could not be reached at all.
    pub async fn push(
        &mut self,
        store: &dyn IContactStore,
        operation: BatchOperation,
    ) -> Result<Vec<BatchOutcome>> {
        self.pending.push(operation);
        if self.pending.len() >= self.max {
            return self.flush(store).await;
        }
        Ok(Vec::new())
    }

    /// Submit everything still queued.
    ///
    /// # Errors
    /// Returns an error only if the store could not be reached at all.
    pub async fn flush(&mut self, store: &dyn IContactStore) -> Result<Vec<BatchOutcome>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }

        let operations = std::mem::take(&mut self.pending);
        let account = store.account();
        debug!(account = %account, operations = operations.len(), "Submitting batch");

        let outcomes = store
            .submit_batch(&operations)
            .await
            .with_context(|| format!("Failed to submit batch for {account}"))?;

        for outcome in outcomes.iter().filter(|o| !o.is_success()) {
            let contact = operations.get(outcome.batch_id).map(BatchOperation::contact);
            warn!(
                account = %account,
                operation = %outcome.kind,
                batch_id = outcome.batch_id,
                status = outcome.status_code,
                reason = %outcome.reason,
                resource = outcome
                    .entity_id
                    .as_deref()
                    .or_else(|| contact.map(|c| c.display_id()))
                    .unwrap_or("(unknown)"),
                contact = outcome
                    .entity_name
                    .as_deref()
                    .or_else(|| contact.map(|c| c.display_name()))
                    .unwrap_or("(unknown)"),
                "Batch operation failed"
            );
        }

        Ok(outcomes)
    }
}
