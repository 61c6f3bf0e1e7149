//! Run-wide settings and the per-account session
//!
//! [`SyncContext`] is built once per run and shared read-only by every
//! account. [`AccountSession`] holds everything scoped to the account being
//! processed: the store acting as that account, its pending batch and its
//! counts. Nothing carries over from one account to the next.

use anyhow::Result;
use tracing::{debug, warn};

use dircontacts_core::config::Config;
use dircontacts_core::domain::{
    ClassifierMapper, ContactBuilder, ContactRecord, Email, MarkerScheme,
};
use dircontacts_core::options::SyncOptions;
use dircontacts_core::ports::{BatchOperation, IContactStore};

use crate::batch::BatchSubmitter;
use crate::error::SyncError;
use crate::summary::AccountSummary;

/// Settings shared by every account of a run
#[derive(Debug, Clone)]
pub struct SyncContext {
    pub options: SyncOptions,
    pub scheme: MarkerScheme,
    pub builder: ContactBuilder,
    /// Operations per submitted batch
    pub batch_max: usize,
    /// Upper bound on contacts listed per account or group
    pub max_contacts: usize,
}

impl SyncContext {
    #[must_use]
    pub fn new(config: &Config, options: SyncOptions) -> Self {
        let builder = ContactBuilder::new(ClassifierMapper::new(config.default_relation()))
            .with_aliases(options.add_aliases)
            .with_other_emails(options.add_other_emails)
            .with_fallback_organization(options.organization_name.clone());

        Self {
            scheme: MarkerScheme::from_config(&config.markers),
            builder,
            batch_max: config.contacts.batch_max,
            max_contacts: config.contacts.max_contacts,
            options,
        }
    }
}

/// State of one target account's pass
pub struct AccountSession<'a> {
    context: &'a SyncContext,
    store: Box<dyn IContactStore>,
    batch: BatchSubmitter,
    summary: AccountSummary,
}

impl<'a> AccountSession<'a> {
    pub fn open(context: &'a SyncContext, store: Box<dyn IContactStore>) -> Self {
        let summary = AccountSummary::new(store.account().as_str());
        Self {
            context,
            batch: BatchSubmitter::new(context.batch_max),
            store,
            summary,
        }
    }

    #[must_use]
    pub fn context(&self) -> &'a SyncContext {
        self.context
    }

    #[must_use]
    pub fn account(&self) -> &Email {
        self.store.account()
    }

    #[must_use]
    pub fn store(&self) -> &dyn IContactStore {
        self.store.as_ref()
    }

    pub fn summary_mut(&mut self) -> &mut AccountSummary {
        &mut self.summary
    }

    /// Queue a batched write, submitting when the batch is full.
    ///
    /// # Errors
    /// Returns an error if a full batch could not be submitted at all.
    pub async fn queue(&mut self, operation: BatchOperation) -> Result<()> {
        let outcomes = self.batch.push(self.store.as_ref(), operation).await?;
        self.summary.record_batch(&outcomes);
        Ok(())
    }

    /// Submit whatever is still queued.
    ///
    /// # Errors
    /// Returns an error if the batch could not be submitted at all.
    pub async fn flush(&mut self) -> Result<()> {
        let outcomes = self.batch.flush(self.store.as_ref()).await?;
        self.summary.record_batch(&outcomes);
        Ok(())
    }

    /// Write one contact outside the batch path.
    ///
    /// A rejection is logged, counted as a failure and returned as a typed
    /// error; the contact keeps its prior state in the store.
    pub async fn update(&mut self, contact: &ContactRecord) -> Result<ContactRecord, SyncError> {
        match self.store.update(contact).await {
            Ok(updated) => {
                debug!(
                    account = %self.account(),
                    contact = contact.display_name(),
                    resource = contact.display_id(),
                    "Contact updated"
                );
                Ok(updated)
            }
            Err(e) => {
                let error = SyncError::UpdateRejected {
                    account: self.account().to_string(),
                    contact: contact.display_name().to_string(),
                    reason: format!("{e:#}"),
                };
                warn!(
                    account = %self.account(),
                    contact = contact.display_name(),
                    resource = contact.display_id(),
                    operation = "update",
                    error = %error,
                    "Contact update failed"
                );
                self.summary.failed += 1;
                Err(error)
            }
        }
    }

    /// Close the session, returning its counts.
    #[must_use]
    pub fn finish(mut self) -> AccountSummary {
        self.summary.finish();
        self.summary
    }
}
