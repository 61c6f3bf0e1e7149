//! Run orchestration
//!
//! The [`SyncEngine`] walks the target accounts one at a time, in random
//! order, and runs either the sync pass or the undo pass for each. An
//! account's pass completes before the next account starts.
//!
//! ## Failure handling
//!
//! Rejected writes are logged and counted by the pass itself. Any other
//! error aborts the whole run; accounts already processed keep their
//! changes.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, instrument, warn};

use dircontacts_core::ports::IContactService;
use dircontacts_core::usecases::select_users::Selection;

use crate::reconcile::{reconcile_account, DesiredContacts};
use crate::session::{AccountSession, SyncContext};
use crate::summary::RunSummary;
use crate::undo::undo_account;

/// Result of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing could be done; the reason is reported as a warning.
    NothingToDo(String),
    Completed(RunSummary),
}

/// Drives the per-account passes of a run
pub struct SyncEngine {
    contacts: Arc<dyn IContactService>,
    context: SyncContext,
}

impl SyncEngine {
    pub fn new(contacts: Arc<dyn IContactService>, context: SyncContext) -> Self {
        Self { contacts, context }
    }

    #[must_use]
    pub fn context(&self) -> &SyncContext {
        &self.context
    }

    /// Process every target account of `selection`.
    ///
    /// In sync mode an empty source set is nothing to do; an empty target
    /// set is nothing to do in either mode. Undo ignores the sources.
    ///
    /// # Errors
    /// Returns the first error that is not a rejected write, after which no
    /// further account is processed.
    pub async fn run(&self, selection: Selection) -> Result<RunOutcome> {
        self.run_with_rng(selection, &mut StdRng::from_entropy()).await
    }

    /// [`SyncEngine::run`] with a caller-supplied shuffle source.
    ///
    /// # Errors
    /// See [`SyncEngine::run`].
    #[instrument(skip_all, fields(undo = self.context.options.undo))]
    pub async fn run_with_rng<R: Rng + ?Sized>(
        &self,
        mut selection: Selection,
        rng: &mut R,
    ) -> Result<RunOutcome> {
        let undo = self.context.options.undo;

        if !undo && selection.sources.is_empty() {
            warn!("No directory users selected as contacts");
            return Ok(RunOutcome::NothingToDo(
                "no directory users match the selection".into(),
            ));
        }
        if selection.targets.is_empty() {
            warn!("No target accounts selected");
            return Ok(RunOutcome::NothingToDo(
                "no target accounts match the user pattern".into(),
            ));
        }

        selection.shuffle_targets(rng);
        let desired = if undo {
            DesiredContacts::default()
        } else {
            DesiredContacts::new(std::mem::take(&mut selection.sources))
        };
        info!(
            sources = desired.len(),
            targets = selection.targets.len(),
            undo,
            "Starting run"
        );

        let mut summary = RunSummary::new(undo);
        for account in &selection.targets {
            let store = self
                .contacts
                .acting_as(account)
                .await
                .with_context(|| format!("Failed to open contacts of {account}"))?;
            let mut session = AccountSession::open(&self.context, store);

            let pass = if undo {
                undo_account(&mut session).await
            } else {
                reconcile_account(&mut session, &desired).await
            };
            pass.with_context(|| format!("Failed to process account {account}"))?;

            let account_summary = session.finish();
            info!(
                account = %account,
                inserted = account_summary.inserted,
                updated = account_summary.updated,
                renamed = account_summary.renamed,
                restored = account_summary.restored,
                deleted = account_summary.deleted,
                groups_deleted = account_summary.groups_deleted,
                failed = account_summary.failed,
                "Account processed"
            );
            summary.accounts.push(account_summary);
        }

        summary.finish();
        info!(
            accounts = summary.accounts.len(),
            changes = summary.total_changes(),
            failed = summary.total_failed(),
            "Run complete"
        );
        Ok(RunOutcome::Completed(summary))
    }
}
