//! User selection use case
//!
//! Walks the full paginated directory listing once and splits it into the
//! records to copy as contacts and the accounts that receive them. The
//! opt-out list is applied to the target accounts only.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::domain::{DirectoryRecord, Email};
use crate::options::SyncOptions;
use crate::ports::{IDirectorySource, IOptOutSource};

/// Patterns match the stored address as written, case included; only the
/// opt-out list ignores case.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Filters applied to each directory record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Selects records copied as contacts.
    pub select_pattern: Pattern,
    /// Selects accounts receiving the contacts.
    pub user_pattern: Pattern,
    /// Copy only records with a non-empty phone.
    pub require_phone: bool,
}

impl From<&SyncOptions> for SelectionCriteria {
    fn from(options: &SyncOptions) -> Self {
        Self {
            select_pattern: options.select_pattern.clone(),
            user_pattern: options.user_pattern.clone(),
            require_phone: options.require_phone,
        }
    }
}

/// Source records and target accounts of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub sources: Vec<DirectoryRecord>,
    pub targets: Vec<Email>,
}

impl Selection {
    /// Randomize the order in which target accounts are processed.
    pub fn shuffle_targets<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.targets.shuffle(rng);
    }
}

/// Split directory records into sources and targets.
///
/// A record is a source when its primary email matches the select pattern,
/// it carries an employee ID, and it has a phone if one is required. Only
/// the first record per employee ID is kept. A record's primary email is a
/// target when it matches the user pattern and is not in `opt_out`
/// (compared lower-cased).
pub fn select(
    records: impl IntoIterator<Item = DirectoryRecord>,
    criteria: &SelectionCriteria,
    opt_out: &HashSet<String>,
) -> Selection {
    let mut selection = Selection::default();
    let mut seen_ids = HashSet::new();
    let mut targets_seen = HashSet::new();

    for record in records {
        let Some(primary) = record.primary_email() else {
            continue;
        };

        if criteria.user_pattern.matches_with(primary, MATCH_OPTIONS) {
            match Email::new(primary) {
                Ok(email) if opt_out.contains(email.as_str()) => {
                    debug!(account = %email, "Target opted out");
                }
                Ok(email) => {
                    if targets_seen.insert(email.clone()) {
                        selection.targets.push(email);
                    }
                }
                Err(e) => warn!(account = primary, error = %e, "Skipping target with invalid email"),
            }
        }

        if !criteria.select_pattern.matches_with(primary, MATCH_OPTIONS) {
            continue;
        }
        if criteria.require_phone && !record.has_phone() {
            continue;
        }
        let Some(employee_id) = record.employee_id() else {
            continue;
        };
        if !seen_ids.insert(employee_id.to_string()) {
            warn!(
                employee_id,
                contact = primary,
                "Duplicate employee ID in directory, keeping first record"
            );
            continue;
        }
        selection.sources.push(record);
    }

    selection
}

/// Use case for selecting source records and target accounts
pub struct SelectUsersUseCase {
    directory: Arc<dyn IDirectorySource>,
    opt_out: Arc<dyn IOptOutSource>,
}

impl SelectUsersUseCase {
    pub fn new(directory: Arc<dyn IDirectorySource>, opt_out: Arc<dyn IOptOutSource>) -> Self {
        Self { directory, opt_out }
    }

    /// Fetch the opt-out list and the whole directory, then select.
    ///
    /// # Errors
    ///
    /// Returns an error if the opt-out list or any directory page cannot
    /// be fetched.
    pub async fn execute(
        &self,
        domain: &str,
        page_size: u32,
        criteria: &SelectionCriteria,
    ) -> Result<Selection> {
        let opt_out = self
            .opt_out
            .fetch_opt_out_list()
            .await
            .context("Failed to fetch opt-out list")?;

        let records = self.list_all(domain, page_size).await?;
        debug!(
            users = records.len(),
            opted_out = opt_out.len(),
            "Directory listing complete"
        );

        Ok(select(records, criteria, &opt_out))
    }

    async fn list_all(&self, domain: &str, page_size: u32) -> Result<Vec<DirectoryRecord>> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .directory
                .list_users(domain, page_size, page_token.as_deref())
                .await
                .with_context(|| format!("Failed to list directory users (page {})", pages + 1))?;
            pages += 1;
            records.extend(page.records);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(records)
    }
}
