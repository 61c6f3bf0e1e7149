//! The undo pass for one account
//!
//! Removes everything the system created, in a fixed order:
//!
//! 1. Every managed contact found in the full contact listing
//! 2. Managed members reachable only through the managed group
//! 3. The managed group itself, last

use std::collections::HashSet;

use anyhow::{Context, Result};
use tracing::{debug, info};

use dircontacts_core::domain::ResourceName;
use dircontacts_core::ports::BatchOperation;

use crate::session::AccountSession;

/// Delete all managed contacts and groups of the session's account.
///
/// # Errors
/// Returns an error when a listing fails, a batch cannot be submitted at
/// all, or a managed group cannot be deleted.
pub async fn undo_account(session: &mut AccountSession<'_>) -> Result<()> {
    let context = session.context();
    let account = session.account().clone();

    let contacts = session
        .store()
        .list_contacts(None, context.max_contacts)
        .await
        .with_context(|| format!("Failed to list contacts of {account}"))?;

    let mut removed: HashSet<ResourceName> = HashSet::new();
    for contact in contacts {
        if !context.scheme.is_managed(&contact.markers) {
            continue;
        }
        if let Some(resource) = &contact.resource_name {
            removed.insert(resource.clone());
        }
        session.queue(BatchOperation::Delete(contact)).await?;
    }
    session.flush().await?;
    debug!(account = %account, contacts = removed.len(), "Global sweep done");

    let groups = session
        .store()
        .list_groups()
        .await
        .with_context(|| format!("Failed to list contact groups of {account}"))?;

    for group in groups
        .iter()
        .filter(|g| context.scheme.is_managed_group(&g.markers))
    {
        let members = session
            .store()
            .list_contacts(Some(group), context.max_contacts)
            .await
            .with_context(|| format!("Failed to list members of {} for {account}", group.title))?;

        let mut leftovers = 0usize;
        for member in members {
            if !context.scheme.is_managed(&member.markers) {
                continue;
            }
            if let Some(resource) = &member.resource_name {
                if !removed.insert(resource.clone()) {
                    continue;
                }
            }
            leftovers += 1;
            session.queue(BatchOperation::Delete(member)).await?;
        }
        session.flush().await?;
        debug!(account = %account, group = %group.resource_name, leftovers, "Group sweep done");

        session
            .store()
            .delete_group(group)
            .await
            .with_context(|| format!("Failed to delete group {} for {account}", group.title))?;
        session.summary_mut().groups_deleted += 1;
        info!(account = %account, group = %group.resource_name, "Deleted managed group");
    }

    Ok(())
}
