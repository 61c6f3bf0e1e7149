//! The sync pass for one account
//!
//! ## Flow
//!
//! 1. Find the managed group by its marker, creating it when absent
//! 2. List the group's members
//! 3. Queue an insert for every desired record with no member carrying its
//!    identifier
//! 4. Merge fresh directory data into every managed member still desired,
//!    writing it back only when something changed
//! 5. Delete or rename the managed members no longer desired
//! 6. Flush the batch
//!
//! Updates are single conditional writes; inserts and deletes are batched.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use dircontacts_core::domain::{
    merge_fields, ContactGroup, ContactRecord, DirectoryRecord, EmployeeId, ResourceName,
    MY_CONTACTS_GROUP,
};
use dircontacts_core::options::SurplusPolicy;
use dircontacts_core::ports::BatchOperation;

use crate::session::AccountSession;

// ============================================================================
// Desired contacts
// ============================================================================

/// Source records keyed by employee identifier
///
/// Built once per run. Records without an identifier are dropped and only
/// the first record per identifier is kept, so iteration follows the
/// directory order.
#[derive(Debug, Clone, Default)]
pub struct DesiredContacts {
    records: Vec<(EmployeeId, DirectoryRecord)>,
    index: HashMap<EmployeeId, usize>,
}

impl DesiredContacts {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = DirectoryRecord>) -> Self {
        let mut desired = Self::default();
        for record in records {
            let Some(id) = record.employee_id().and_then(|id| EmployeeId::new(id).ok()) else {
                continue;
            };
            if desired.index.contains_key(&id) {
                continue;
            }
            desired.index.insert(id.clone(), desired.records.len());
            desired.records.push((id, record));
        }
        desired
    }

    #[must_use]
    pub fn get(&self, id: &EmployeeId) -> Option<&DirectoryRecord> {
        self.index.get(id).map(|&i| &self.records[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EmployeeId, &DirectoryRecord)> {
        self.records.iter().map(|(id, record)| (id, record))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Bring one account's managed group in line with `desired`.
///
/// # Errors
/// Returns an error when the group cannot be listed or created, the members
/// cannot be listed, or a batch cannot be submitted at all. Rejected single
/// writes and rejected batch items are logged and counted instead.
pub async fn reconcile_account(
    session: &mut AccountSession<'_>,
    desired: &DesiredContacts,
) -> Result<()> {
    let context = session.context();
    let account = session.account().clone();

    let groups = session
        .store()
        .list_groups()
        .await
        .with_context(|| format!("Failed to list contact groups of {account}"))?;
    let group = find_or_create_group(session, &groups).await?;

    let my_contacts = if context.options.add_to_my_contacts {
        Some(match groups.iter().find(|g| g.is_my_contacts()) {
            Some(g) => g.resource_name.clone(),
            None => ResourceName::new(MY_CONTACTS_GROUP)?,
        })
    } else {
        None
    };

    let members = session
        .store()
        .list_contacts(Some(&group), context.max_contacts)
        .await
        .with_context(|| format!("Failed to list members of {} for {account}", group.title))?;
    debug!(
        account = %account,
        group = %group.resource_name,
        members = members.len(),
        desired = desired.len(),
        "Reconciling managed group"
    );

    let present: HashSet<EmployeeId> = members
        .iter()
        .filter_map(|m| context.scheme.employee_id(&m.markers))
        .filter_map(|id| EmployeeId::new(id).ok())
        .collect();

    for (id, record) in desired.iter().filter(|(id, _)| !present.contains(*id)) {
        let Some(mut contact) = build_contact(session, id, record) else {
            continue;
        };
        context.scheme.tag_managed(&mut contact.markers, id);
        contact.add_membership(&group.resource_name);
        if let Some(my_contacts) = &my_contacts {
            contact.add_membership(my_contacts);
        }
        debug!(account = %account, contact = contact.display_name(), employee_id = %id, "Queueing insert");
        session.queue(BatchOperation::Insert(contact)).await?;
    }

    for member in members {
        if !context.scheme.is_managed(&member.markers) {
            continue;
        }
        let Some(id) = context
            .scheme
            .employee_id(&member.markers)
            .and_then(|id| EmployeeId::new(id).ok())
        else {
            debug!(account = %account, resource = member.display_id(), "Managed member has no identifier");
            continue;
        };

        match desired.get(&id) {
            Some(record) => refresh_member(session, &id, record, member).await,
            None => handle_surplus(session, member).await?,
        }
    }

    session.flush().await
}

async fn find_or_create_group(
    session: &AccountSession<'_>,
    groups: &[ContactGroup],
) -> Result<ContactGroup> {
    let scheme = &session.context().scheme;
    if let Some(group) = groups.iter().find(|g| scheme.is_managed_group(&g.markers)) {
        return Ok(group.clone());
    }

    let title = &session.context().options.group_title;
    let group = session
        .store()
        .create_group(title, &scheme.group_markers())
        .await
        .with_context(|| format!("Failed to create group {title} for {}", session.account()))?;
    info!(
        account = %session.account(),
        group = %group.resource_name,
        title = %group.title,
        "Created managed group"
    );
    Ok(group)
}

/// Transform a directory record, logging and counting records that cannot
/// become contacts.
fn build_contact(
    session: &mut AccountSession<'_>,
    id: &EmployeeId,
    record: &DirectoryRecord,
) -> Option<ContactRecord> {
    match session.context().builder.build(record) {
        Ok(contact) => Some(contact),
        Err(e) => {
            warn!(
                account = %session.account(),
                employee_id = %id,
                contact = record.primary_email().unwrap_or("(no email)"),
                error = %e,
                "Skipping directory record"
            );
            session.summary_mut().failed += 1;
            None
        }
    }
}

/// Merge fresh directory data into a managed member still in the directory.
async fn refresh_member(
    session: &mut AccountSession<'_>,
    id: &EmployeeId,
    record: &DirectoryRecord,
    mut member: ContactRecord,
) {
    let context = session.context();
    let mut modified = false;
    let mut restored = false;

    if matches!(context.options.surplus, SurplusPolicy::Rename { .. })
        && context.scheme.is_renamed(&member.markers)
    {
        member.strip_rename_suffix();
        context.scheme.untag_renamed(&mut member.markers);
        modified = true;
        restored = true;
    }

    let Some(draft) = build_contact(session, id, record) else {
        return;
    };
    modified |= merge_fields(&draft, &mut member);
    if !modified {
        return;
    }

    if session.update(&member).await.is_ok() {
        let summary = session.summary_mut();
        summary.updated += 1;
        if restored {
            summary.restored += 1;
            info!(
                account = %session.account(),
                contact = member.display_name(),
                employee_id = %id,
                "Restored renamed contact"
            );
        }
    }
}

/// Apply the surplus policy to a managed member gone from the directory.
async fn handle_surplus(session: &mut AccountSession<'_>, mut member: ContactRecord) -> Result<()> {
    let context = session.context();
    match &context.options.surplus {
        SurplusPolicy::Keep => {}
        SurplusPolicy::Delete => {
            debug!(
                account = %session.account(),
                contact = member.display_name(),
                resource = member.display_id(),
                "Queueing delete of surplus contact"
            );
            session.queue(BatchOperation::Delete(member)).await?;
        }
        SurplusPolicy::Rename { suffix } => {
            if context.scheme.is_renamed(&member.markers) {
                return Ok(());
            }
            member.apply_rename_suffix(suffix);
            context.scheme.tag_renamed(&mut member.markers);
            if session.update(&member).await.is_ok() {
                session.summary_mut().renamed += 1;
                info!(
                    account = %session.account(),
                    contact = member.display_name(),
                    resource = member.display_id(),
                    "Renamed surplus contact"
                );
            }
        }
    }
    Ok(())
}
