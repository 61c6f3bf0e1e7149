//! Integration tests for SyncEngine
//!
//! These tests drive whole runs against an in-memory contact store that
//! records every write. Each test builds its own stores so runs never
//! share state.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use dircontacts_core::config::Config;
use dircontacts_core::domain::{
    Classifier, ContactGroup, ContactRecord, DirectoryRecord, Email, EmployeeId, MarkerScheme,
    Markers, PersonName, PhoneNumber, Relation, ResourceName, MY_CONTACTS_GROUP,
};
use dircontacts_core::options::{SyncFlags, SyncOptions};
use dircontacts_core::ports::{
    BatchOperation, BatchOperationKind, BatchOutcome, IContactService, IContactStore,
};
use dircontacts_core::usecases::Selection;
use dircontacts_sync::{RunOutcome, RunSummary, SyncContext, SyncEngine};

// ============================================================================
// In-memory contact store
// ============================================================================

#[derive(Default)]
struct StoreState {
    groups: Vec<ContactGroup>,
    contacts: Vec<ContactRecord>,
    /// Contacts missing from the full listing, reachable through groups only
    hidden: HashSet<ResourceName>,
    /// Every write, in order
    log: Vec<String>,
    batches: Vec<Vec<BatchOperation>>,
    updates: Vec<ContactRecord>,
    reject_updates: bool,
    next_id: usize,
}

impl StoreState {
    fn next_resource(&mut self, prefix: &str) -> ResourceName {
        self.next_id += 1;
        ResourceName::new(format!("{prefix}/{}", self.next_id)).unwrap()
    }

    fn find(&self, resource: &str) -> Option<&ContactRecord> {
        self.contacts
            .iter()
            .find(|c| c.resource_name.as_ref().map(ResourceName::as_str) == Some(resource))
    }
}

struct MemoryStore {
    account: Email,
    state: Arc<Mutex<StoreState>>,
}

#[async_trait]
impl IContactStore for MemoryStore {
    fn account(&self) -> &Email {
        &self.account
    }

    async fn list_groups(&self) -> Result<Vec<ContactGroup>> {
        Ok(self.state.lock().unwrap().groups.clone())
    }

    async fn create_group(&self, title: &str, markers: &Markers) -> Result<ContactGroup> {
        let mut state = self.state.lock().unwrap();
        let group = ContactGroup {
            resource_name: state.next_resource("contactGroups"),
            title: title.to_string(),
            markers: markers.clone(),
        };
        state.log.push(format!("create_group:{}", group.resource_name));
        state.groups.push(group.clone());
        Ok(group)
    }

    async fn delete_group(&self, group: &ContactGroup) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.groups.retain(|g| g.resource_name != group.resource_name);
        state.log.push(format!("delete_group:{}", group.resource_name));
        Ok(())
    }

    async fn list_contacts(
        &self,
        group: Option<&ContactGroup>,
        max_results: usize,
    ) -> Result<Vec<ContactRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contacts
            .iter()
            .filter(|c| match group {
                Some(g) => c.is_member_of(&g.resource_name),
                None => c
                    .resource_name
                    .as_ref()
                    .map_or(true, |rn| !state.hidden.contains(rn)),
            })
            .take(max_results)
            .cloned()
            .collect())
    }

    async fn insert(&self, contact: &ContactRecord) -> Result<ContactRecord> {
        let mut state = self.state.lock().unwrap();
        let mut stored = contact.clone();
        stored.resource_name = Some(state.next_resource("people"));
        state.contacts.push(stored.clone());
        Ok(stored)
    }

    async fn update(&self, contact: &ContactRecord) -> Result<ContactRecord> {
        let mut state = self.state.lock().unwrap();
        if state.reject_updates {
            anyhow::bail!("precondition failed");
        }
        let Some(slot) = state
            .contacts
            .iter_mut()
            .find(|c| c.resource_name == contact.resource_name)
        else {
            anyhow::bail!("not found");
        };
        *slot = contact.clone();
        state.log.push(format!("update:{}", contact.display_id()));
        state.updates.push(contact.clone());
        Ok(contact.clone())
    }

    async fn delete(&self, contact: &ContactRecord) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .contacts
            .retain(|c| c.resource_name != contact.resource_name);
        Ok(())
    }

    async fn submit_batch(&self, operations: &[BatchOperation]) -> Result<Vec<BatchOutcome>> {
        let mut state = self.state.lock().unwrap();
        state.batches.push(operations.to_vec());

        let mut outcomes = Vec::with_capacity(operations.len());
        for (batch_id, operation) in operations.iter().enumerate() {
            let contact = operation.contact();
            let (status_code, entity_id) = match operation {
                BatchOperation::Insert(contact) => {
                    let mut stored = contact.clone();
                    let resource = state.next_resource("people");
                    stored.resource_name = Some(resource.clone());
                    state.contacts.push(stored);
                    state.log.push(format!("insert:{resource}"));
                    (200, Some(resource.to_string()))
                }
                BatchOperation::Delete(contact) => {
                    let before = state.contacts.len();
                    state
                        .contacts
                        .retain(|c| c.resource_name != contact.resource_name);
                    state.log.push(format!("delete:{}", contact.display_id()));
                    let status = if state.contacts.len() < before { 200 } else { 404 };
                    (status, Some(contact.display_id().to_string()))
                }
            };
            outcomes.push(BatchOutcome {
                kind: operation.kind(),
                batch_id,
                status_code,
                reason: String::new(),
                entity_id,
                entity_name: Some(contact.display_name().to_string()),
            });
        }
        Ok(outcomes)
    }
}

#[derive(Default)]
struct MemoryService {
    stores: Mutex<HashMap<String, Arc<Mutex<StoreState>>>>,
}

impl MemoryService {
    fn state(&self, account: &str) -> Arc<Mutex<StoreState>> {
        self.stores
            .lock()
            .unwrap()
            .entry(account.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl IContactService for MemoryService {
    async fn acting_as(&self, account: &Email) -> Result<Box<dyn IContactStore>> {
        Ok(Box::new(MemoryStore {
            account: account.clone(),
            state: self.state(account.as_str()),
        }))
    }
}

// ============================================================================
// Test helpers
// ============================================================================

const TARGET: &str = "bob@x.com";

fn alice(phone: &str) -> DirectoryRecord {
    serde_json::from_value(json!({
        "primaryEmail": "alice@x.com",
        "name": {"givenName": "Alice", "familyName": "Smith", "fullName": "Alice Smith"},
        "phones": [{"value": phone, "type": "work"}],
        "externalIds": [{"value": "E1", "type": "custom", "customType": "Employee ID"}]
    }))
    .unwrap()
}

fn selection(sources: Vec<DirectoryRecord>, targets: &[&str]) -> Selection {
    Selection {
        sources,
        targets: targets.iter().map(|t| Email::new(*t).unwrap()).collect(),
    }
}

fn engine(service: &Arc<MemoryService>, flags: SyncFlags, batch_max: usize) -> SyncEngine {
    let mut config = Config::default();
    config.contacts.batch_max = batch_max;
    let options = SyncOptions::try_from(flags).unwrap();
    SyncEngine::new(service.clone(), SyncContext::new(&config, options))
}

fn scheme() -> MarkerScheme {
    MarkerScheme::from_config(&Config::default().markers)
}

async fn run(engine: &SyncEngine, selection: Selection) -> RunSummary {
    match engine
        .run_with_rng(selection, &mut StdRng::seed_from_u64(1))
        .await
        .unwrap()
    {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::NothingToDo(reason) => panic!("nothing to do: {reason}"),
    }
}

/// A stored managed contact for `id`, member of `group`.
fn managed_contact(
    state: &mut StoreState,
    id: &str,
    full_name: &str,
    group: &ResourceName,
) -> ResourceName {
    let resource = state.next_resource("people");
    let mut markers = Markers::new();
    scheme().tag_managed(&mut markers, &EmployeeId::new(id).unwrap());
    let (given, family) = full_name.split_once(' ').unwrap_or((full_name, ""));
    state.contacts.push(ContactRecord {
        resource_name: Some(resource.clone()),
        name: PersonName {
            given: Some(given.into()),
            family: Some(family.into()),
            full: Some(full_name.into()),
            suffix: None,
        },
        memberships: vec![group.clone()],
        markers,
        ..Default::default()
    });
    resource
}

fn managed_group(state: &mut StoreState) -> ResourceName {
    let resource = state.next_resource("contactGroups");
    state.groups.push(ContactGroup {
        resource_name: resource.clone(),
        title: "Directory".into(),
        markers: scheme().group_markers(),
    });
    resource
}

// ============================================================================
// Sync
// ============================================================================

#[tokio::test]
async fn test_new_user_is_inserted_into_created_group() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);

    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert_eq!(state.groups.len(), 1);
    let group = &state.groups[0];
    assert!(scheme().is_managed_group(&group.markers));
    assert_eq!(group.title, "Directory");

    assert_eq!(state.batches.len(), 1);
    let [BatchOperation::Insert(contact)] = state.batches[0].as_slice() else {
        panic!("expected a single insert, got {:?}", state.batches[0]);
    };
    let primaries: Vec<_> = contact.emails.iter().filter(|e| e.primary).collect();
    assert_eq!(primaries.len(), 1);
    assert_eq!(primaries[0].address, "alice@x.com");
    assert_eq!(
        contact.phones,
        vec![PhoneNumber {
            number: "+1-555-0100".into(),
            classifier: Relation::Work.into(),
            primary: false,
        }]
    );
    assert_eq!(contact.memberships, vec![group.resource_name.clone()]);
    assert!(scheme().is_managed(&contact.markers));
    assert_eq!(scheme().employee_id(&contact.markers), Some("E1"));

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.inserted, 1);
    assert_eq!(account.failed, 0);
}

#[tokio::test]
async fn test_my_contacts_membership_when_enabled() {
    let service = Arc::new(MemoryService::default());
    let flags = SyncFlags {
        my_contacts: true,
        ..Default::default()
    };
    let engine = engine(&service, flags, 100);

    run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    let contact = &state.contacts[0];
    assert_eq!(contact.memberships.len(), 2);
    assert!(contact
        .memberships
        .iter()
        .any(|m| m.as_str() == MY_CONTACTS_GROUP));
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);

    run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;
    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.changes(), 0);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert!(state.updates.is_empty());
    assert_eq!(state.batches.len(), 1);
    assert_eq!(state.groups.len(), 1);
}

#[tokio::test]
async fn test_changed_work_phone_keeps_home_phone() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);
    run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let home = PhoneNumber {
        number: "+1-555-7777".into(),
        classifier: Relation::Home.into(),
        primary: false,
    };
    service.state(TARGET).lock().unwrap().contacts[0]
        .phones
        .insert(0, home.clone());

    let summary = run(&engine, selection(vec![alice("+1-555-0199")], &[TARGET])).await;

    assert_eq!(summary.account(TARGET).unwrap().updated, 1);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert_eq!(state.updates.len(), 1);
    let updated = &state.updates[0];
    assert_eq!(
        updated.phones,
        vec![
            home,
            PhoneNumber {
                number: "+1-555-0199".into(),
                classifier: Relation::Work.into(),
                primary: false,
            },
        ]
    );
    assert_eq!(state.batches.len(), 1, "updates never go through batches");
}

#[tokio::test]
async fn test_surplus_contact_deleted_with_delete_old() {
    let service = Arc::new(MemoryService::default());
    let gone = {
        let state = service.state(TARGET);
        let mut state = state.lock().unwrap();
        let group = managed_group(&mut state);
        managed_contact(&mut state, "E9", "Carol Jones", &group)
    };
    let flags = SyncFlags {
        delete_old: true,
        ..Default::default()
    };
    let engine = engine(&service, flags, 100);

    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.deleted, 1);
    assert_eq!(account.inserted, 1);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert!(state.find(gone.as_str()).is_none());
    assert!(state.log.contains(&format!("delete:{gone}")));
    assert!(state.updates.is_empty());
}

#[tokio::test]
async fn test_surplus_contact_renamed_then_restored() {
    let service = Arc::new(MemoryService::default());
    let gone = {
        let state = service.state(TARGET);
        let mut state = state.lock().unwrap();
        let group = managed_group(&mut state);
        managed_contact(&mut state, "E9", "Carol Jones", &group)
    };
    let flags = SyncFlags {
        rename_old: true,
        rename_suffix: Some("(left)".into()),
        ..Default::default()
    };
    let engine = engine(&service, flags, 100);

    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;
    assert_eq!(summary.account(TARGET).unwrap().renamed, 1);
    {
        let state = service.state(TARGET);
        let state = state.lock().unwrap();
        let carol = state.find(gone.as_str()).unwrap();
        assert_eq!(carol.name.full.as_deref(), Some("Carol Jones (left)"));
        assert_eq!(carol.name.suffix.as_deref(), Some("(left)"));
        assert!(scheme().is_renamed(&carol.markers));
        assert!(!state.log.iter().any(|l| l.starts_with("delete:")));
    }

    // renaming is not repeated
    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;
    assert_eq!(summary.account(TARGET).unwrap().changes(), 0);

    // Carol comes back
    let carol: DirectoryRecord = serde_json::from_value(json!({
        "primaryEmail": "carol@x.com",
        "name": {"givenName": "Carol", "familyName": "Jones", "fullName": "Carol Jones"},
        "externalIds": [{"value": "E9", "type": "custom", "customType": "Employee ID"}]
    }))
    .unwrap();
    let summary = run(
        &engine,
        selection(vec![alice("+1-555-0100"), carol], &[TARGET]),
    )
    .await;

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.restored, 1);
    assert_eq!(account.updated, 1);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    let carol = state.find(gone.as_str()).unwrap();
    assert_eq!(carol.name.full.as_deref(), Some("Carol Jones"));
    assert_eq!(carol.name.suffix, None);
    assert!(!scheme().is_renamed(&carol.markers));
}

#[tokio::test]
async fn test_surplus_contact_kept_by_default() {
    let service = Arc::new(MemoryService::default());
    let gone = {
        let state = service.state(TARGET);
        let mut state = state.lock().unwrap();
        let group = managed_group(&mut state);
        managed_contact(&mut state, "E9", "Carol Jones", &group)
    };
    let engine = engine(&service, SyncFlags::default(), 100);

    run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    let carol = state.find(gone.as_str()).unwrap();
    assert_eq!(carol.name.full.as_deref(), Some("Carol Jones"));
}

#[tokio::test]
async fn test_members_without_identifier_are_ignored() {
    let service = Arc::new(MemoryService::default());
    let orphan = {
        let state = service.state(TARGET);
        let mut state = state.lock().unwrap();
        let group = managed_group(&mut state);
        let resource = managed_contact(&mut state, "E9", "Dan Brown", &group);
        let contact = state.contacts.last_mut().unwrap();
        let id_marker = Config::default().markers.contact_id_name;
        contact.markers.remove(&id_marker);
        resource
    };
    let flags = SyncFlags {
        delete_old: true,
        ..Default::default()
    };
    let engine = engine(&service, flags, 100);

    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    assert_eq!(summary.account(TARGET).unwrap().deleted, 0);
    assert!(service
        .state(TARGET)
        .lock()
        .unwrap()
        .find(orphan.as_str())
        .is_some());
}

#[tokio::test]
async fn test_rejected_update_is_counted_and_run_continues() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);
    run(&engine, selection(vec![alice("+1-555-0100")], &[TARGET, "eve@x.com"])).await;

    service.state(TARGET).lock().unwrap().reject_updates = true;
    let summary = run(
        &engine,
        selection(vec![alice("+1-555-0199")], &[TARGET, "eve@x.com"]),
    )
    .await;

    assert_eq!(summary.accounts.len(), 2);
    assert_eq!(summary.account(TARGET).unwrap().failed, 1);
    assert_eq!(summary.account(TARGET).unwrap().updated, 0);
    assert_eq!(summary.account("eve@x.com").unwrap().updated, 1);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert_eq!(state.contacts[0].phones[0].number, "+1-555-0100");
}

#[tokio::test]
async fn test_record_without_full_name_is_skipped() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);
    let nameless: DirectoryRecord = serde_json::from_value(json!({
        "primaryEmail": "ghost@x.com",
        "externalIds": [{"value": "E7", "type": "custom", "customType": "Employee ID"}]
    }))
    .unwrap();

    let summary = run(
        &engine,
        selection(vec![nameless, alice("+1-555-0100")], &[TARGET]),
    )
    .await;

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.inserted, 1);
    assert_eq!(account.failed, 1);
}

#[tokio::test]
async fn test_inserts_are_split_into_bounded_batches() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 2);
    let sources: Vec<DirectoryRecord> = (1..=3)
        .map(|i| {
            serde_json::from_value(json!({
                "primaryEmail": format!("user{i}@x.com"),
                "name": {"fullName": format!("User {i}")},
                "externalIds": [{"value": format!("E{i}"), "type": "custom", "customType": "Employee ID"}]
            }))
            .unwrap()
        })
        .collect();

    let summary = run(&engine, selection(sources, &[TARGET])).await;

    assert_eq!(summary.account(TARGET).unwrap().inserted, 3);
    let state = service.state(TARGET);
    let sizes: Vec<_> = state.lock().unwrap().batches.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[tokio::test]
async fn test_every_target_account_is_processed() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);
    let targets = ["a@x.com", "b@x.com", "c@x.com"];

    let summary = run(&engine, selection(vec![alice("+1-555-0100")], &targets)).await;

    let processed: HashSet<_> = summary.accounts.iter().map(|a| a.account.as_str()).collect();
    assert_eq!(processed, HashSet::from(targets));
    for target in targets {
        assert_eq!(service.state(target).lock().unwrap().contacts.len(), 1);
    }
}

#[tokio::test]
async fn test_empty_selection_is_nothing_to_do() {
    let service = Arc::new(MemoryService::default());
    let engine = engine(&service, SyncFlags::default(), 100);

    let outcome = engine.run(selection(Vec::new(), &[TARGET])).await.unwrap();
    assert!(matches!(outcome, RunOutcome::NothingToDo(_)));

    let outcome = engine
        .run(selection(vec![alice("+1-555-0100")], &[]))
        .await
        .unwrap();
    assert!(matches!(outcome, RunOutcome::NothingToDo(_)));
    assert!(service.stores.lock().unwrap().is_empty());
}

// ============================================================================
// Undo
// ============================================================================

#[tokio::test]
async fn test_undo_removes_contacts_then_group() {
    let service = Arc::new(MemoryService::default());
    let (group, listed, hidden, foreign) = {
        let state = service.state(TARGET);
        let mut state = state.lock().unwrap();
        let group = managed_group(&mut state);
        let listed = managed_contact(&mut state, "E1", "Alice Smith", &group);
        let hidden = managed_contact(&mut state, "E2", "Carol Jones", &group);
        state.hidden.insert(hidden.clone());
        let foreign = state.next_resource("people");
        state.contacts.push(ContactRecord {
            resource_name: Some(foreign.clone()),
            emails: Vec::new(),
            phones: vec![PhoneNumber {
                number: "+1-555-1234".into(),
                classifier: Classifier::Label("gym".into()),
                primary: false,
            }],
            ..Default::default()
        });
        (group, listed, hidden, foreign)
    };
    let flags = SyncFlags {
        undo: true,
        ..Default::default()
    };
    let engine = engine(&service, flags, 100);

    // undo does not need source records
    let summary = run(&engine, selection(Vec::new(), &[TARGET])).await;

    let account = summary.account(TARGET).unwrap();
    assert_eq!(account.deleted, 2);
    assert_eq!(account.groups_deleted, 1);

    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert_eq!(
        state.log,
        vec![
            format!("delete:{listed}"),
            format!("delete:{hidden}"),
            format!("delete_group:{group}"),
        ]
    );
    assert!(state.groups.is_empty());
    assert_eq!(state.contacts.len(), 1);
    assert!(state.find(foreign.as_str()).is_some());
}

#[tokio::test]
async fn test_undo_after_sync_leaves_nothing() {
    let service = Arc::new(MemoryService::default());
    let sync = engine(&service, SyncFlags::default(), 100);
    run(&sync, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    let undo = engine(
        &service,
        SyncFlags {
            undo: true,
            ..Default::default()
        },
        100,
    );
    let summary = run(&undo, selection(vec![alice("+1-555-0100")], &[TARGET])).await;

    assert_eq!(summary.account(TARGET).unwrap().deleted, 1);
    let state = service.state(TARGET);
    let state = state.lock().unwrap();
    assert!(state.contacts.is_empty());
    assert!(state.groups.is_empty());
    assert!(state.batches.last().unwrap().iter().all(|op| op.kind() == BatchOperationKind::Delete));
}
