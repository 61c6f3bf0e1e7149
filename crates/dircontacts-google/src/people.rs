//! Contact store backed by the People API
//!
//! Each [`PeopleContactStore`] carries a token minted for one account, so
//! every request acts as that account. [`PeopleContactService`] mints those
//! tokens through domain-wide delegation.
//!
//! Batched writes map onto `people:batchCreateContacts` and
//! `people:batchDeleteContacts`. Creation reports a status per person;
//! deletion succeeds or fails as a whole, so a failed delete batch marks
//! every delete in it with the request's error.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use dircontacts_core::domain::{ContactGroup, ContactRecord, Email, Markers};
use dircontacts_core::ports::{
    BatchOperation, BatchOperationKind, BatchOutcome, IContactService, IContactStore,
};

use crate::client::GoogleClient;
use crate::delegation::DelegatedCredentials;
use crate::person::{
    ContactGroupResource, Person, GROUP_FIELDS, PERSON_FIELDS, UPDATE_PERSON_FIELDS,
};
use crate::GoogleError;

/// Base URL of the People API
pub const PEOPLE_BASE_URL: &str = "https://people.googleapis.com";

/// Largest page the list endpoints accept
const PAGE_SIZE: usize = 1000;

/// Largest number of resource names per `people:batchGet`
const BATCH_GET_MAX: usize = 200;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    contact_groups: Vec<ContactGroupResource>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionsPage {
    #[serde(default)]
    connections: Vec<Person>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupMembers {
    #[serde(default)]
    member_resource_names: Vec<String>,
}

/// One entry of `batchGet` and `batchCreateContacts` responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonResponse {
    #[serde(default)]
    person: Option<Person>,
    #[serde(default)]
    status: Option<RpcStatus>,
    #[serde(default)]
    requested_resource_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RpcStatus {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BatchGetResponse {
    #[serde(default)]
    responses: Vec<PersonResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchCreateResponse {
    #[serde(default)]
    created_people: Vec<PersonResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactToCreate {
    contact_person: Person,
}

/// HTTP status equivalent of a google.rpc status code
fn rpc_to_http(code: i32) -> u16 {
    match code {
        0 => 200,
        1 => 499,
        3 | 9 | 11 => 400,
        4 => 504,
        5 => 404,
        6 | 10 => 409,
        7 => 403,
        8 => 429,
        12 => 501,
        14 => 503,
        16 => 401,
        _ => 500,
    }
}

// ============================================================================
// PeopleContactStore
// ============================================================================

/// Contact store for one account
pub struct PeopleContactStore {
    client: GoogleClient,
    account: Email,
}

impl PeopleContactStore {
    /// `client` must carry a token acting as `account`
    pub fn new(client: GoogleClient, account: Email) -> Self {
        Self { client, account }
    }

    async fn list_connections(&self, max_results: usize) -> Result<Vec<ContactRecord>> {
        let mut contacts = Vec::new();
        let mut page_token: Option<String> = None;

        while contacts.len() < max_results {
            let mut query = vec![
                ("personFields", PERSON_FIELDS.to_string()),
                ("pageSize", PAGE_SIZE.min(max_results - contacts.len()).to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: ConnectionsPage = self
                .client
                .get_json("/v1/people/me/connections", &query)
                .await?;
            contacts.extend(page.connections.into_iter().map(ContactRecord::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        contacts.truncate(max_results);
        Ok(contacts)
    }

    async fn list_members(
        &self,
        group: &ContactGroup,
        max_results: usize,
    ) -> Result<Vec<ContactRecord>> {
        let members: GroupMembers = self
            .client
            .get_json(
                &format!("/v1/{}", group.resource_name),
                &[("maxMembers", max_results.to_string())],
            )
            .await?;

        let mut contacts = Vec::with_capacity(members.member_resource_names.len());
        for chunk in members.member_resource_names.chunks(BATCH_GET_MAX) {
            let mut query: Vec<(&str, String)> = chunk
                .iter()
                .map(|name| ("resourceNames", name.clone()))
                .collect();
            query.push(("personFields", PERSON_FIELDS.to_string()));

            let batch: BatchGetResponse = self.client.get_json("/v1/people:batchGet", &query).await?;
            for response in batch.responses {
                match response.person {
                    Some(person) => contacts.push(ContactRecord::from(person)),
                    None => warn!(
                        account = %self.account,
                        resource = response.requested_resource_name.as_deref().unwrap_or_default(),
                        reason = %response.status.map(|s| s.message).unwrap_or_default(),
                        "Group member could not be fetched"
                    ),
                }
            }
        }
        Ok(contacts)
    }

    async fn create_people(&self, inserts: &[(usize, &ContactRecord)]) -> Vec<BatchOutcome> {
        let body = json!({
            "contacts": inserts
                .iter()
                .map(|(_, contact)| ContactToCreate { contact_person: Person::from(*contact) })
                .collect::<Vec<_>>(),
            "readMask": "names,clientData",
        });

        let response: Result<BatchCreateResponse> = self
            .client
            .send_json(Method::POST, "/v1/people:batchCreateContacts", &[], &body)
            .await;
        let created = match response {
            Ok(response) => response.created_people,
            Err(e) => return failed(BatchOperationKind::Insert, inserts, &e),
        };

        inserts
            .iter()
            .enumerate()
            .map(|(i, (batch_id, contact))| {
                let (status_code, reason, entity_id) = match created.get(i) {
                    Some(entry) => {
                        let status = entry.status.as_ref();
                        let code = status.map_or(0, |s| s.code);
                        let entity_id = entry
                            .person
                            .as_ref()
                            .and_then(|p| p.resource_name.clone());
                        let reason = status
                            .map(|s| s.message.clone())
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(|| if code == 0 { "OK".into() } else { String::new() });
                        (rpc_to_http(code), reason, entity_id)
                    }
                    None => (500, "missing from batch response".to_string(), None),
                };
                BatchOutcome {
                    kind: BatchOperationKind::Insert,
                    batch_id: *batch_id,
                    status_code,
                    reason,
                    entity_id,
                    entity_name: contact.name.full.clone(),
                }
            })
            .collect()
    }

    async fn delete_people(&self, deletes: &[(usize, &ContactRecord)]) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::new();
        let mut named = Vec::new();
        for (batch_id, contact) in deletes {
            if contact.resource_name.is_some() {
                named.push((*batch_id, *contact));
            } else {
                outcomes.push(BatchOutcome {
                    kind: BatchOperationKind::Delete,
                    batch_id: *batch_id,
                    status_code: 400,
                    reason: "contact has no resource name".into(),
                    entity_id: None,
                    entity_name: contact.name.full.clone(),
                });
            }
        }
        if named.is_empty() {
            return outcomes;
        }

        let body = json!({
            "resourceNames": named
                .iter()
                .map(|(_, contact)| contact.display_id())
                .collect::<Vec<_>>(),
        });
        let result: Result<serde_json::Value> = self
            .client
            .send_json(Method::POST, "/v1/people:batchDeleteContacts", &[], &body)
            .await;

        match result {
            Ok(_) => outcomes.extend(named.iter().map(|(batch_id, contact)| BatchOutcome {
                kind: BatchOperationKind::Delete,
                batch_id: *batch_id,
                status_code: 200,
                reason: "OK".into(),
                entity_id: Some(contact.display_id().to_string()),
                entity_name: contact.name.full.clone(),
            })),
            Err(e) => outcomes.extend(failed(BatchOperationKind::Delete, &named, &e)),
        }
        outcomes
    }
}

/// Outcomes for operations whose whole request failed
fn failed(
    kind: BatchOperationKind,
    operations: &[(usize, &ContactRecord)],
    error: &anyhow::Error,
) -> Vec<BatchOutcome> {
    let status_code = error
        .downcast_ref::<GoogleError>()
        .and_then(GoogleError::status_code)
        .unwrap_or(500);
    operations
        .iter()
        .map(|(batch_id, contact)| BatchOutcome {
            kind,
            batch_id: *batch_id,
            status_code,
            reason: error.to_string(),
            entity_id: contact.resource_name.as_ref().map(|r| r.to_string()),
            entity_name: contact.name.full.clone(),
        })
        .collect()
}

#[async_trait]
impl IContactStore for PeopleContactStore {
    fn account(&self) -> &Email {
        &self.account
    }

    async fn list_groups(&self) -> Result<Vec<ContactGroup>> {
        let mut groups = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("pageSize", PAGE_SIZE.to_string()),
                ("groupFields", GROUP_FIELDS.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let page: GroupsPage = self
                .client
                .get_json("/v1/contactGroups", &query)
                .await
                .with_context(|| format!("Failed to list contact groups of {}", self.account))?;
            groups.extend(
                page.contact_groups
                    .into_iter()
                    .filter_map(ContactGroupResource::into_group),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(account = %self.account, groups = groups.len(), "Listed contact groups");
        Ok(groups)
    }

    async fn create_group(&self, title: &str, markers: &Markers) -> Result<ContactGroup> {
        let body = json!({
            "contactGroup": ContactGroupResource::new(title, markers),
            "readGroupFields": GROUP_FIELDS,
        });
        let created: ContactGroupResource = self
            .client
            .send_json(Method::POST, "/v1/contactGroups", &[], &body)
            .await
            .with_context(|| format!("Failed to create group {title:?} for {}", self.account))?;

        let group = created.into_group().ok_or_else(|| {
            GoogleError::InvalidResponse("created group has no resource name".into())
        })?;
        info!(account = %self.account, group = %group.resource_name, title, "Created contact group");
        Ok(group)
    }

    async fn delete_group(&self, group: &ContactGroup) -> Result<()> {
        self.client
            .send_empty(
                Method::DELETE,
                &format!("/v1/{}", group.resource_name),
                &[("deleteContacts", "false".to_string())],
            )
            .await
            .with_context(|| format!("Failed to delete group {}", group.resource_name))
    }

    async fn list_contacts(
        &self,
        group: Option<&ContactGroup>,
        max_results: usize,
    ) -> Result<Vec<ContactRecord>> {
        let contacts = match group {
            Some(group) => self
                .list_members(group, max_results)
                .await
                .with_context(|| format!("Failed to list members of {}", group.resource_name))?,
            None => self
                .list_connections(max_results)
                .await
                .with_context(|| format!("Failed to list contacts of {}", self.account))?,
        };
        debug!(account = %self.account, contacts = contacts.len(), "Listed contacts");
        Ok(contacts)
    }

    async fn insert(&self, contact: &ContactRecord) -> Result<ContactRecord> {
        let created: Person = self
            .client
            .send_json(
                Method::POST,
                "/v1/people:createContact",
                &[("personFields", PERSON_FIELDS.to_string())],
                &Person::from(contact),
            )
            .await
            .with_context(|| format!("Failed to create contact {}", contact.display_name()))?;
        Ok(created.into())
    }

    async fn update(&self, contact: &ContactRecord) -> Result<ContactRecord> {
        let resource = contact.resource_name.as_ref().ok_or_else(|| {
            GoogleError::InvalidResponse("cannot update a contact without resource name".into())
        })?;
        let updated: Person = self
            .client
            .send_json(
                Method::PATCH,
                &format!("/v1/{resource}:updateContact"),
                &[
                    ("updatePersonFields", UPDATE_PERSON_FIELDS.to_string()),
                    ("personFields", PERSON_FIELDS.to_string()),
                ],
                &Person::from(contact),
            )
            .await?;
        Ok(updated.into())
    }

    async fn delete(&self, contact: &ContactRecord) -> Result<()> {
        let resource = contact.resource_name.as_ref().ok_or_else(|| {
            GoogleError::InvalidResponse("cannot delete a contact without resource name".into())
        })?;
        self.client
            .send_empty(Method::DELETE, &format!("/v1/{resource}:deleteContact"), &[])
            .await
    }

    async fn submit_batch(&self, operations: &[BatchOperation]) -> Result<Vec<BatchOutcome>> {
        let mut inserts = Vec::new();
        let mut deletes = Vec::new();
        for (batch_id, operation) in operations.iter().enumerate() {
            match operation {
                BatchOperation::Insert(contact) => inserts.push((batch_id, contact)),
                BatchOperation::Delete(contact) => deletes.push((batch_id, contact)),
            }
        }

        let mut outcomes = Vec::with_capacity(operations.len());
        if !inserts.is_empty() {
            outcomes.extend(self.create_people(&inserts).await);
        }
        if !deletes.is_empty() {
            outcomes.extend(self.delete_people(&deletes).await);
        }
        outcomes.sort_by_key(|o| o.batch_id);
        Ok(outcomes)
    }
}

// ============================================================================
// PeopleContactService
// ============================================================================

/// Opens People API stores acting as domain accounts
pub struct PeopleContactService {
    credentials: Arc<DelegatedCredentials>,
    base_url: String,
}

impl PeopleContactService {
    pub fn new(credentials: Arc<DelegatedCredentials>, base_url: impl Into<String>) -> Self {
        Self {
            credentials,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IContactService for PeopleContactService {
    async fn acting_as(&self, account: &Email) -> Result<Box<dyn IContactStore>> {
        let token = self
            .credentials
            .token_for(account)
            .await
            .with_context(|| format!("Failed to obtain a token acting as {account}"))?;
        info!(account = %account, "Acting as account");
        Ok(Box::new(PeopleContactStore::new(
            GoogleClient::new(token, self.base_url.as_str()),
            account.clone(),
        )))
    }
}
