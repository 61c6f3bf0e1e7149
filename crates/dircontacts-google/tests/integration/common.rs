//! Shared test helpers for the Google adapter integration tests

use serde_json::{json, Value};
use wiremock::MockServer;

use dircontacts_core::domain::Email;
use dircontacts_google::client::GoogleClient;
use dircontacts_google::people::PeopleContactStore;

pub const ACCOUNT: &str = "bob@example.com";

/// Starts a mock server and a client pointing at it
pub async fn setup_client() -> (MockServer, GoogleClient) {
    let server = MockServer::start().await;
    let client = GoogleClient::new("test-access-token", server.uri());
    (server, client)
}

/// Starts a mock server and a People store acting as [`ACCOUNT`]
pub async fn setup_people() -> (MockServer, PeopleContactStore) {
    let (server, client) = setup_client().await;
    let account = Email::new(ACCOUNT).unwrap();
    (server, PeopleContactStore::new(client, account))
}

/// A directory user as returned by the Admin SDK
#[allow(dead_code)]
pub fn directory_user(email: &str, employee_id: &str) -> Value {
    json!({
        "primaryEmail": email,
        "name": {"givenName": "Test", "familyName": "User", "fullName": "Test User"},
        "externalIds": [{"value": employee_id, "type": "custom", "customType": "Employee ID"}],
        "phones": [{"value": "+1-555-0100", "type": "work"}]
    })
}

/// A managed person as returned by the People API
#[allow(dead_code)]
pub fn managed_person(resource: &str, employee_id: &str) -> Value {
    json!({
        "resourceName": resource,
        "etag": format!("etag-{resource}"),
        "names": [{"givenName": "Test", "familyName": "User", "unstructuredName": "Test User"}],
        "phoneNumbers": [{"value": "+1-555-0100", "type": "work"}],
        "memberships": [{"contactGroupMembership": {"contactGroupResourceName": "contactGroups/dir"}}],
        "clientData": [
            {"key": "dircontacts.employee_id", "value": employee_id},
            {"key": "dircontacts.source", "value": "directory"}
        ]
    })
}
