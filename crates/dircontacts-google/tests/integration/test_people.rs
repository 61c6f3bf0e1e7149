//! People API contact store against a mocked server

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use dircontacts_core::domain::{ContactRecord, Markers, ResourceName};
use dircontacts_core::ports::{BatchOperation, BatchOperationKind, IContactStore};
use dircontacts_google::person::Person;

use crate::common::{managed_person, setup_people, ACCOUNT};

fn contact(resource: &str) -> ContactRecord {
    let person: Person = serde_json::from_value(managed_person(resource, "E1")).unwrap();
    ContactRecord::from(person)
}

#[tokio::test]
async fn test_list_groups_follows_pages() {
    let (server, store) = setup_people().await;

    Mock::given(method("GET"))
        .and(path("/v1/contactGroups"))
        .and(query_param("pageToken", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contactGroups": [{
                "resourceName": "contactGroups/dir",
                "name": "Directory",
                "clientData": [{"key": "dircontacts.group", "value": "directory"}]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/contactGroups"))
        .and(query_param("groupFields", "name,groupType,clientData"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contactGroups": [
                {"resourceName": "contactGroups/myContacts", "name": "myContacts", "groupType": "SYSTEM_CONTACT_GROUP"}
            ],
            "nextPageToken": "p2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let groups = store.list_groups().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert!(groups[0].is_my_contacts());
    assert_eq!(groups[1].markers.get("dircontacts.group"), Some("directory"));
    assert_eq!(store.account().as_str(), ACCOUNT);
}

#[tokio::test]
async fn test_create_group_sends_markers() {
    let (server, store) = setup_people().await;

    Mock::given(method("POST"))
        .and(path("/v1/contactGroups"))
        .and(body_partial_json(json!({
            "contactGroup": {
                "name": "Directory",
                "clientData": [{"key": "dircontacts.group", "value": "directory"}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceName": "contactGroups/new",
            "name": "Directory",
            "clientData": [{"key": "dircontacts.group", "value": "directory"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let markers: Markers = [("dircontacts.group", "directory")].into_iter().collect();
    let group = store.create_group("Directory", &markers).await.unwrap();
    assert_eq!(group.resource_name.as_str(), "contactGroups/new");
    assert_eq!(group.markers, markers);
}

#[tokio::test]
async fn test_list_group_members_uses_batch_get() {
    let (server, store) = setup_people().await;

    Mock::given(method("GET"))
        .and(path("/v1/contactGroups/dir"))
        .and(query_param("maxMembers", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resourceName": "contactGroups/dir",
            "memberResourceNames": ["people/c1", "people/c2"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/people:batchGet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                {"requestedResourceName": "people/c1", "person": managed_person("people/c1", "E1")},
                {"requestedResourceName": "people/c2", "status": {"code": 5, "message": "gone"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let group = dircontacts_core::domain::ContactGroup {
        resource_name: ResourceName::new("contactGroups/dir").unwrap(),
        title: "Directory".into(),
        markers: Markers::new(),
    };
    let members = store.list_contacts(Some(&group), 10_000).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].markers.get("dircontacts.employee_id"), Some("E1"));
    assert_eq!(members[0].etag.as_deref(), Some("etag-people/c1"));
}

#[tokio::test]
async fn test_list_all_contacts_stops_at_max() {
    let (server, store) = setup_people().await;

    Mock::given(method("GET"))
        .and(path("/v1/people/me/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connections": [
                managed_person("people/c1", "E1"),
                managed_person("people/c2", "E2"),
                {"resourceName": "people/c3", "names": [{"unstructuredName": "Personal Friend"}]}
            ],
            "nextPageToken": "more"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let contacts = store.list_contacts(None, 3).await.unwrap();
    assert_eq!(contacts.len(), 3);
    assert_eq!(contacts[2].display_name(), "Personal Friend");
}

#[tokio::test]
async fn test_update_is_a_conditional_patch() {
    let (server, store) = setup_people().await;

    Mock::given(method("PATCH"))
        .and(path("/v1/people/c1:updateContact"))
        .and(query_param(
            "updatePersonFields",
            "names,biographies,organizations,emailAddresses,phoneNumbers,externalIds,addresses,imClients,clientData",
        ))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(json!({
            "etag": "etag-people/c1",
            "phoneNumbers": [{"value": "+1-555-0199", "type": "work"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(managed_person("people/c1", "E1")))
        .expect(1)
        .mount(&server)
        .await;

    let mut contact = contact("people/c1");
    contact.phones[0].number = "+1-555-0199".into();
    let updated = store.update(&contact).await.unwrap();
    assert_eq!(updated.display_id(), "people/c1");
}

#[tokio::test]
async fn test_update_without_resource_name_fails() {
    let (_server, store) = setup_people().await;
    assert!(store.update(&ContactRecord::default()).await.is_err());
}

#[tokio::test]
async fn test_batch_reports_each_operation() {
    let (server, store) = setup_people().await;

    Mock::given(method("POST"))
        .and(path("/v1/people:batchCreateContacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "createdPeople": [
                {"person": {"resourceName": "people/n1"}, "status": {}},
                {"status": {"code": 3, "message": "Invalid phone number"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/people:batchDeleteContacts"))
        .and(body_partial_json(json!({"resourceNames": ["people/c9"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let mut first = contact("people/x");
    first.resource_name = None;
    first.name.full = Some("New One".into());
    let mut second = first.clone();
    second.name.full = Some("New Two".into());

    let operations = vec![
        BatchOperation::Insert(first),
        BatchOperation::Delete(contact("people/c9")),
        BatchOperation::Insert(second),
    ];
    let outcomes = store.submit_batch(&operations).await.unwrap();

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].batch_id, 0);
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].entity_id.as_deref(), Some("people/n1"));

    assert_eq!(outcomes[1].kind, BatchOperationKind::Delete);
    assert!(outcomes[1].is_success());
    assert_eq!(outcomes[1].entity_id.as_deref(), Some("people/c9"));

    assert_eq!(outcomes[2].status_code, 400);
    assert_eq!(outcomes[2].reason, "Invalid phone number");
    assert_eq!(outcomes[2].entity_name.as_deref(), Some("New Two"));
}

#[tokio::test]
async fn test_failed_delete_batch_marks_every_delete() {
    let (server, store) = setup_people().await;

    Mock::given(method("POST"))
        .and(path("/v1/people:batchDeleteContacts"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "The caller does not have permission"}
        })))
        .mount(&server)
        .await;

    let operations = vec![
        BatchOperation::Delete(contact("people/c1")),
        BatchOperation::Delete(contact("people/c2")),
    ];
    let outcomes = store.submit_batch(&operations).await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(|o| o.status_code == 403));
    assert!(outcomes[0].reason.contains("does not have permission"));
}
