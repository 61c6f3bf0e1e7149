//! Service-account delegation and acting-as stores

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dircontacts_core::domain::Email;
use dircontacts_core::ports::IContactService;
use dircontacts_google::delegation::{DelegatedCredentials, ServiceAccountKey};
use dircontacts_google::people::PeopleContactService;
use dircontacts_google::GoogleError;

const PRIVATE_KEY: &str = include_str!("../fixtures/test_service_account.pem");

fn credentials(server: &MockServer) -> DelegatedCredentials {
    let key = ServiceAccountKey::from_json(
        &json!({
            "type": "service_account",
            "client_email": "sync@project.iam.gserviceaccount.com",
            "private_key": PRIVATE_KEY,
            "private_key_id": "key-1",
            "token_uri": format!("{}/token", server.uri()),
        })
        .to_string(),
    )
    .unwrap();
    DelegatedCredentials::new(key, vec!["https://www.googleapis.com/auth/contacts".into()]).unwrap()
}

#[tokio::test]
async fn test_acting_as_uses_delegated_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "delegated-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/contactGroups"))
        .and(header("authorization", "Bearer delegated-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contactGroups": []})))
        .expect(1)
        .mount(&server)
        .await;

    let service = PeopleContactService::new(Arc::new(credentials(&server)), server.uri());
    let account = Email::new("bob@example.com").unwrap();
    let store = service.acting_as(&account).await.unwrap();

    assert_eq!(store.account(), &account);
    assert!(store.list_groups().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_delegation_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized_client",
            "error_description": "Client is unauthorized to retrieve access tokens using this method"
        })))
        .mount(&server)
        .await;

    let credentials = credentials(&server);
    let err = credentials
        .token_for(&Email::new("bob@example.com").unwrap())
        .await
        .unwrap_err();
    match err.downcast_ref::<GoogleError>() {
        Some(GoogleError::Unauthorized(message)) => {
            assert!(message.contains("unauthorized_client"));
            assert!(message.contains("bob@example.com"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_key_loaded_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("key.json");
    std::fs::write(
        &path,
        json!({
            "type": "service_account",
            "client_email": "sync@project.iam.gserviceaccount.com",
            "private_key": PRIVATE_KEY,
            "token_uri": "https://oauth2.googleapis.com/token",
        })
        .to_string(),
    )
    .unwrap();

    let key = ServiceAccountKey::from_file(&path).unwrap();
    let credentials = DelegatedCredentials::new(key, vec!["scope".into()]).unwrap();
    assert_eq!(
        credentials.service_account(),
        "sync@project.iam.gserviceaccount.com"
    );

    assert!(ServiceAccountKey::from_file(&dir.path().join("absent.json")).is_err());
}
