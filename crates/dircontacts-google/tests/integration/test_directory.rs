//! Directory listing against a mocked Admin SDK

use std::sync::Arc;

use glob::Pattern;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use dircontacts_core::ports::{IDirectorySource, NoOptOut};
use dircontacts_core::usecases::{SelectUsersUseCase, SelectionCriteria};
use dircontacts_google::directory::GoogleDirectory;

use crate::common::{directory_user, setup_client};

#[tokio::test]
async fn test_list_users_single_page() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/admin/directory/v1/users"))
        .and(query_param("domain", "example.com"))
        .and(query_param("maxResults", "500"))
        .and(query_param("projection", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [directory_user("alice@example.com", "E1")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let directory = GoogleDirectory::new(client);
    let page = directory.list_users("example.com", 500, None).await.unwrap();
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].employee_id(), Some("E1"));
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_selection_walks_every_page() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/admin/directory/v1/users"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [directory_user("carol@example.com", "E3")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/directory/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                directory_user("alice@example.com", "E1"),
                directory_user("bob@example.com", "E2")
            ],
            "nextPageToken": "page-2"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let use_case = SelectUsersUseCase::new(
        Arc::new(GoogleDirectory::new(client)),
        Arc::new(NoOptOut),
    );
    let criteria = SelectionCriteria {
        select_pattern: Pattern::new("*").unwrap(),
        user_pattern: Pattern::new("bob@*").unwrap(),
        require_phone: true,
    };
    let selection = use_case.execute("example.com", 100, &criteria).await.unwrap();

    assert_eq!(selection.sources.len(), 3);
    assert_eq!(selection.targets.len(), 1);
    assert_eq!(selection.targets[0].as_str(), "bob@example.com");
}

#[tokio::test]
async fn test_forbidden_listing_fails() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/admin/directory/v1/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "Not Authorized to access this resource/api"}
        })))
        .mount(&server)
        .await;

    let directory = GoogleDirectory::new(client);
    let err = directory.list_users("example.com", 500, None).await.unwrap_err();
    assert!(format!("{err:#}").contains("Not Authorized"));
}
