//! Opt-out list fetched over HTTP

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dircontacts_core::domain::DomainError;
use dircontacts_core::ports::IOptOutSource;
use dircontacts_google::optout::HttpOptOutSource;

#[tokio::test]
async fn test_fetch_opt_out_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/optout.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "settings": {"optout_employees": ["Dave@Example.com"], "other": ["x@y.z"]}
        })))
        .mount(&server)
        .await;

    let source = HttpOptOutSource::new(format!("{}/optout.json", server.uri()), "optout_employees");
    let users = source.fetch_opt_out_list().await.unwrap();
    assert_eq!(users.len(), 1);
    assert!(users.contains("dave@example.com"));
}

#[tokio::test]
async fn test_malformed_payload_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/optout.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let source = HttpOptOutSource::new(format!("{}/optout.json", server.uri()), "optout_employees");
    let err = source.fetch_opt_out_list().await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<DomainError>(),
        Some(&DomainError::MalformedOptOut)
    );
}

#[tokio::test]
async fn test_http_error_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/optout.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpOptOutSource::new(format!("{}/optout.json", server.uri()), "optout_employees");
    assert!(source.fetch_opt_out_list().await.is_err());
}
