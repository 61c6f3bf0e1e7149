//! Retry and error classification of GoogleClient

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use dircontacts_google::GoogleError;

use crate::common::setup_client;

#[tokio::test]
async fn test_429_is_retried_then_succeeds() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/v1/thing"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/thing"))
        .and(header("authorization", "Bearer test-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let body: serde_json::Value = client.get_json("/v1/thing", &[]).await.unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_429_retry_limit_exhausted() {
    let (server, client) = setup_client().await;
    let client = client.with_max_retries(2);

    Mock::given(method("GET"))
        .and(path("/v1/thing"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client
        .get_json::<serde_json::Value>("/v1/thing", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GoogleError>(),
        Some(GoogleError::TooManyRequests { .. })
    ));
}

#[tokio::test]
async fn test_error_statuses_are_classified() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/stale"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "etag mismatch", "status": "FAILED_PRECONDITION"}
        })))
        .mount(&server)
        .await;

    let err = client
        .get_json::<serde_json::Value>("/v1/missing", &[])
        .await
        .unwrap_err();
    match err.downcast_ref::<GoogleError>() {
        Some(GoogleError::NotFound(message)) => {
            assert_eq!(message, "Requested entity was not found.")
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = client
        .send_json::<_, serde_json::Value>(reqwest::Method::PATCH, "/v1/stale", &[], &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GoogleError>(),
        Some(GoogleError::PreconditionFailed(_))
    ));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_response() {
    let (server, client) = setup_client().await;

    Mock::given(method("GET"))
        .and(path("/v1/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client
        .get_json::<serde_json::Value>("/v1/garbage", &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<GoogleError>(),
        Some(GoogleError::InvalidResponse(_))
    ));
}
