//! Authenticated HTTP client for Google APIs
//!
//! Wraps `reqwest::Client` with bearer authentication, base URL
//! construction, JSON (de)serialization, error classification and
//! automatic retry of throttled (429) requests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dircontacts_google::client::GoogleClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GoogleClient::new("access-token", "https://people.googleapis.com");
//! let groups: serde_json::Value = client
//!     .get_json("/v1/contactGroups", &[("pageSize", "10".to_string())])
//!     .await?;
//! println!("{groups}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::retry::{backoff, parse_retry_after};
use crate::GoogleError;

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Query string parameters; keys may repeat.
pub type Query<'a> = [(&'a str, String)];

// ============================================================================
// Error payloads
// ============================================================================

/// `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// GoogleClient
// ============================================================================

/// HTTP client bound to one API base URL and one access token
#[derive(Debug, Clone)]
pub struct GoogleClient {
    client: Client,
    base_url: String,
    access_token: String,
    max_retries: u32,
}

impl GoogleClient {
    /// Creates a client for the API rooted at `base_url`
    pub fn new(access_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides how many times a throttled request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Updates the access token (e.g., after a token refresh)
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
        debug!("Updated GoogleClient access token");
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g. `/v1/contactGroups`)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request, retrying on HTTP 429, and classifies failures.
    ///
    /// `build` is called once per attempt, since a `RequestBuilder` cannot
    /// be reused after sending. The wait between attempts honors the
    /// `Retry-After` header and otherwise backs off exponentially.
    ///
    /// # Errors
    /// Any non-success status is returned as a [`GoogleError`] (wrapped in
    /// `anyhow`, so callers can downcast).
    pub async fn execute_with_retry<F>(&self, path: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let response = build().send().await.map_err(GoogleError::from)?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                if attempt > 0 {
                    info!(path, attempt, "Request succeeded after retry");
                }
                return check_status(response).await;
            }

            let retry_after = retry_after_of(&response, attempt);
            if attempt >= self.max_retries {
                warn!(path, attempts = attempt + 1, "429 retry limit exhausted");
                return Err(GoogleError::TooManyRequests { retry_after }.into());
            }

            info!(
                path,
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "Received 429, backing off"
            );
            tokio::time::sleep(retry_after).await;
            attempt += 1;
        }
    }

    /// `GET path?query` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &Query<'_>) -> Result<T> {
        let response = self
            .execute_with_retry(path, || self.request(Method::GET, path).query(query))
            .await?;
        decode(response).await
    }

    /// Send a JSON body and decode the JSON response
    pub async fn send_json<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &Query<'_>,
        body: &B,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute_with_retry(path, || {
                self.request(method.clone(), path).query(query).json(body)
            })
            .await?;
        decode(response).await
    }

    /// Send a request whose response body is ignored
    pub async fn send_empty(&self, method: Method, path: &str, query: &Query<'_>) -> Result<()> {
        self.execute_with_retry(path, || self.request(method.clone(), path).query(query))
            .await?;
        Ok(())
    }
}

fn retry_after_of(response: &Response, attempt: u32) -> Duration {
    let default = backoff(attempt);
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map_or(default, |v| parse_retry_after(v, default))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await.map_err(GoogleError::from)?;
    let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
    serde_json::from_str(body)
        .map_err(|e| GoogleError::InvalidResponse(e.to_string()).into())
}

/// Passes successful responses through and turns the rest into errors.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body, None),
    };
    debug!(status = status.as_u16(), %message, "Google API error");

    Err(classify(status, message, api_status.as_deref()).into())
}

fn classify(status: StatusCode, message: String, api_status: Option<&str>) -> GoogleError {
    match status {
        StatusCode::UNAUTHORIZED => GoogleError::Unauthorized(message),
        StatusCode::FORBIDDEN => GoogleError::Forbidden(message),
        StatusCode::NOT_FOUND => GoogleError::NotFound(message),
        StatusCode::PRECONDITION_FAILED => GoogleError::PreconditionFailed(message),
        StatusCode::BAD_REQUEST if api_status == Some("FAILED_PRECONDITION") => {
            GoogleError::PreconditionFailed(message)
        }
        s if s.is_server_error() => GoogleError::ServerError(message),
        s => GoogleError::Api {
            status: s.as_u16(),
            message,
        },
    }
}
