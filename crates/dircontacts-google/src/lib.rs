//! dircontacts Google - Google Workspace adapters
//!
//! Implements the core ports against Google APIs:
//! - Admin SDK Directory API for listing domain users
//! - People API for each target account's contacts and contact groups
//! - OAuth2 (interactive PKCE login for the administrator, service-account
//!   domain-wide delegation for acting as target accounts)
//! - A plain HTTP endpoint serving the opt-out list
//!
//! ## Modules
//!
//! - [`auth`] - Interactive administrator login and token storage
//! - [`client`] - Authenticated HTTP client with 429 retry
//! - [`delegation`] - Service-account tokens scoped to one account
//! - [`directory`] - Directory users listing
//! - [`people`] - Contact store backed by the People API
//! - [`person`] - People API wire types and their mapping to contacts

pub mod auth;
pub mod client;
pub mod delegation;
pub mod directory;
pub mod optout;
pub mod people;
pub mod person;
pub mod retry;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when communicating with Google APIs
#[derive(Debug, Error)]
pub enum GoogleError {
    /// Credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks permission (or delegation is not granted)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A conditional write lost against a newer version (stale etag)
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// Rate limit exceeded; retry after the specified duration
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration to wait before retrying
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Stored credentials cannot be used and interactive login is disabled
    #[error("Re-authorization required but batch mode was requested")]
    ReauthorizationRequired,
}

impl GoogleError {
    /// HTTP status associated with this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::PreconditionFailed(_) => Some(412),
            Self::TooManyRequests { .. } => Some(429),
            Self::Api { status, .. } => Some(*status),
            Self::NetworkError(e) => e.status().map(|s| s.as_u16()),
            Self::ServerError(_) => Some(500),
            Self::InvalidResponse(_) | Self::ReauthorizationRequired => None,
        }
    }
}
