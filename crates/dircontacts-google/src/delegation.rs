//! Service-account credentials acting as a domain account
//!
//! Contact stores belong to individual accounts. A service account with
//! domain-wide delegation can mint a token for any account of the domain:
//! it signs a JWT assertion (RS256) naming the account as subject and
//! trades it at the token endpoint for an access token.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use dircontacts_core::domain::Email;

use crate::GoogleError;

/// Grant type of the JWT-bearer token exchange (RFC 7523)
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion; Google accepts at most one hour
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// The fields of a service account JSON key file this crate uses
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    crate::auth::TOKEN_URL.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Malformed service account key")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account key {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Mints access tokens for arbitrary accounts of the domain
pub struct DelegatedCredentials {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scopes: Vec<String>,
    http: reqwest::Client,
}

impl DelegatedCredentials {
    /// Parses the key's private key once, up front
    pub fn new(key: ServiceAccountKey, scopes: Vec<String>) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .context("Invalid service account private key")?;
        Ok(Self {
            key,
            encoding_key,
            scopes,
            http: reqwest::Client::new(),
        })
    }

    pub fn service_account(&self) -> &str {
        &self.key.client_email
    }

    /// Signs the assertion for `subject`
    fn assertion(&self, subject: &str) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .context("System clock is before the Unix epoch")?
            .as_secs();

        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            sub: subject.to_string(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.encoding_key).context("Failed to sign token assertion")
    }

    /// Obtains an access token acting as `account`
    ///
    /// # Errors
    /// A rejected exchange (for example delegation not granted for the
    /// scopes) is reported as [`GoogleError::Unauthorized`].
    pub async fn token_for(&self, account: &Email) -> Result<String> {
        let assertion = self.assertion(account.as_str())?;
        debug!(account = %account, "Requesting delegated access token");

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(GoogleError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(GoogleError::from)?;
        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {status}"),
            };
            return Err(GoogleError::Unauthorized(format!(
                "cannot act as {account}: {reason}"
            ))
            .into());
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GoogleError::InvalidResponse(e.to_string()))?;
        Ok(token.access_token)
    }
}
