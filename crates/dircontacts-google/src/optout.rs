//! HTTP opt-out list
//!
//! The opt-out list is a JSON document of the form
//! `{"settings": {"<setting>": ["user@example.com", ...]}}`. Addresses are
//! lower-cased. Any other shape is rejected as malformed.

use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use dircontacts_core::domain::DomainError;
use dircontacts_core::ports::IOptOutSource;

use crate::GoogleError;

/// Opt-out source fetched with a plain GET
pub struct HttpOptOutSource {
    http: reqwest::Client,
    url: String,
    setting: String,
}

impl HttpOptOutSource {
    pub fn new(url: impl Into<String>, setting: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            setting: setting.into(),
        }
    }
}

/// Extracts the lower-cased addresses listed under `settings.<setting>`.
pub fn parse_opt_out(payload: &Value, setting: &str) -> Result<HashSet<String>, DomainError> {
    let entries = payload
        .get("settings")
        .and_then(|settings| settings.get(setting))
        .and_then(Value::as_array)
        .ok_or(DomainError::MalformedOptOut)?;

    entries
        .iter()
        .map(|entry| {
            entry
                .as_str()
                .map(str::to_lowercase)
                .ok_or(DomainError::MalformedOptOut)
        })
        .collect()
}

#[async_trait]
impl IOptOutSource for HttpOptOutSource {
    async fn fetch_opt_out_list(&self) -> Result<HashSet<String>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(GoogleError::from)?
            .error_for_status()
            .map_err(GoogleError::from)
            .with_context(|| format!("Opt-out list request to {} failed", self.url))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|_| DomainError::MalformedOptOut)?;
        let users = parse_opt_out(&payload, &self.setting)?;

        debug!(count = users.len(), "Fetched opt-out list");
        Ok(users)
    }
}
