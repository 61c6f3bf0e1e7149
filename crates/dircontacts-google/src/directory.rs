//! Admin SDK Directory API adapter
//!
//! Lists the users of a domain page by page. Requests use the full
//! projection so organizations, phones, addresses, IMs and external IDs
//! are included.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use dircontacts_core::domain::DirectoryRecord;
use dircontacts_core::ports::{IDirectorySource, UserPage};

use crate::client::GoogleClient;

/// Base URL of the Admin SDK
pub const ADMIN_BASE_URL: &str = "https://admin.googleapis.com";

const USERS_PATH: &str = "/admin/directory/v1/users";

/// Response of `GET /admin/directory/v1/users`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersResponse {
    #[serde(default)]
    users: Vec<DirectoryRecord>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Directory source backed by the Admin SDK
pub struct GoogleDirectory {
    client: GoogleClient,
}

impl GoogleDirectory {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IDirectorySource for GoogleDirectory {
    async fn list_users(
        &self,
        domain: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<UserPage> {
        let mut query = vec![
            ("domain", domain.to_string()),
            ("maxResults", page_size.to_string()),
            ("projection", "full".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: UsersResponse = self
            .client
            .get_json(USERS_PATH, &query)
            .await
            .with_context(|| format!("Failed to list users of {domain}"))?;
        debug!(domain, users = response.users.len(), "Fetched directory page");

        Ok(UserPage {
            records: response.users,
            next_page_token: response.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}
