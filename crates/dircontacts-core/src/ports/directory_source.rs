//! Directory source port (driven/secondary port)
//!
//! The organizational directory that lists users. Listing is paginated;
//! callers loop until no next-page token is returned.
//!
//! Uses `anyhow::Result` because errors at port boundaries are
//! adapter-specific and don't need domain-level classification.

use async_trait::async_trait;

use crate::domain::DirectoryRecord;

/// One page of directory users
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPage {
    pub records: Vec<DirectoryRecord>,
    /// Token for the following page, `None` on the last page
    pub next_page_token: Option<String>,
}

/// Port for listing directory users
#[async_trait]
pub trait IDirectorySource: Send + Sync {
    /// List one page of users in `domain`.
    async fn list_users(
        &self,
        domain: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> anyhow::Result<UserPage>;
}
