//! Auth commands - Login, Logout, and Status for the administrator
//!
//! Provides the `dircontacts auth` CLI subcommands which:
//! 1. `login`  - Runs the OAuth2 PKCE flow in the browser and stores the
//!    tokens in the system keyring.
//! 2. `logout` - Clears the stored tokens from the keyring.
//! 3. `status` - Shows whether usable tokens are stored.
//!
//! Only the administrator's directory access is interactive; target
//! accounts are reached through the service account.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use tracing::info;

use dircontacts_core::config::Config;
use dircontacts_google::auth::{AdminAuthenticator, KeyringTokenStorage, OAuth2Config};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Authorize directory access in the browser
    Login,
    /// Remove stored credentials
    Logout,
    /// Check authorization status
    Status,
}

/// Build the administrator authenticator from `auth` configuration, with
/// tokens kept in the system keyring.
pub fn admin_authenticator(config: &Config) -> Result<AdminAuthenticator> {
    let client_id = config
        .auth
        .client_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .context("No OAuth client configured. Set auth.client_id in config.yaml")?;

    let mut oauth = OAuth2Config::new(client_id)
        .with_scopes(config.auth.scopes.clone())
        .with_redirect_port(config.auth.redirect_port);
    if let Some(secret) = config.auth.client_secret.as_deref() {
        oauth = oauth.with_client_secret(secret);
    }

    Ok(AdminAuthenticator::new(oauth, Arc::new(KeyringTokenStorage)))
}

impl AuthCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let fmt = get_formatter(format);
        let config = Config::load_or_default(config_path);
        let authenticator = admin_authenticator(&config)?;

        match self {
            AuthCommand::Login => execute_login(&authenticator, &*fmt).await,
            AuthCommand::Logout => execute_logout(&authenticator, &*fmt),
            AuthCommand::Status => execute_status(&authenticator, &*fmt, format),
        }
    }
}

async fn execute_login(authenticator: &AdminAuthenticator, fmt: &dyn OutputFormatter) -> Result<()> {
    info!(client_id = %authenticator.config().client_id, "Starting OAuth2 login");
    fmt.info("Opening browser for Google login...");

    let tokens = authenticator.login().await.context("OAuth2 login failed")?;

    fmt.success("Authorized; tokens stored in the system keyring");
    fmt.info(&format!(
        "Access token valid until {}",
        tokens.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if tokens.refresh_token.is_none() {
        fmt.warn("No refresh token was issued; unattended runs will need --reauth later");
    }
    Ok(())
}

fn execute_logout(authenticator: &AdminAuthenticator, fmt: &dyn OutputFormatter) -> Result<()> {
    authenticator
        .logout()
        .context("Failed to clear tokens from keyring")?;
    info!("Logged out");

    fmt.success("Logged out successfully");
    fmt.info("Credentials removed from keyring");
    Ok(())
}

fn execute_status(
    authenticator: &AdminAuthenticator,
    fmt: &dyn OutputFormatter,
    format: OutputFormat,
) -> Result<()> {
    let tokens = authenticator
        .status()
        .context("Failed to read tokens from keyring")?;

    let token_status = match &tokens {
        Some(t) if !t.is_expired() => "Valid",
        Some(t) if t.refresh_token.is_some() => "Expired (refreshable)",
        Some(_) => "Expired",
        None => "Not found",
    };

    if format.is_json() {
        fmt.print_json(&serde_json::json!({
            "authenticated": tokens.is_some(),
            "client_id": authenticator.config().client_id,
            "token_status": token_status,
            "expires_at": tokens.as_ref().map(|t| t.expires_at.to_rfc3339()),
            "refreshable": tokens.as_ref().is_some_and(|t| t.refresh_token.is_some()),
        }));
        return Ok(());
    }

    match &tokens {
        Some(t) => {
            fmt.success(&format!("Authorized ({})", authenticator.config().client_id));
            fmt.info(&format!("Token status:  {token_status}"));
            fmt.info(&format!(
                "Expires:       {}",
                t.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            let remaining = t.expires_at - Utc::now();
            if remaining.num_seconds() > 0 {
                fmt.info(&format!("Valid for:     {} min", remaining.num_minutes()));
            }
        }
        None => {
            fmt.info("Authorization status: Not authorized");
            fmt.info("Run 'dircontacts auth login' to authorize");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticator_requires_client_id() {
        let config = Config::default();
        let err = admin_authenticator(&config).err().unwrap();
        assert!(err.to_string().contains("auth.client_id"));
    }

    #[test]
    fn test_authenticator_uses_configured_client() {
        let mut config = Config::default();
        config.auth.client_id = Some("client-123".into());
        config.auth.client_secret = Some("secret".into());
        config.auth.redirect_port = 9100;

        let authenticator = admin_authenticator(&config).unwrap();
        assert_eq!(authenticator.config().client_id, "client-123");
        assert!(authenticator.config().redirect_uri().contains("9100"));
    }
}
