//! Sync command - Copy directory users into each target account
//!
//! Provides the `dircontacts sync` CLI command which:
//! 1. Loads and validates configuration, merging flags with its defaults
//! 2. Obtains the administrator token (stored, refreshed or interactive)
//! 3. Lists the directory and splits it into sources and targets
//! 4. Runs the SyncEngine acting as every target account in turn
//! 5. Displays the per-account summary
//!
//! Every check that does not need the network runs before the first
//! request is made.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use dircontacts_core::config::Config;
use dircontacts_core::options::{SyncFlags, SyncOptions};
use dircontacts_core::ports::{IOptOutSource, NoOptOut};
use dircontacts_core::usecases::{SelectUsersUseCase, SelectionCriteria};
use dircontacts_google::client::GoogleClient;
use dircontacts_google::delegation::{DelegatedCredentials, ServiceAccountKey};
use dircontacts_google::directory::GoogleDirectory;
use dircontacts_google::optout::HttpOptOutSource;
use dircontacts_google::people::PeopleContactService;
use dircontacts_sync::{RunOutcome, RunSummary, SyncContext, SyncEngine};

use crate::commands::auth::admin_authenticator;
use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Glob selecting the users copied as contacts
    #[arg(short = 'S', long, value_name = "GLOB")]
    pub select_pattern: Option<String>,

    /// Glob selecting the accounts receiving the contacts
    #[arg(short = 'U', long, value_name = "GLOB")]
    pub user_pattern: Option<String>,

    /// Also copy users without a phone number
    #[arg(short = 'P', long)]
    pub no_phone: bool,

    /// Title of the managed group when it has to be created
    #[arg(short = 'G', long, value_name = "NAME")]
    pub group: Option<String>,

    /// Also add new contacts to "My Contacts"
    #[arg(short = 'M', long)]
    pub my_contacts: bool,

    /// Delete managed contacts whose user left the directory
    #[arg(short = 'D', long)]
    pub delete_old: bool,

    /// Rename managed contacts whose user left the directory
    #[arg(short = 'R', long)]
    pub rename_old: bool,

    /// Suffix appended to the names of renamed contacts
    #[arg(long, value_name = "SUFFIX")]
    pub rename_suffix: Option<String>,

    /// Copy the user's non-primary addresses too
    #[arg(long)]
    pub add_other_emails: bool,

    /// Copy the user's aliases as addresses
    #[arg(long)]
    pub add_aliases: bool,

    /// Organization name for users without one
    #[arg(short = 'O', long, value_name = "NAME")]
    pub organization_name: Option<String>,

    /// Remove every contact and group the sync created instead
    #[arg(long)]
    pub undo: bool,

    /// Force a new interactive administrator login
    #[arg(short = 'r', long)]
    pub reauth: bool,

    /// Never prompt; fail if a new login would be needed
    #[arg(short = 'b', long)]
    pub batch: bool,
}

impl SyncCommand {
    /// The behavioral flags as given on the command line
    pub fn flags(&self) -> SyncFlags {
        SyncFlags {
            select_pattern: self.select_pattern.clone(),
            user_pattern: self.user_pattern.clone(),
            no_phone: self.no_phone,
            group: self.group.clone(),
            my_contacts: self.my_contacts,
            delete_old: self.delete_old,
            rename_old: self.rename_old,
            rename_suffix: self.rename_suffix.clone(),
            add_other_emails: self.add_other_emails,
            add_aliases: self.add_aliases,
            organization_name: self.organization_name.clone(),
            undo: self.undo,
        }
    }

    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        // Step 1: Configuration and options
        let config = load_valid_config(config_path)?;
        let options = SyncOptions::try_from(self.flags().with_defaults(&config.defaults))?;
        info!(config_path = %config_path.display(), undo = options.undo, "Loaded configuration");

        let key_path = config
            .auth
            .service_account_key
            .as_deref()
            .context("auth.service_account_key is not configured")?;
        let key = ServiceAccountKey::from_file(key_path)?;
        let credentials = DelegatedCredentials::new(key, config.auth.delegated_scopes.clone())?;
        info!(service_account = credentials.service_account(), "Loaded service account");

        // Step 2: Administrator token
        let token = admin_authenticator(&config)?
            .access_token(self.reauth, self.batch)
            .await
            .context("Administrator authorization failed")?;

        // Step 3: Directory selection
        let directory = Arc::new(GoogleDirectory::new(GoogleClient::new(
            token,
            config.directory.base_url.as_str(),
        )));
        let opt_out: Arc<dyn IOptOutSource> = match &config.opt_out.url {
            Some(url) => Arc::new(HttpOptOutSource::new(
                url.as_str(),
                config.opt_out.setting.as_str(),
            )),
            None => Arc::new(NoOptOut),
        };
        formatter.info(&format!("Listing users of {}...", config.directory.domain));
        let selection = SelectUsersUseCase::new(directory, opt_out)
            .execute(
                &config.directory.domain,
                config.directory.page_size,
                &SelectionCriteria::from(&options),
            )
            .await?;
        formatter.info(&format!(
            "{} selected for {}",
            plural(selection.sources.len(), "user"),
            plural(selection.targets.len(), "account")
        ));

        // Step 4: Run
        let service =
            PeopleContactService::new(Arc::new(credentials), config.contacts.base_url.as_str());
        let engine = SyncEngine::new(Arc::new(service), SyncContext::new(&config, options));
        let outcome = engine.run(selection).await?;

        // Step 5: Display results
        match outcome {
            RunOutcome::NothingToDo(reason) => {
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "status": "nothing_to_do",
                        "reason": reason,
                    }));
                } else {
                    formatter.warn(&format!("Nothing to do: {reason}"));
                }
            }
            RunOutcome::Completed(summary) => {
                if format.is_json() {
                    let summary = serde_json::to_value(&summary)
                        .context("Failed to serialize run summary")?;
                    formatter.print_json(&serde_json::json!({
                        "status": "completed",
                        "summary": summary,
                    }));
                } else {
                    display_summary(&summary, &*formatter);
                }
            }
        }

        Ok(())
    }
}

/// Load the configuration file, rejecting it with every validation error.
pub fn load_valid_config(path: &Path) -> Result<Config> {
    let config = Config::load(path)?;
    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!(
            "Invalid configuration {}:\n  {}",
            path.display(),
            details.join("\n  ")
        );
    }
    Ok(config)
}

fn display_summary(summary: &RunSummary, formatter: &dyn OutputFormatter) {
    let duration = summary
        .finished_at
        .map(|end| (end - summary.started_at).num_milliseconds() as f64 / 1000.0)
        .unwrap_or_default();
    let verb = if summary.undo { "Undo" } else { "Sync" };
    formatter.success(&format!(
        "{verb} completed for {} in {duration:.1}s",
        plural(summary.accounts.len(), "account")
    ));

    for account in &summary.accounts {
        let line = if summary.undo {
            format!(
                "{}: {} removed, {} removed, {} failed",
                account.account,
                plural(account.deleted, "contact"),
                plural(account.groups_deleted, "group"),
                account.failed
            )
        } else {
            format!(
                "{}: {} inserted, {} updated, {} renamed, {} restored, {} deleted, {} failed",
                account.account,
                account.inserted,
                account.updated,
                account.renamed,
                account.restored,
                account.deleted,
                account.failed
            )
        };
        formatter.info(&line);
    }

    let failed = summary.total_failed();
    if failed > 0 {
        formatter.warn(&format!(
            "{} failed; see the log for the affected contacts",
            plural(failed, "operation")
        ));
    }
}
