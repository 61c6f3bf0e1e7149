//! Config command - View and manage dircontacts configuration
//!
//! Provides the `dircontacts config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual values via dot-notation keys
//! 3. Validates the configuration file and reports every error
//! 4. Prints the configuration file location

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use dircontacts_core::config::Config;

use crate::output::{get_formatter, plural, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "directory.domain")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Print the configuration file location
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Set { key, value } => execute_set(config_path, key, value, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
            ConfigCommand::Path => {
                if format.is_json() {
                    get_formatter(format).print_json(&serde_json::json!({
                        "config_path": config_path.display().to_string(),
                        "exists": config_path.exists(),
                    }));
                } else {
                    println!("{}", config_path.display());
                }
                Ok(())
            }
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);
    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");
        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(config_path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);
    info!(key = %key, value = %value, "Setting configuration value");

    apply_config_value(&mut config, key, value)
        .with_context(|| format!("Failed to set '{key}'"))?;

    // Only reject errors the new value introduced; a fresh file still lacks
    // its required fields.
    let errors: Vec<String> = config
        .validate()
        .into_iter()
        .filter(|e| e.field == key)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        bail!("Invalid value for '{key}': {}", errors.join("; "));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
    std::fs::write(config_path, yaml).context("Failed to write configuration file")?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key} = {value}"));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        bail!(
            "Configuration file not found at {}. Run 'dircontacts config set directory.domain <domain>' to create one",
            config_path.display()
        );
    }
    let config = Config::load(config_path)?;
    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();
    if format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    if !errors.is_empty() {
        bail!(
            "Configuration has {}",
            plural(errors.len(), "error")
        );
    }
    Ok(())
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .context("Expected 'true' or 'false'")
}

/// Apply a dot-notation key/value pair to a Config struct
///
/// Optional values are cleared with an empty string or `none`.
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- directory ---
        "directory.domain" => config.directory.domain = value.to_string(),
        "directory.page_size" => {
            config.directory.page_size = value
                .parse::<u32>()
                .context("Expected a positive integer for directory.page_size")?;
        }
        "directory.base_url" => config.directory.base_url = value.to_string(),

        // --- contacts ---
        "contacts.default_relation" => config.contacts.default_relation = value.to_string(),
        "contacts.batch_max" => {
            config.contacts.batch_max = value
                .parse::<usize>()
                .context("Expected a positive integer for contacts.batch_max")?;
        }
        "contacts.max_contacts" => {
            config.contacts.max_contacts = value
                .parse::<usize>()
                .context("Expected a positive integer for contacts.max_contacts")?;
        }
        "contacts.base_url" => config.contacts.base_url = value.to_string(),

        // --- opt_out ---
        "opt_out.url" => config.opt_out.url = optional(value),
        "opt_out.setting" => config.opt_out.setting = value.to_string(),

        // --- auth ---
        "auth.client_id" => config.auth.client_id = optional(value),
        "auth.client_secret" => config.auth.client_secret = optional(value),
        "auth.redirect_port" => {
            config.auth.redirect_port = value
                .parse::<u16>()
                .context("Expected a port number for auth.redirect_port")?;
        }
        "auth.service_account_key" => {
            config.auth.service_account_key = optional(value).map(PathBuf::from);
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = optional(value).map(PathBuf::from),
        "logging.format" => config.logging.format = value.to_string(),

        // --- defaults ---
        "defaults.select_pattern" => config.defaults.select_pattern = value.to_string(),
        "defaults.user_pattern" => config.defaults.user_pattern = value.to_string(),
        "defaults.no_phone" => config.defaults.no_phone = parse_bool(value)?,
        "defaults.group" => config.defaults.group = value.to_string(),
        "defaults.my_contacts" => config.defaults.my_contacts = parse_bool(value)?,
        "defaults.delete_old" => config.defaults.delete_old = parse_bool(value)?,
        "defaults.rename_old" => config.defaults.rename_old = parse_bool(value)?,
        "defaults.rename_suffix" => config.defaults.rename_suffix = optional(value),
        "defaults.add_other_emails" => config.defaults.add_other_emails = parse_bool(value)?,
        "defaults.add_aliases" => config.defaults.add_aliases = parse_bool(value)?,
        "defaults.organization_name" => config.defaults.organization_name = optional(value),

        _ => bail!("Unknown configuration key: '{key}'"),
    }
    Ok(())
}
