//! Configuration module for dircontacts.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::domain::Relation;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for dircontacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub directory: DirectoryConfig,
    pub contacts: ContactsConfig,
    pub markers: MarkersConfig,
    pub opt_out: OptOutConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
    /// Defaults for the behavioral flags of `dircontacts sync`.
    pub defaults: SyncDefaults,
}

/// Directory listing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Domain whose users are listed. Required.
    pub domain: String,
    /// Users requested per directory page (1-500).
    pub page_size: u32,
    /// Base URL of the directory API.
    pub base_url: String,
}

/// Contact store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactsConfig {
    /// Relation given to fields without a type; must be sync-owned.
    pub default_relation: String,
    /// Queued batch operations that trigger a flush.
    pub batch_max: usize,
    /// Maximum contacts read from one listing.
    pub max_contacts: usize,
    /// Base URL of the contacts API.
    pub base_url: String,
}

/// Names and values of the marker tags written on contacts and groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkersConfig {
    pub contact_id_name: String,
    pub contact_source_name: String,
    pub contact_source_value: String,
    pub contact_renamed_name: String,
    pub contact_renamed_value: String,
    pub group_name: String,
    pub group_value: String,
}

/// Opt-out list settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptOutConfig {
    /// URL returning the opt-out JSON document. No URL means nobody opted out.
    pub url: Option<String>,
    /// Key under `settings` holding the opted-out addresses.
    pub setting: String,
}

/// Authentication / OAuth settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth client ID for the interactive administrator login.
    pub client_id: Option<String>,
    /// OAuth client secret for the interactive administrator login.
    pub client_secret: Option<String>,
    /// Scopes requested by the administrator login.
    pub scopes: Vec<String>,
    /// Local port for the OAuth redirect listener.
    pub redirect_port: u16,
    /// Service account key (JSON) used to act as each target account.
    pub service_account_key: Option<PathBuf>,
    /// Scopes requested when acting as a target account.
    pub delegated_scopes: Vec<String>,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Append log events to this file instead of stderr.
    pub file: Option<PathBuf>,
    /// `text` or `json`.
    pub format: String,
}

/// Default values for the behavioral flags of a sync run.
///
/// A flag given on the command line always wins over these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncDefaults {
    pub select_pattern: String,
    pub user_pattern: String,
    pub no_phone: bool,
    pub group: String,
    pub my_contacts: bool,
    pub delete_old: bool,
    pub rename_old: bool,
    pub rename_suffix: Option<String>,
    pub add_other_emails: bool,
    pub add_aliases: bool,
    pub organization_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/dircontacts/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("dircontacts")
            .join("config.yaml")
    }

    /// The configured default relation, parsed.
    ///
    /// Falls back to `work` when the value is invalid; [`Config::validate`]
    /// reports the invalid value.
    pub fn default_relation(&self) -> Relation {
        self.contacts
            .default_relation
            .parse()
            .unwrap_or(Relation::Work)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            page_size: 500,
            base_url: "https://admin.googleapis.com".into(),
        }
    }
}

impl Default for ContactsConfig {
    fn default() -> Self {
        Self {
            default_relation: "work".into(),
            batch_max: 100,
            max_contacts: 10_000,
            base_url: "https://people.googleapis.com".into(),
        }
    }
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            contact_id_name: "dircontacts.employee_id".into(),
            contact_source_name: "dircontacts.source".into(),
            contact_source_value: "directory".into(),
            contact_renamed_name: "dircontacts.renamed".into(),
            contact_renamed_value: "true".into(),
            group_name: "dircontacts.group".into(),
            group_value: "directory".into(),
        }
    }
}

impl Default for OptOutConfig {
    fn default() -> Self {
        Self {
            url: None,
            setting: "optout_employees".into(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            scopes: vec![
                "https://www.googleapis.com/auth/admin.directory.user.readonly".into(),
            ],
            redirect_port: 8400,
            service_account_key: None,
            delegated_scopes: vec!["https://www.googleapis.com/auth/contacts".into()],
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
            format: "text".into(),
        }
    }
}

impl Default for SyncDefaults {
    fn default() -> Self {
        Self {
            select_pattern: "*".into(),
            user_pattern: "*".into(),
            no_phone: false,
            group: "Directory".into(),
            my_contacts: false,
            delete_old: false,
            rename_old: false,
            rename_suffix: None,
            add_other_emails: false,
            add_aliases: false,
            organization_name: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"directory.domain"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Largest page the directory API serves.
const MAX_PAGE_SIZE: u32 = 500;

/// Largest batch the contacts API accepts.
const MAX_BATCH: usize = 200;

fn error(field: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- directory ---
        if self.directory.domain.trim().is_empty() {
            errors.push(error("directory.domain", "is required"));
        }
        if self.directory.page_size == 0 || self.directory.page_size > MAX_PAGE_SIZE {
            errors.push(error(
                "directory.page_size",
                format!("must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        // --- contacts ---
        match self.contacts.default_relation.parse::<Relation>() {
            Ok(rel) if rel.is_sync_owned() => {}
            Ok(_) => errors.push(error(
                "contacts.default_relation",
                "must be a sync-owned relation (work or mobile)",
            )),
            Err(e) => errors.push(error("contacts.default_relation", e.to_string())),
        }
        if self.contacts.batch_max == 0 || self.contacts.batch_max > MAX_BATCH {
            errors.push(error(
                "contacts.batch_max",
                format!("must be between 1 and {MAX_BATCH}"),
            ));
        }
        if self.contacts.max_contacts == 0 {
            errors.push(error("contacts.max_contacts", "must be greater than 0"));
        }

        // --- markers ---
        let m = &self.markers;
        for (field, value) in [
            ("markers.contact_id_name", &m.contact_id_name),
            ("markers.contact_source_name", &m.contact_source_name),
            ("markers.contact_source_value", &m.contact_source_value),
            ("markers.contact_renamed_name", &m.contact_renamed_name),
            ("markers.contact_renamed_value", &m.contact_renamed_value),
            ("markers.group_name", &m.group_name),
            ("markers.group_value", &m.group_value),
        ] {
            if value.trim().is_empty() {
                errors.push(error(field, "is required"));
            }
        }
        if m.contact_id_name == m.contact_source_name
            || m.contact_id_name == m.contact_renamed_name
            || m.contact_source_name == m.contact_renamed_name
        {
            errors.push(error("markers", "contact marker names must be distinct"));
        }

        // --- opt_out ---
        if self.opt_out.url.is_some() && self.opt_out.setting.trim().is_empty() {
            errors.push(error("opt_out.setting", "is required when opt_out.url is set"));
        }

        // --- auth ---
        if is_blank(&self.auth.client_id) {
            errors.push(error("auth.client_id", "is required"));
        }
        if is_blank(&self.auth.client_secret) {
            errors.push(error("auth.client_secret", "is required"));
        }
        if self.auth.scopes.is_empty() {
            errors.push(error("auth.scopes", "must not be empty"));
        }
        if self.auth.service_account_key.is_none() {
            errors.push(error("auth.service_account_key", "is required"));
        }
        if self.auth.delegated_scopes.is_empty() {
            errors.push(error("auth.delegated_scopes", "must not be empty"));
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(error(
                "logging.level",
                format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            ));
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(error(
                "logging.format",
                format!("invalid format '{}', expected text or json", self.logging.format),
            ));
        }

        // --- defaults ---
        for (field, pattern) in [
            ("defaults.select_pattern", &self.defaults.select_pattern),
            ("defaults.user_pattern", &self.defaults.user_pattern),
        ] {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(error(field, e.to_string()));
            }
        }
        if self.defaults.delete_old && self.defaults.rename_old {
            errors.push(error(
                "defaults",
                "delete_old and rename_old cannot both be set",
            ));
        }
        if self.defaults.rename_old && is_blank(&self.defaults.rename_suffix) {
            errors.push(error(
                "defaults.rename_suffix",
                "is required when rename_old is set",
            ));
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- directory ---

    pub fn directory_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.directory.domain = domain.into();
        self
    }

    pub fn directory_page_size(mut self, page_size: u32) -> Self {
        self.config.directory.page_size = page_size;
        self
    }

    pub fn directory_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.directory.base_url = url.into();
        self
    }

    // --- contacts ---

    pub fn contacts_default_relation(mut self, relation: impl Into<String>) -> Self {
        self.config.contacts.default_relation = relation.into();
        self
    }

    pub fn contacts_batch_max(mut self, n: usize) -> Self {
        self.config.contacts.batch_max = n;
        self
    }

    pub fn contacts_max_contacts(mut self, n: usize) -> Self {
        self.config.contacts.max_contacts = n;
        self
    }

    pub fn contacts_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.contacts.base_url = url.into();
        self
    }

    // --- markers ---

    pub fn markers(mut self, markers: MarkersConfig) -> Self {
        self.config.markers = markers;
        self
    }

    // --- opt_out ---

    pub fn opt_out_url(mut self, url: impl Into<String>) -> Self {
        self.config.opt_out.url = Some(url.into());
        self
    }

    // --- auth ---

    pub fn auth_client(mut self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.config.auth.client_id = Some(id.into());
        self.config.auth.client_secret = Some(secret.into());
        self
    }

    pub fn auth_service_account_key(mut self, path: PathBuf) -> Self {
        self.config.auth.service_account_key = Some(path);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_file(mut self, file: PathBuf) -> Self {
        self.config.logging.file = Some(file);
        self
    }

    // --- defaults ---

    pub fn defaults(mut self, defaults: SyncDefaults) -> Self {
        self.config.defaults = defaults;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
