//! Behavioral switches of one sync run
//!
//! [`SyncOptions`] is the validated form of the command-line flags merged
//! with the configured defaults. Conflicting surplus handling is rejected
//! here, before any network call is made.

use crate::config::SyncDefaults;
use crate::domain::DomainError;

/// What happens to managed contacts whose source user disappeared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurplusPolicy {
    /// Leave them untouched.
    Keep,
    /// Delete them.
    Delete,
    /// Append the suffix to their names and mark them renamed.
    Rename { suffix: String },
}

impl SurplusPolicy {
    /// The rename suffix when renaming is active.
    #[must_use]
    pub fn rename_suffix(&self) -> Option<&str> {
        match self {
            Self::Rename { suffix } => Some(suffix),
            _ => None,
        }
    }
}

/// Validated options for a sync run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Glob selecting the users copied as contacts.
    pub select_pattern: glob::Pattern,
    /// Glob selecting the accounts receiving the contacts.
    pub user_pattern: glob::Pattern,
    /// Only copy users with at least one phone number.
    pub require_phone: bool,
    /// Title of the managed group when it has to be created.
    pub group_title: String,
    /// Also put new contacts in the default contacts group.
    pub add_to_my_contacts: bool,
    pub surplus: SurplusPolicy,
    pub add_other_emails: bool,
    pub add_aliases: bool,
    /// Organization name used when the directory has none.
    pub organization_name: Option<String>,
    /// Remove everything this system created instead of syncing.
    pub undo: bool,
}

/// Raw flag values before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncFlags {
    pub select_pattern: Option<String>,
    pub user_pattern: Option<String>,
    pub no_phone: bool,
    pub group: Option<String>,
    pub my_contacts: bool,
    pub delete_old: bool,
    pub rename_old: bool,
    pub rename_suffix: Option<String>,
    pub add_other_emails: bool,
    pub add_aliases: bool,
    pub organization_name: Option<String>,
    pub undo: bool,
}

impl SyncFlags {
    /// Fill every flag not given on the command line from `defaults`.
    #[must_use]
    pub fn with_defaults(self, defaults: &SyncDefaults) -> Self {
        Self {
            select_pattern: self
                .select_pattern
                .or_else(|| Some(defaults.select_pattern.clone())),
            user_pattern: self
                .user_pattern
                .or_else(|| Some(defaults.user_pattern.clone())),
            no_phone: self.no_phone || defaults.no_phone,
            group: self.group.or_else(|| Some(defaults.group.clone())),
            my_contacts: self.my_contacts || defaults.my_contacts,
            delete_old: self.delete_old || defaults.delete_old,
            rename_old: self.rename_old || defaults.rename_old,
            rename_suffix: self.rename_suffix.or_else(|| defaults.rename_suffix.clone()),
            add_other_emails: self.add_other_emails || defaults.add_other_emails,
            add_aliases: self.add_aliases || defaults.add_aliases,
            organization_name: self
                .organization_name
                .or_else(|| defaults.organization_name.clone()),
            undo: self.undo,
        }
    }
}

impl TryFrom<SyncFlags> for SyncOptions {
    type Error = DomainError;

    fn try_from(flags: SyncFlags) -> Result<Self, Self::Error> {
        let surplus = match (flags.delete_old, flags.rename_old) {
            (true, true) => return Err(DomainError::ConflictingSurplusOptions),
            (true, false) => SurplusPolicy::Delete,
            (false, true) => match flags.rename_suffix.filter(|s| !s.trim().is_empty()) {
                Some(suffix) => SurplusPolicy::Rename { suffix },
                None => return Err(DomainError::MissingRenameSuffix),
            },
            (false, false) => SurplusPolicy::Keep,
        };

        Ok(Self {
            select_pattern: compile(flags.select_pattern.as_deref().unwrap_or("*"))?,
            user_pattern: compile(flags.user_pattern.as_deref().unwrap_or("*"))?,
            require_phone: !flags.no_phone,
            group_title: flags.group.unwrap_or_else(|| "Directory".into()),
            add_to_my_contacts: flags.my_contacts,
            surplus,
            add_other_emails: flags.add_other_emails,
            add_aliases: flags.add_aliases,
            organization_name: flags.organization_name.filter(|n| !n.is_empty()),
            undo: flags.undo,
        })
    }
}

fn compile(pattern: &str) -> Result<glob::Pattern, DomainError> {
    glob::Pattern::new(pattern).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}
