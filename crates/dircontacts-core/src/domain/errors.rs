//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures of directory data and invalid
//! combinations of sync options.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid email address format
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    /// Employee identifier is empty or whitespace
    #[error("Invalid employee ID: {0:?}")]
    InvalidEmployeeId(String),

    /// Store resource name is empty
    #[error("Invalid resource name: {0:?}")]
    InvalidResourceName(String),

    /// A directory record cannot become a contact without a full name
    #[error("Directory record {0} has no full name")]
    MissingFullName(String),

    /// A directory record without a primary email
    #[error("Directory record has no primary email")]
    MissingPrimaryEmail,

    /// Glob pattern failed to compile
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Why it was rejected
        reason: String,
    },

    /// Relation name unknown to the classifier table
    #[error("Invalid relation: {0}")]
    InvalidRelation(String),

    /// Delete and rename of surplus contacts were both requested
    #[error("Conflicting options: delete-old and rename-old cannot be used together")]
    ConflictingSurplusOptions,

    /// Rename of surplus contacts requested without a suffix
    #[error("rename-old requires a non-empty rename suffix")]
    MissingRenameSuffix,

    /// Opt-out payload did not have the expected shape
    #[error("Malformed opt-out payload: {0}")]
    MalformedOptOut(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidEmail("notanemail".to_string());
        assert_eq!(err.to_string(), "Invalid email format: notanemail");

        let err = DomainError::MissingFullName("alice@example.com".to_string());
        assert_eq!(
            err.to_string(),
            "Directory record alice@example.com has no full name"
        );

        let err = DomainError::InvalidPattern {
            pattern: "[".to_string(),
            reason: "unclosed bracket".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid pattern \"[\": unclosed bracket");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            DomainError::ConflictingSurplusOptions,
            DomainError::ConflictingSurplusOptions
        );
        assert_ne!(
            DomainError::InvalidEmployeeId("a".into()),
            DomainError::InvalidEmployeeId("b".into())
        );
    }
}
