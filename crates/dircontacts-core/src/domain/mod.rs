//! Domain entities and business logic
//!
//! This module contains the core domain types for dircontacts:
//! - Newtypes for validated identifiers
//! - Directory user records as listed by the directory source
//! - Contact records and groups as held by a target account's store
//! - Relation-or-label classification and the sync-ownership predicate
//! - Marker tags identifying managed contacts and groups
//! - The directory-to-contact transformer and the field merge
//! - Domain-specific error types

pub mod classifier;
pub mod contact;
pub mod directory;
pub mod errors;
pub mod markers;
pub mod merge;
pub mod newtypes;
pub mod transform;

// Re-export commonly used types
pub use classifier::{is_sync_owned, Classifier, ClassifierMapper, Relation, EMPLOYEE_ID_LABEL};
pub use contact::{
    ClassifiedField, ContactGroup, ContactRecord, EmailAddress, ExternalId, InstantMessenger,
    Organization, PersonName, PhoneNumber, PostalAddress, MY_CONTACTS_GROUP,
};
pub use directory::DirectoryRecord;
pub use errors::DomainError;
pub use markers::{MarkerScheme, Markers};
pub use merge::merge_fields;
pub use newtypes::*;
pub use transform::ContactBuilder;
