//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDirectorySource`] - Paginated listing of directory users
//! - [`IOptOutSource`] - Addresses excluded from receiving contacts
//! - [`IContactService`] / [`IContactStore`] - Per-account contact storage

pub mod contact_store;
pub mod directory_source;
pub mod opt_out;

pub use contact_store::{
    BatchOperation, BatchOperationKind, BatchOutcome, IContactService, IContactStore,
};
pub use directory_source::{IDirectorySource, UserPage};
pub use opt_out::{IOptOutSource, NoOptOut};
