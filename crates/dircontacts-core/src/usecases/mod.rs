//! Use cases (interactors) for dircontacts
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Use cases are thin coordinators
//! that delegate business rules to domain methods and I/O to ports.
//!
//! ## Use Cases
//!
//! - [`SelectUsersUseCase`] - Directory listing split into source records and target accounts

pub mod select_users;

pub use select_users::{select, SelectUsersUseCase, Selection, SelectionCriteria};
