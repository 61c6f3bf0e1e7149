//! dircontacts Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `DirectoryRecord`, `ContactRecord`, `ContactGroup`, `Markers`
//! - **Domain rules** - classifier mapping, the contact transformer and the field merge
//! - **Use cases** - `SelectUsersUseCase`
//! - **Port definitions** - Traits for adapters: `IDirectorySource`, `IOptOutSource`, `IContactService`
//! - **Configuration** - YAML configuration and validated run options
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod options;
pub mod ports;
pub mod usecases;
