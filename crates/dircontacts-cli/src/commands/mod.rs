//! CLI subcommands

pub mod auth;
pub mod completions;
pub mod config;
pub mod sync;
