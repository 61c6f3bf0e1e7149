//! dircontacts CLI - Directory users as managed contacts
//!
//! Provides commands for:
//! - Syncing directory users into each target account's managed group
//! - Undoing everything the sync created
//! - Administrator authorization against the directory
//! - Inspecting and validating configuration

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use dircontacts_core::config::{Config, LoggingConfig};

mod commands;
mod output;

use commands::{
    auth::AuthCommand, completions::CompletionsCommand, config::ConfigCommand, sync::SyncCommand,
};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "dircontacts",
    version,
    about = "Keep directory users as managed contacts in every account of a domain"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sync directory users into each target account's contacts
    Sync(SyncCommand),
    /// Administrator authorization commands
    #[command(subcommand)]
    Auth(AuthCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Filter directive used when `RUST_LOG` is unset.
///
/// `-v` and `-vv` override the configured level; `-q` lowers it to
/// warnings.
fn filter_directive(verbose: u8, quiet: bool, configured: &str) -> String {
    match verbose {
        0 if quiet => "warn".to_string(),
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) -> Result<()> {
    let directive = filter_directive(cli.verbose, cli.quiet, &logging.level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let json = logging.format == "json";

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            let writer = Mutex::new(file);
            if json {
                builder.json().with_ansi(false).with_writer(writer).init();
            } else {
                builder.with_ansi(false).with_writer(writer).init();
            }
        }
        None => {
            if json {
                builder.json().with_writer(std::io::stderr).init();
            } else {
                builder.with_writer(std::io::stderr).init();
            }
        }
    }
    Ok(())
}

async fn run(cli: &Cli, config_path: &Path, format: OutputFormat) -> Result<()> {
    match &cli.command {
        Commands::Sync(cmd) => cmd.execute(config_path, format).await,
        Commands::Auth(cmd) => cmd.execute(config_path, format).await,
        Commands::Config(cmd) => cmd.execute(config_path, format).await,
        Commands::Completions(cmd) => cmd.execute(format).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::from_flags(cli.json, cli.quiet);
    let formatter = get_formatter(format);

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    // Logging settings come from the file when it is readable; commands
    // report a broken file themselves.
    let logging = Config::load(&config_path)
        .map(|c| c.logging)
        .unwrap_or_default();
    if let Err(e) = init_tracing(&cli, &logging) {
        formatter.error(&format!("{e:#}"));
        return ExitCode::FAILURE;
    }

    match run(&cli, &config_path, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            formatter.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
