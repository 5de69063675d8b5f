//! Binary entry point for bulkport.
//!
//! Imports CSV/JSON files into a `SQLite` database and exports tables back
//! out, optionally delivering exports by mail.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow unnecessary_wraps for consistent command function signatures
#![allow(clippy::unnecessary_wraps)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use anyhow::Context as _;
use bulkport::config::BulkportConfig;
use bulkport::observability::{self, LogFormat, LoggingConfig};
use clap::{Parser, Subcommand};
use commands::{ExportArgs, ImportArgs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Environment variable naming the configuration file.
const ENV_CONFIG_PATH: &str = "BULKPORT_CONFIG_PATH";

/// Bulkport - bulk CSV/JSON import and export.
#[derive(Parser)]
#[command(name = "bulkport")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log format: pretty or json.
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Import a CSV or JSON file into a table.
    Import(ImportArgs),

    /// Export a table to CSV or JSON files, or mail them.
    Export(ExportArgs),

    /// Show the effective configuration.
    Config,
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    let result = match cli.command {
        Commands::Import(args) => commands::cmd_import(&config, args),
        Commands::Export(args) => commands::cmd_export(&config, args),
        Commands::Config => commands::cmd_config(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let mut logging = LoggingConfig::from_env(cli.verbose)?;
    if let Some(format) = &cli.log_format {
        logging = logging.with_format(format.parse::<LogFormat>()?);
    }
    if let Some(file) = &cli.log_file {
        logging = logging.with_file(file);
    }
    observability::init(&logging)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BulkportConfig> {
    let explicit = path.map(Path::to_path_buf).or_else(|| {
        std::env::var(ENV_CONFIG_PATH)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
    });

    let config = match explicit {
        Some(path) => BulkportConfig::load_from_file(&path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => BulkportConfig::load_default(),
    };

    Ok(config.apply_env()?)
}
