//! Command handlers module.
//!
//! - `io.rs`: import and export commands
//! - `config.rs`: configuration display command

mod config;
mod io;

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use bulkport::models::{AttributeMap, Context};
use bulkport::storage::SqliteRecordStore;
use clap::Args;
use serde_json::Value;

pub use config::cmd_config;
pub use io::{cmd_export, cmd_import};

/// Arguments shared by commands that open a database table.
#[derive(Args)]
pub struct TableArgs {
    /// `SQLite` database file.
    #[arg(long)]
    pub db: PathBuf,

    /// Model name, e.g. `User`.
    #[arg(short, long)]
    pub model: String,

    /// Table backing the model (default: lowercased model name plus `s`).
    #[arg(long)]
    pub table: Option<String>,
}

impl TableArgs {
    /// Returns the table name.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| format!("{}s", self.model.to_lowercase()))
    }

    /// Opens the database and registers the model.
    pub fn open_store(&self) -> anyhow::Result<SqliteRecordStore> {
        let store = SqliteRecordStore::open(&self.db)
            .with_context(|| format!("opening {}", self.db.display()))?;
        store.register_model(&self.model, &self.table_name())?;
        Ok(store)
    }
}

/// Import command arguments.
#[derive(Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Input format: csv or json (default: from the file extension).
    #[arg(short, long)]
    pub format: Option<String>,

    /// Comma-separated CSV headers; the first line is then data.
    #[arg(long)]
    pub headers: Option<String>,

    /// Rename an input key, as FROM=TO.
    #[arg(long = "map", value_name = "FROM=TO")]
    pub mappings: Vec<String>,

    /// Set a field on every row, as FIELD=VALUE (JSON scalar or plain text).
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    pub context: Vec<String>,

    /// Drop an input key before renaming.
    #[arg(long = "filter", value_name = "KEY")]
    pub filtered: Vec<String>,

    /// Trim whitespace from keys and string values.
    #[arg(long)]
    pub strip: bool,

    /// Roll back every row if any row fails.
    #[arg(long)]
    pub rollback: bool,

    /// File to import.
    pub file: PathBuf,
}

/// Export command arguments.
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub table: TableArgs,

    /// Output format: csv or json.
    #[arg(short, long, default_value = "csv")]
    pub format: String,

    /// Comma-separated fields to export (default: all).
    #[arg(long)]
    pub attributes: Option<String>,

    /// Records per file (default: from configuration).
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Export sensitive fields unredacted.
    #[arg(long)]
    pub export_sensitive: bool,

    /// Directory receiving the exported files.
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Mail the export to this address instead of writing files.
    #[arg(long = "email-to", value_name = "ADDRESS")]
    pub email_to: Vec<String>,

    /// Sender address (default: from configuration).
    #[arg(long)]
    pub from: Option<String>,

    /// Mail subject.
    #[arg(long)]
    pub subject: Option<String>,

    /// Mail body.
    #[arg(long)]
    pub body: Option<String>,

    /// Outbox directory for mailed exports (default: `<out-dir>/outbox`).
    #[arg(long)]
    pub outbox: Option<PathBuf>,
}

/// Splits a comma-separated list, dropping empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn split_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("expected KEY=VALUE, got '{raw}'"),
    }
}

/// Parses `FROM=TO` pairs into a rename table.
pub fn parse_mappings(pairs: &[String]) -> anyhow::Result<AttributeMap> {
    pairs
        .iter()
        .map(|raw| {
            let (from, to) = split_pair(raw)?;
            Ok((from.to_string(), to.trim().to_string()))
        })
        .collect()
}

/// Parses `FIELD=VALUE` pairs into literal context entries.
pub fn parse_context(pairs: &[String]) -> anyhow::Result<Context> {
    let mut context = Context::new();
    for raw in pairs {
        let (field, value) = split_pair(raw)?;
        context = context.literal(field, parse_scalar(value));
    }
    Ok(context)
}

/// Reads a JSON scalar, falling back to the raw text.
fn parse_scalar(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) if !value.is_object() && !value.is_array() => value,
        _ => Value::String(raw.to_string()),
    }
}
