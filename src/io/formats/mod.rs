//! Format adapters for import/export.
//!
//! Each format implements [`ImportSource`] and [`ExportSink`].

pub mod csv;
pub mod json;

use crate::{Error, Result};
use std::path::Path;
use std::str::FromStr;

pub use self::csv::Headers;

use super::traits::{ExportSink, ImportSource};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Comma-separated values with a header row.
    #[default]
    Csv,
    /// A JSON array of objects.
    Json,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is missing or not recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("json") => Ok(Self::Json),
            Some(ext) => Err(Error::InvalidInput(format!(
                "Unsupported file extension: .{ext}"
            ))),
            None => Err(Error::InvalidInput(
                "Cannot determine format: file has no extension".to_string(),
            )),
        }
    }

    /// Parses `text` into an import source.
    ///
    /// `headers` applies to CSV only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the document is malformed.
    pub fn import_source(self, text: &str, headers: &Headers) -> Result<Box<dyn ImportSource>> {
        match self {
            Self::Csv => Ok(Box::new(csv::CsvImportSource::parse(text, headers)?)),
            Self::Json => Ok(Box::new(json::JsonImportSource::parse(text)?)),
        }
    }

    /// Creates an export sink rendering rows under `header`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn export_sink(self, header: &[String]) -> Result<Box<dyn ExportSink>> {
        match self {
            Self::Csv => Ok(Box::new(csv::CsvExportSink::new(header)?)),
            Self::Json => Ok(Box::new(json::JsonExportSink::new())),
        }
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(Error::InvalidInput(format!("Unknown format: {s}"))),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
