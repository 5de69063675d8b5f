//! Configuration management.
//!
//! [`BulkportConfig`] is an explicit value handed to the export and import
//! services; there is no process-wide mutable state. Defaults can be
//! overridden from a TOML file and from environment variables.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Field-name fragments redacted from exports by default.
pub const DEFAULT_FILTERED_ATTRIBUTES: &[&str] = &[
    "passw",
    "secret",
    "token",
    "_key",
    "crypt",
    "salt",
    "certificate",
    "otp",
    "ssn",
];

/// Default number of records per export batch.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Environment variable overriding the default sender address.
pub const ENV_FROM_ADDRESS: &str = "BULKPORT_FROM_ADDRESS";

/// Environment variable overriding the default batch size.
pub const ENV_BATCH_SIZE: &str = "BULKPORT_BATCH_SIZE";

/// Main configuration for bulkport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkportConfig {
    /// Field-name fragments redacted from exports.
    pub filtered_attributes: Vec<String>,
    /// Sender used for emailed exports when none is given explicitly.
    pub from_address: Option<String>,
    /// Records per export batch.
    pub batch_size: usize,
    /// Files this configuration was loaded from.
    pub config_sources: Vec<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Replaces the default filtered attributes.
    pub filtered_attributes: Option<Vec<String>>,
    /// Default sender address.
    pub from_address: Option<String>,
    /// Default batch size.
    pub batch_size: Option<usize>,
}

impl Default for BulkportConfig {
    fn default() -> Self {
        Self {
            filtered_attributes: DEFAULT_FILTERED_ATTRIBUTES
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            from_address: None,
            batch_size: DEFAULT_BATCH_SIZE,
            config_sources: Vec::new(),
        }
    }
}

impl BulkportConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        let mut config = Self::from_config_file(file);
        config.config_sources.push(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `bulkport/config.toml` under the platform config directory
    /// and falls back to defaults when it is missing or unreadable.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }
        Self::default()
    }

    /// Returns the default config file location, if a home directory exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("bulkport").join("config.toml"))
    }

    /// Applies `BULKPORT_FROM_ADDRESS` and `BULKPORT_BATCH_SIZE` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Configuration`] if the batch size is not a
    /// positive integer.
    pub fn apply_env(self) -> crate::Result<Self> {
        self.apply_overrides(
            std::env::var(ENV_FROM_ADDRESS).ok(),
            std::env::var(ENV_BATCH_SIZE).ok(),
        )
    }

    fn apply_overrides(
        mut self,
        from_address: Option<String>,
        batch_size: Option<String>,
    ) -> crate::Result<Self> {
        if let Some(from) = from_address.filter(|s| !s.trim().is_empty()) {
            self.from_address = Some(from);
        }
        if let Some(raw) = batch_size {
            self.batch_size = parse_batch_size(&raw)?;
        }
        Ok(self)
    }

    /// Converts a `ConfigFile` to `BulkportConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(filtered) = file.filtered_attributes {
            config.filtered_attributes = filtered;
        }
        if file.from_address.is_some() {
            config.from_address = file.from_address;
        }
        if let Some(batch_size) = file.batch_size {
            config.batch_size = batch_size;
        }

        config
    }

    /// Replaces the filtered attribute list.
    #[must_use]
    pub fn with_filtered_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filtered_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one fragment to the filtered attribute list.
    #[must_use]
    pub fn add_filtered_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.filtered_attributes.push(attribute.into());
        self
    }

    /// Sets the default sender address.
    #[must_use]
    pub fn with_from_address(mut self, from: impl Into<String>) -> Self {
        self.from_address = Some(from.into());
        self
    }

    /// Sets the default batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

fn parse_batch_size(raw: &str) -> crate::Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(crate::Error::Configuration(format!(
            "{ENV_BATCH_SIZE} must be a positive integer, got '{raw}'"
        ))),
    }
}
