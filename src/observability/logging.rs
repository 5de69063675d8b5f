//! Structured logging configuration.

use crate::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log format (`pretty` or `json`).
pub const ENV_LOG_FORMAT: &str = "BULKPORT_LOG_FORMAT";

/// Environment variable naming a file to append logs to.
pub const ENV_LOG_FILE: &str = "BULKPORT_LOG_FILE";

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(Error::InvalidInput(format!("Unknown log format: {s}"))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info` or `bulkport=debug`.
    pub filter: String,
    /// Append to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds the configuration from `RUST_LOG` and the `BULKPORT_LOG_*`
    /// variables.
    ///
    /// `verbose` raises the default level to `debug`; an explicit `RUST_LOG`
    /// still wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown log format.
    pub fn from_env(verbose: bool) -> Result<Self> {
        Self::from_overrides(
            verbose,
            std::env::var("RUST_LOG").ok(),
            std::env::var(ENV_LOG_FORMAT).ok(),
            std::env::var(ENV_LOG_FILE).ok(),
        )
    }

    fn from_overrides(
        verbose: bool,
        rust_log: Option<String>,
        format: Option<String>,
        file: Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();
        if verbose {
            config.filter = "debug".to_string();
        }
        if let Some(directive) = rust_log.filter(|s| !s.trim().is_empty()) {
            config.filter = directive;
        }
        if let Some(format) = format {
            config.format = format.parse()?;
        }
        config.file = file.filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        Ok(config)
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the log file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Builds the subscriber filter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.filter).map_err(|e| {
            Error::Configuration(format!("invalid log filter '{}': {e}", self.filter))
        })
    }
}
