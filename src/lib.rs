//! # Bulkport
//!
//! Bulk transfer of records between CSV/JSON text and a record store.
//!
//! Two pipelines share one shape (reader, field mapper/filter, record sink,
//! result accumulator):
//!
//! - **Export** reads a batchable record collection, redacts sensitive fields,
//!   serializes each batch to an independent CSV or JSON document and can
//!   mail the documents as attachments.
//! - **Import** parses CSV or JSON text into field sets, renames and strips
//!   keys, merges caller context, saves one record per row and reports every
//!   row as accepted or rejected. Rollback mode runs the whole import inside
//!   one unit of work and undoes every write if any row fails.
//!
//! Persistence, transactions, mail delivery and the wall clock are
//! collaborators behind narrow traits ([`RecordStore`], [`UnitOfWork`],
//! [`Mailer`], [`Clock`]). A rusqlite-backed store ships as the reference
//! implementation.
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulkport::{Headers, ImportOptions, ImportService, RowMapping};
//! use bulkport::storage::SqliteRecordStore;
//!
//! let store = SqliteRecordStore::open("app.db")?;
//! store.register_model("User", "users")?;
//!
//! let importer = ImportService::new(&store, "User", ImportOptions::default());
//! let result = importer.csv(
//!     "email,password\nuser@x.com,secret1",
//!     &Headers::FirstRow,
//!     &RowMapping::default(),
//! )?;
//! assert_eq!(result.rows_accepted.len(), 1);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod clock;
pub mod config;
pub mod io;
pub mod mail;
pub mod models;
pub mod observability;
pub mod security;
pub mod storage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BulkportConfig;
pub use io::{
    AcceptedRow, BatchSource, EmailOptions, ExportOptions, ExportResult, ExportService, Format,
    Headers, ImportOptions, ImportResult, ImportService, Records, RejectedRow, RowData,
    RowMapping,
};
pub use mail::{Attachment, Mailer, Message, OutboxMailer};
pub use models::{
    AttributeMap, Context, ContextValue, FieldErrors, FieldSet, Record, RecordId, SaveOutcome,
};
pub use security::{FILTERED_PLACEHOLDER, FieldFilter};
pub use storage::{RecordStore, SqliteRecordStore, UnitOfWork, run_atomically};

/// Error type for bulkport operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed CSV/JSON, unknown attributes, bad CLI values |
/// | `Configuration` | A required setting is unresolved (e.g. no sender address) |
/// | `RecordInvalid` | A strict save fails store-side validation |
/// | `TransactionAborted` | A row fails while an import runs in rollback mode |
/// | `ContextDerivation` | A context deriving function fails for a row |
/// | `OperationFailed` | Store, mailer or filesystem failures |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - CSV or JSON text cannot be parsed
    /// - JSON import input is not an array of objects
    /// - A row names an attribute the target model does not have
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A required setting could not be resolved.
    ///
    /// Raised before any work is performed, e.g. when an emailed export has
    /// neither an explicit nor a configured sender address.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A record failed validation during a strict save.
    #[error("{model} record invalid: {}", models::describe_errors(errors))]
    RecordInvalid {
        /// The model the record belongs to.
        model: String,
        /// Field-level validation messages.
        errors: models::FieldErrors,
    },

    /// A rollback-mode import was aborted and all of its writes discarded.
    #[error("import aborted at row {row}, all writes rolled back: {}", models::describe_errors(errors))]
    TransactionAborted {
        /// 1-based index of the row that failed.
        row: usize,
        /// Field-level validation messages of the failing row.
        errors: models::FieldErrors,
    },

    /// A context deriving function failed.
    #[error("context value for '{field}' could not be derived: {cause}")]
    ContextDerivation {
        /// The context key being derived.
        field: String,
        /// The underlying cause.
        cause: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - Filesystem I/O errors occur
    /// - The mailer cannot deliver a message
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Shorthand for [`Error::OperationFailed`].
    pub fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for bulkport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::operation("test", "failed");
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Configuration("missing sender".to_string());
        assert_eq!(err.to_string(), "configuration error: missing sender");
    }

    #[test]
    fn test_validation_error_display() {
        let mut errors = FieldErrors::new();
        errors.add("password", "can't be blank");

        let err = Error::RecordInvalid {
            model: "User".to_string(),
            errors: errors.clone(),
        };
        assert_eq!(
            err.to_string(),
            "User record invalid: password can't be blank"
        );

        let err = Error::TransactionAborted { row: 2, errors };
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("password can't be blank"));
    }
}
