//! Bulk import and export.
//!
//! # Architecture
//!
//! - **Format adapters** turn text into [`ImportSource`] rows and render
//!   field sets through an [`ExportSink`]
//! - **Record collections** implement [`BatchSource`] so the exporter can
//!   walk them in fixed-size batches
//! - **Services** tie formats, redaction and the record store together
//!
//! # Formats
//!
//! | Format | Import | Export | Notes |
//! |--------|--------|--------|-------|
//! | CSV | ✓ | ✓ | Header row or explicit headers on import |
//! | JSON | ✓ | ✓ | A single array of objects |
//!
//! # Examples
//!
//! ```rust,ignore
//! use bulkport::io::{ExportOptions, ExportService};
//!
//! let exporter = ExportService::new(&store, &config, ExportOptions::default());
//! let result = exporter.to_csv(&store.relation("User")?)?;
//! for (name, doc) in result.file_names("User", chrono::Utc::now()).iter().zip(&result.exports) {
//!     std::fs::write(name, doc)?;
//! }
//! ```

pub mod formats;
pub mod services;
pub mod traits;

pub use formats::{Format, Headers};
pub use services::export::{
    EmailOptions, ExportOptions, ExportResult, ExportService, export_file_name,
};
pub use services::import::{
    AcceptedRow, ImportOptions, ImportProgress, ImportResult, ImportService, ProgressCallback,
    RejectedRow, RowMapping,
};
pub use traits::{BatchSource, ExportSink, ImportSource, ImportedRow, Records, RowData};
