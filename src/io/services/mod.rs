//! Export and import services.

pub mod export;
pub mod import;

pub use export::{EmailOptions, ExportOptions, ExportResult, ExportService, export_file_name};
pub use import::{
    AcceptedRow, ImportOptions, ImportProgress, ImportResult, ImportService, ProgressCallback,
    RejectedRow, RowMapping,
};
