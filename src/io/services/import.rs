//! Record import service.
//!
//! Turns CSV or JSON text into records of one model. Each row is renamed,
//! optionally stripped, merged with a per-run context and handed to the
//! record store. By default every row is attempted and the outcome of each is
//! reported; in rollback mode the first invalid row undoes the whole run.

#![allow(clippy::cast_precision_loss)]

use crate::io::formats::{Format, Headers};
use crate::io::traits::{ImportSource, RowData};
use crate::models::{AttributeMap, Context, FieldErrors, FieldSet, Record, RecordId, SaveOutcome};
use crate::storage::{RecordStore, UnitOfWork, run_atomically};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

/// Options fixed for every run of an [`ImportService`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Trim surrounding whitespace from input keys and string values.
    pub strip: bool,
    /// Undo every write of a run when any row fails validation.
    pub rollback: bool,
    /// Input keys dropped from every row before renaming (exact match).
    pub filtered_attributes: Vec<String>,
}

impl ImportOptions {
    /// Enables or disables whitespace stripping.
    #[must_use]
    pub const fn with_strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    /// Enables or disables rollback mode.
    #[must_use]
    pub const fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Sets the input keys to drop.
    #[must_use]
    pub fn with_filtered_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filtered_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }
}

/// Per-run mapping from input rows to record fields.
#[derive(Debug, Clone, Default)]
pub struct RowMapping {
    /// Input key renames.
    pub attributes: AttributeMap,
    /// Overrides merged in after renaming.
    pub context: Context,
}

impl RowMapping {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rename table.
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeMap) -> Self {
        self.attributes = attributes;
        self
    }

    /// Sets the context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }
}

/// A row that was persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedRow {
    /// The row as submitted.
    pub row: RowData,
    /// Identity the store assigned.
    pub id: RecordId,
}

/// A row the store refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    /// The row as submitted.
    pub row: RowData,
    /// Field-level validation messages.
    pub errors: FieldErrors,
}

/// Outcome of one import run.
///
/// Every input row appears in exactly one of the two lists, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    /// Rows that were persisted.
    pub rows_accepted: Vec<AcceptedRow>,
    /// Rows that failed validation.
    pub rows_rejected: Vec<RejectedRow>,
}

impl ImportResult {
    /// Creates an empty result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows_accepted: Vec::new(),
            rows_rejected: Vec::new(),
        }
    }

    /// Returns the number of rows processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.rows_accepted.len() + self.rows_rejected.len()
    }

    /// Returns whether any row was rejected.
    #[must_use]
    pub fn has_rejections(&self) -> bool {
        !self.rows_rejected.is_empty()
    }
}

/// Progress callback for import runs.
pub type ProgressCallback = Box<dyn Fn(&ImportProgress) + Send>;

/// Progress information during an import run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportProgress {
    /// Rows processed so far.
    pub processed: usize,
    /// Rows accepted so far.
    pub accepted: usize,
    /// Rows rejected so far.
    pub rejected: usize,
    /// Total rows in the input, if known.
    pub total_estimate: Option<usize>,
}

impl ImportProgress {
    /// Returns the percentage complete (0-100) if the total is known.
    #[must_use]
    pub fn percent_complete(&self) -> Option<f32> {
        self.total_estimate.map(|total| {
            if total == 0 {
                100.0
            } else {
                (self.processed as f32 / total as f32) * 100.0
            }
        })
    }
}

/// Service importing rows into one model of a record store.
pub struct ImportService<'a, S: ?Sized> {
    store: &'a S,
    model: String,
    options: ImportOptions,
    progress: Option<ProgressCallback>,
}

impl<'a, S> ImportService<'a, S>
where
    S: RecordStore + UnitOfWork + ?Sized,
{
    /// Creates an importer for `model`.
    #[must_use]
    pub fn new(store: &'a S, model: impl Into<String>, options: ImportOptions) -> Self {
        Self {
            store,
            model: model.into(),
            options,
            progress: None,
        }
    }

    /// Reports progress after every row.
    #[must_use]
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Returns the target model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the run options.
    #[must_use]
    pub const fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Imports a CSV document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for malformed text before any row is
    /// saved. In rollback mode, returns [`Error::TransactionAborted`] when a
    /// row fails validation; no row of the run is then persisted.
    #[instrument(skip(self, text, headers, mapping), fields(model = %self.model, rollback = self.options.rollback))]
    pub fn csv(&self, text: &str, headers: &Headers, mapping: &RowMapping) -> Result<ImportResult> {
        self.import(Format::Csv, text, headers, mapping)
    }

    /// Imports a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not an array of
    /// objects. In rollback mode, returns [`Error::TransactionAborted`] when a
    /// row fails validation; no row of the run is then persisted.
    #[instrument(skip(self, text, mapping), fields(model = %self.model, rollback = self.options.rollback))]
    pub fn json(&self, text: &str, mapping: &RowMapping) -> Result<ImportResult> {
        self.import(Format::Json, text, &Headers::FirstRow, mapping)
    }

    /// Imports a document of the given format.
    ///
    /// `headers` applies to CSV only.
    ///
    /// # Errors
    ///
    /// See [`ImportService::csv`] and [`ImportService::json`].
    pub fn import(
        &self,
        format: Format,
        text: &str,
        headers: &Headers,
        mapping: &RowMapping,
    ) -> Result<ImportResult> {
        let mut source = format.import_source(text, headers)?;
        self.import_from_source(source.as_mut(), mapping)
    }

    /// Imports every row of an already parsed source.
    ///
    /// # Errors
    ///
    /// Returns store errors, context derivation errors, and in rollback mode
    /// [`Error::TransactionAborted`].
    pub fn import_from_source(
        &self,
        source: &mut dyn ImportSource,
        mapping: &RowMapping,
    ) -> Result<ImportResult> {
        let outcome = if self.options.rollback {
            run_atomically(self.store, || self.process_rows(source, mapping))
        } else {
            self.process_rows(source, mapping)
        };

        match &outcome {
            Ok(result) => self.record_run(result),
            Err(e) if self.options.rollback => {
                metrics::counter!("import_rollbacks_total", "model" => self.model.clone())
                    .increment(1);
                tracing::warn!(model = %self.model, error = %e, "Import rolled back");
            },
            Err(e) => tracing::warn!(model = %self.model, error = %e, "Import stopped"),
        }
        outcome
    }

    fn process_rows(
        &self,
        source: &mut dyn ImportSource,
        mapping: &RowMapping,
    ) -> Result<ImportResult> {
        let attributes = mapping
            .attributes
            .without(&self.options.filtered_attributes);
        let mut result = ImportResult::new();
        let mut progress = ImportProgress {
            total_estimate: source.size_hint(),
            ..ImportProgress::default()
        };

        while let Some(row) = source.next()? {
            progress.processed += 1;

            let mut fields = self.build_fields(row.fields, &attributes);
            mapping.context.apply(&mut fields)?;
            let record = self.store.build(&self.model, fields)?;

            match self.save(&record, progress.processed)? {
                SaveOutcome::Saved(id) => {
                    tracing::debug!(row = progress.processed, %id, "Row accepted");
                    progress.accepted += 1;
                    result.rows_accepted.push(AcceptedRow { row: row.data, id });
                },
                SaveOutcome::Invalid(errors) => {
                    tracing::debug!(row = progress.processed, ?errors, "Row rejected");
                    progress.rejected += 1;
                    result.rows_rejected.push(RejectedRow {
                        row: row.data,
                        errors,
                    });
                },
            }

            if let Some(callback) = &self.progress {
                callback(&progress);
            }
        }

        Ok(result)
    }

    fn save(&self, record: &Record, row: usize) -> Result<SaveOutcome> {
        if !self.options.rollback {
            return self.store.save(record);
        }
        self.store
            .save_strict(record)
            .map(SaveOutcome::Saved)
            .map_err(|e| match e {
                Error::RecordInvalid { errors, .. } => Error::TransactionAborted { row, errors },
                other => other,
            })
    }

    /// Drops filtered keys, renames, and strips one row's fields.
    fn build_fields(&self, fields: FieldSet, attributes: &AttributeMap) -> FieldSet {
        fields
            .into_iter()
            .filter(|(key, _)| !self.options.filtered_attributes.contains(key))
            .map(|(key, value)| {
                if self.options.strip {
                    (attributes.resolve(key.trim()).to_string(), strip_value(value))
                } else {
                    (attributes.resolve(&key).to_string(), value)
                }
            })
            .collect()
    }

    fn record_run(&self, result: &ImportResult) {
        let accepted = result.rows_accepted.len();
        let rejected = result.rows_rejected.len();
        metrics::counter!("import_rows_accepted_total", "model" => self.model.clone())
            .increment(accepted as u64);
        metrics::counter!("import_rows_rejected_total", "model" => self.model.clone())
            .increment(rejected as u64);
        tracing::info!(model = %self.model, accepted, rejected, "Import complete");
    }
}

fn strip_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}
