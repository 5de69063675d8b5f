//! Core traits for import/export operations.
//!
//! Import side: format adapters implement [`ImportSource`] and yield one
//! [`ImportedRow`] per input row. Export side: record collections implement
//! [`BatchSource`], and format adapters implement [`ExportSink`] to render one
//! batch into a document.

use crate::Result;
use crate::models::{FieldSet, Record};
use serde::Serialize;

/// A row exactly as it appeared in the input.
///
/// Reported back in import results so callers can see what was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RowData {
    /// Positional CSV values. Header columns missing from a short row are
    /// `None`; values beyond the header are kept.
    Csv(Vec<Option<String>>),
    /// The original JSON object.
    Json(FieldSet),
}

/// One parsed input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedRow {
    /// The row as submitted.
    pub data: RowData,
    /// Field name to raw value, in input order.
    pub fields: FieldSet,
}

/// Source of parsed input rows.
///
/// Sources parse their whole document up front, so malformed input fails
/// before the first row reaches the store.
pub trait ImportSource {
    /// Returns the next row, or `Ok(None)` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be produced.
    fn next(&mut self) -> Result<Option<ImportedRow>>;

    /// Returns the number of rows left, if known.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// Renders one batch of rows into a standalone document.
///
/// # Lifecycle
///
/// 1. Create the sink with the batch's header
/// 2. Call `write()` for each row
/// 3. Call `finish()` to obtain the document text
pub trait ExportSink {
    /// Writes a single row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn write(&mut self, row: &FieldSet) -> Result<()>;

    /// Completes the document and returns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be finalized.
    fn finish(self: Box<Self>) -> Result<String>;
}

/// A record collection the exporter can walk in bounded batches.
///
/// Batches are non-overlapping, cover every record exactly once, and arrive
/// in the collection's natural order. Every batch except the last holds
/// exactly `size` records.
pub trait BatchSource {
    /// Model name of the records.
    fn model_name(&self) -> &str;

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn count(&self) -> Result<usize>;

    /// Calls `handle` once per batch of at most `size` records.
    ///
    /// Stops at the first error `handle` returns.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero, a batch cannot be read, or
    /// `handle` fails.
    fn for_each_batch(
        &self,
        size: usize,
        handle: &mut dyn FnMut(&[Record]) -> Result<()>,
    ) -> Result<()>;
}

/// A single record exports as one batch of one, whatever the batch size.
impl BatchSource for Record {
    fn model_name(&self) -> &str {
        self.model()
    }

    fn count(&self) -> Result<usize> {
        Ok(1)
    }

    fn for_each_batch(
        &self,
        _size: usize,
        handle: &mut dyn FnMut(&[Record]) -> Result<()>,
    ) -> Result<()> {
        handle(std::slice::from_ref(self))
    }
}

/// An in-memory collection of records of one model.
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    model: String,
    records: Vec<Record>,
}

impl Records {
    /// Creates a collection.
    #[must_use]
    pub fn new(model: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            model: model.into(),
            records,
        }
    }

    /// Returns the records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }
}

impl BatchSource for Records {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn for_each_batch(
        &self,
        size: usize,
        handle: &mut dyn FnMut(&[Record]) -> Result<()>,
    ) -> Result<()> {
        if size == 0 {
            return Err(crate::Error::InvalidInput(
                "batch size must be positive".to_string(),
            ));
        }
        self.records.chunks(size).try_for_each(|batch| handle(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: i64) -> Record {
        let fields = json!({"id": id}).as_object().unwrap().clone();
        Record::new("User", fields)
    }

    fn batch_sizes(source: &dyn BatchSource, size: usize) -> Vec<usize> {
        let mut sizes = Vec::new();
        source
            .for_each_batch(size, &mut |batch| {
                sizes.push(batch.len());
                Ok(())
            })
            .unwrap();
        sizes
    }

    #[test]
    fn test_records_chunk_in_order() {
        let records = Records::new("User", (1..=5).map(record).collect());

        assert_eq!(records.count().unwrap(), 5);
        assert_eq!(batch_sizes(&records, 2), vec![2, 2, 1]);
        assert_eq!(batch_sizes(&records, 5), vec![5]);
        assert_eq!(batch_sizes(&records, 10), vec![5]);
    }

    #[test]
    fn test_empty_records_yield_no_batches() {
        let records = Records::new("User", Vec::new());
        assert!(batch_sizes(&records, 3).is_empty());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let records = Records::new("User", vec![record(1)]);
        assert!(records.for_each_batch(0, &mut |_| Ok(())).is_err());
    }

    #[test]
    fn test_single_record_is_one_batch() {
        let single = record(9);
        assert_eq!(single.model_name(), "User");
        assert_eq!(batch_sizes(&single, 1), vec![1]);
        assert_eq!(batch_sizes(&single, 100), vec![1]);
    }

    #[test]
    fn test_handler_error_stops_iteration() {
        let records = Records::new("User", (1..=4).map(record).collect());
        let mut seen = 0;

        let result = records.for_each_batch(1, &mut |_| {
            seen += 1;
            if seen == 2 {
                return Err(crate::Error::InvalidInput("stop".to_string()));
            }
            Ok(())
        });

        assert!(result.is_err());
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_row_data_serializes_untagged() {
        let csv = RowData::Csv(vec![Some("a".to_string()), None]);
        assert_eq!(serde_json::to_value(&csv).unwrap(), json!(["a", null]));

        let json_row = RowData::Json(json!({"k": 1}).as_object().unwrap().clone());
        assert_eq!(serde_json::to_value(&json_row).unwrap(), json!({"k": 1}));
    }
}
