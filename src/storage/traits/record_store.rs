//! Record store trait.

use crate::models::{FieldSet, Record, RecordId, SaveOutcome};
use crate::{Error, Result};

/// Typed record persistence consumed by the import and export services.
///
/// A store owns the schema of each model it serves. Building a record checks
/// that the supplied fields exist; saving runs field-level validation and
/// persists the record when it passes.
pub trait RecordStore: Send + Sync {
    /// Returns the model's field names in their natural (declared) order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown model.
    fn field_names(&self, model: &str) -> Result<Vec<String>>;

    /// Builds an unsaved record from raw fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown model or a field the
    /// model does not declare.
    fn build(&self, model: &str, fields: FieldSet) -> Result<Record>;

    /// Validates and persists a record.
    ///
    /// Validation failures are reported as [`SaveOutcome::Invalid`], not as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store itself fails.
    fn save(&self, record: &Record) -> Result<SaveOutcome>;

    /// Validates and persists a record, treating invalid input as an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RecordInvalid`] when validation fails.
    fn save_strict(&self, record: &Record) -> Result<RecordId> {
        match self.save(record)? {
            SaveOutcome::Saved(id) => Ok(id),
            SaveOutcome::Invalid(errors) => Err(Error::RecordInvalid {
                model: record.model().to_string(),
                errors,
            }),
        }
    }
}
