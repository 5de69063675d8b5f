//! Sensitive-field redaction for exports.
//!
//! Redaction is applied to output values only. A field whose name contains
//! one of the configured fragments (case-insensitively) has its value replaced
//! with [`FILTERED_PLACEHOLDER`]; every other field passes through untouched.
//! Nested objects are walked with the same rule.

use crate::models::FieldSet;
use serde_json::Value;

/// Literal value written in place of a redacted field.
pub const FILTERED_PLACEHOLDER: &str = "[FILTERED]";

/// Field-name based redaction filter.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    /// Lowercased name fragments.
    fragments: Vec<String>,
}

impl FieldFilter {
    /// Creates a filter from name fragments.
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fragments: fragments
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// Creates a filter that redacts nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            fragments: Vec::new(),
        }
    }

    /// Creates the filter an export run uses.
    ///
    /// `export_sensitive` turns redaction off entirely.
    #[must_use]
    pub fn for_export<S: AsRef<str>>(export_sensitive: bool, filter_list: &[S]) -> Self {
        if export_sensitive {
            Self::disabled()
        } else {
            Self::new(filter_list)
        }
    }

    /// Returns whether a field name matches any fragment.
    #[must_use]
    pub fn is_filtered(&self, name: &str) -> bool {
        if self.fragments.is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        self.fragments.iter().any(|f| name.contains(f.as_str()))
    }

    /// Returns a copy of `fields` with sensitive values redacted.
    #[must_use]
    pub fn apply(&self, fields: &FieldSet) -> FieldSet {
        fields
            .iter()
            .map(|(name, value)| (name.clone(), self.filter_entry(name, value)))
            .collect()
    }

    fn filter_entry(&self, name: &str, value: &Value) -> Value {
        if self.is_filtered(name) {
            Value::String(FILTERED_PLACEHOLDER.to_string())
        } else {
            self.filter_nested(value)
        }
    }

    fn filter_nested(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(self.apply(map)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.filter_nested(v)).collect()),
            other => other.clone(),
        }
    }
}

/// Redacts `fields` unless `export_sensitive` is set.
///
/// Pure function of its inputs.
#[must_use]
pub fn filtered_value<S: AsRef<str>>(
    fields: &FieldSet,
    export_sensitive: bool,
    filter_list: &[S],
) -> FieldSet {
    FieldFilter::for_export(export_sensitive, filter_list).apply(fields)
}
