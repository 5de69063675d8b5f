//! Record types and identifiers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to raw value mapping for one row or record.
///
/// Insertion order is preserved, so a field set parsed from a CSV header or a
/// JSON object keeps the order of its source.
pub type FieldSet = serde_json::Map<String, Value>;

/// Identity assigned to a record by the store on a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Creates a new record ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A typed record owned by the record store.
///
/// The importer builds one per row through [`crate::RecordStore::build`];
/// the exporter only ever reads [`Record::fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    id: Option<RecordId>,
    fields: FieldSet,
}

impl Record {
    /// Creates an unsaved record of the given model.
    #[must_use]
    pub fn new(model: impl Into<String>, fields: FieldSet) -> Self {
        Self {
            model: model.into(),
            id: None,
            fields,
        }
    }

    /// Sets the assigned identity.
    #[must_use]
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the model (type) name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the identity, if the record has been saved.
    #[must_use]
    pub const fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// Returns all fields in their natural order.
    #[must_use]
    pub const fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Returns a single field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Field-level validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Returns the messages for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns whether no messages were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields with messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates fields and their messages in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Renders errors as `field message, field message`.
#[must_use]
pub fn describe_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field} {m}")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a non-strict save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The record was persisted and assigned an identity.
    Saved(RecordId),
    /// Store-side validation rejected the record.
    Invalid(FieldErrors),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_conversions() {
        assert_eq!(RecordId::from(42_i64).as_str(), "42");
        assert_eq!(RecordId::from("abc").to_string(), "abc");
        assert_eq!(serde_json::to_value(RecordId::new("7")).unwrap(), json!("7"));
    }

    #[test]
    fn test_record_preserves_field_order() {
        let mut fields = FieldSet::new();
        fields.insert("id".to_string(), json!(1));
        fields.insert("email".to_string(), json!("a@b.com"));
        fields.insert("password".to_string(), json!("p"));

        let record = Record::new("User", fields).with_id(RecordId::from(1_i64));
        let names: Vec<&str> = record.fields().keys().map(String::as_str).collect();

        assert_eq!(names, vec!["id", "email", "password"]);
        assert_eq!(record.model(), "User");
        assert_eq!(record.get("email"), Some(&json!("a@b.com")));
        assert_eq!(record.id().map(RecordId::as_str), Some("1"));
    }

    #[test]
    fn test_field_errors_accumulate() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());

        errors.add("password", "can't be blank");
        errors.add("password", "is too short");
        errors.add("email", "has already been taken");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("password").map(<[String]>::len), Some(2));
        assert_eq!(
            describe_errors(&errors),
            "email has already been taken, password can't be blank, password is too short"
        );
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"email": ["has already been taken"], "password": ["can't be blank", "is too short"]})
        );
    }
}
