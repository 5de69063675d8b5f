//! JSON format adapter for import/export.
//!
//! Documents are a single JSON array of objects in both directions.

use crate::io::traits::{ExportSink, ImportSource, ImportedRow, RowData};
use crate::models::FieldSet;
use crate::{Error, Result};
use serde_json::Value;

/// JSON import source.
///
/// The whole document is parsed and shape-checked when the source is created.
#[derive(Debug)]
pub struct JsonImportSource {
    rows: std::vec::IntoIter<ImportedRow>,
}

impl JsonImportSource {
    /// Parses a JSON array of objects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not JSON, is not an
    /// array, or contains an element that is not an object.
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidInput(format!("malformed JSON: {e}")))?;

        let Value::Array(items) = document else {
            return Err(Error::InvalidInput(
                "JSON import expects an array of objects".to_string(),
            ));
        };

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(fields) => Ok(ImportedRow {
                    data: RowData::Json(fields.clone()),
                    fields,
                }),
                other => Err(Error::InvalidInput(format!(
                    "JSON element {} is not an object: {other}",
                    index + 1
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows: rows.into_iter(),
        })
    }
}

impl ImportSource for JsonImportSource {
    fn next(&mut self) -> Result<Option<ImportedRow>> {
        Ok(self.rows.next())
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}

/// JSON export sink.
///
/// Collects rows and renders them as one compact array.
#[derive(Debug, Default)]
pub struct JsonExportSink {
    rows: Vec<Value>,
}

impl JsonExportSink {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: Vec::new() }
    }
}

impl ExportSink for JsonExportSink {
    fn write(&mut self, row: &FieldSet) -> Result<()> {
        self.rows.push(Value::Object(row.clone()));
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<String> {
        serde_json::to_string(&self.rows).map_err(|e| Error::operation("serialize_json", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_array_of_objects() {
        let mut source = JsonImportSource::parse(
            r#"[{"email":"someone@example.com","password":"s3cure!"},{"email":"x@example.com"}]"#,
        )
        .unwrap();

        assert_eq!(source.size_hint(), Some(2));
        let first = source.next().unwrap().unwrap();
        assert_eq!(first.fields["password"], json!("s3cure!"));
        assert_eq!(RowData::Json(first.fields.clone()), first.data);

        let second = source.next().unwrap().unwrap();
        assert!(second.fields.get("password").is_none());
        assert!(source.next().unwrap().is_none());
    }

    #[test]
    fn test_import_preserves_key_order() {
        let mut source = JsonImportSource::parse(r#"[{"z":1,"a":2,"m":3}]"#).unwrap();
        let row = source.next().unwrap().unwrap();
        let keys: Vec<&str> = row.fields.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_import_rejects_non_array() {
        let err = JsonImportSource::parse(r#"{"email":"a"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_import_rejects_non_object_element() {
        let err = JsonImportSource::parse(r#"[{"email":"a"}, 3]"#).unwrap_err();
        assert!(err.to_string().contains("element 2"));
    }

    #[test]
    fn test_import_rejects_malformed_text() {
        assert!(JsonImportSource::parse("[{").is_err());
    }

    #[test]
    fn test_export_compact_array() {
        let mut sink = Box::new(JsonExportSink::new());
        sink.write(json!({"id": 1, "password": "[FILTERED]"}).as_object().unwrap())
            .unwrap();

        assert_eq!(sink.finish().unwrap(), r#"[{"id":1,"password":"[FILTERED]"}]"#);
    }
}
