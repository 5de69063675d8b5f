//! CSV format adapter for import/export.
//!
//! Import keeps every cell as a string; type coercion is the record store's
//! job. Export writes a header line followed by one line per row.

use crate::io::traits::{ExportSink, ImportSource, ImportedRow, RowData};
use crate::models::FieldSet;
use crate::{Error, Result};
use serde_json::Value;
use std::borrow::Cow;

/// Where CSV field names come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Headers {
    /// The first line names the fields.
    #[default]
    FirstRow,
    /// Every line is data; these names are used positionally.
    Explicit(Vec<String>),
}

impl Headers {
    /// Creates explicit headers.
    #[must_use]
    pub fn explicit<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Explicit(names.into_iter().map(Into::into).collect())
    }
}

/// CSV import source.
///
/// The whole document is parsed when the source is created.
#[derive(Debug)]
pub struct CsvImportSource {
    rows: std::vec::IntoIter<ImportedRow>,
}

impl CsvImportSource {
    /// Parses a CSV document.
    ///
    /// Rows may be shorter or longer than the header. Missing trailing fields
    /// become `null`; extra values are kept only in [`ImportedRow::data`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the text is not valid CSV.
    pub fn parse(text: &str, headers: &Headers) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let names: Vec<String> = match headers {
            Headers::Explicit(names) => names.clone(),
            Headers::FirstRow => match records.next() {
                Some(first) => first
                    .map_err(|e| Error::InvalidInput(format!("malformed CSV header: {e}")))?
                    .iter()
                    .map(String::from)
                    .collect(),
                None => Vec::new(),
            },
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(|e| Error::InvalidInput(format!("malformed CSV: {e}")))?;
            rows.push(to_row(&names, &record));
        }

        Ok(Self {
            rows: rows.into_iter(),
        })
    }
}

fn to_row(names: &[String], record: &csv::StringRecord) -> ImportedRow {
    let fields: FieldSet = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let value = record
                .get(i)
                .map_or(Value::Null, |v| Value::String(v.to_string()));
            (name.clone(), value)
        })
        .collect();

    let mut data: Vec<Option<String>> = record.iter().map(|v| Some(v.to_string())).collect();
    if data.len() < names.len() {
        data.resize(names.len(), None);
    }

    ImportedRow {
        data: RowData::Csv(data),
        fields,
    }
}

impl ImportSource for CsvImportSource {
    fn next(&mut self) -> Result<Option<ImportedRow>> {
        Ok(self.rows.next())
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }
}

/// Renders a field value as CSV cell text.
///
/// `null` is empty; strings are written as-is; nested values as JSON text.
#[must_use]
pub fn cell_text(value: Option<&Value>) -> Cow<'_, str> {
    match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

/// CSV export sink.
///
/// Writes the header on creation, then one line per row with cells taken
/// from the row by header name.
pub struct CsvExportSink {
    writer: csv::Writer<Vec<u8>>,
    header: Vec<String>,
}

impl CsvExportSink {
    /// Creates a sink and writes the header line.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(header: &[String]) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .write_record(header)
            .map_err(|e| Error::operation("write_csv_header", e))?;

        Ok(Self {
            writer,
            header: header.to_vec(),
        })
    }
}

impl ExportSink for CsvExportSink {
    fn write(&mut self, row: &FieldSet) -> Result<()> {
        let cells = self.header.iter().map(|name| cell_text(row.get(name)));
        self.writer
            .write_record(cells.map(Cow::into_owned))
            .map_err(|e| Error::operation("write_csv", e))
    }

    fn finish(self: Box<Self>) -> Result<String> {
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| Error::operation("flush_csv", e))?;
        String::from_utf8(bytes).map_err(|e| Error::operation("flush_csv", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(text: &str, headers: &Headers) -> Vec<ImportedRow> {
        let mut source = CsvImportSource::parse(text, headers).unwrap();
        let mut rows = Vec::new();
        while let Some(row) = source.next().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_import_with_header_row() {
        let rows = rows(
            "email,password\nsomeone@example.com,s3cure!\nsomeone_else@example.com,t0ps3cr3t\n",
            &Headers::FirstRow,
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(
            Value::Object(rows[0].fields.clone()),
            json!({"email": "someone@example.com", "password": "s3cure!"})
        );
        assert_eq!(
            rows[1].data,
            RowData::Csv(vec![
                Some("someone_else@example.com".to_string()),
                Some("t0ps3cr3t".to_string()),
            ])
        );
    }

    #[test]
    fn test_import_with_explicit_headers() {
        let rows = rows(
            "sometwo@example.com,s3cure!\n",
            &Headers::explicit(["email", "password"]),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fields["email"], json!("sometwo@example.com"));
    }

    #[test]
    fn test_short_row_fills_nulls() {
        let rows = rows("email,password\ninvalid@example.com\n", &Headers::FirstRow);

        assert_eq!(rows[0].fields["password"], Value::Null);
        assert_eq!(
            rows[0].data,
            RowData::Csv(vec![Some("invalid@example.com".to_string()), None])
        );
    }

    #[test]
    fn test_long_row_keeps_extra_values_in_data_only() {
        let rows = rows("email\na@example.com,extra\n", &Headers::FirstRow);

        assert_eq!(rows[0].fields.len(), 1);
        assert_eq!(
            rows[0].data,
            RowData::Csv(vec![Some("a@example.com".to_string()), Some("extra".to_string())])
        );
    }

    #[test]
    fn test_empty_document() {
        assert!(rows("", &Headers::FirstRow).is_empty());
        assert!(rows("email,password\n", &Headers::FirstRow).is_empty());
    }

    #[test]
    fn test_export_writes_header_and_rows() {
        let header = vec!["id".to_string(), "email".to_string(), "note".to_string()];
        let mut sink = Box::new(CsvExportSink::new(&header).unwrap());

        sink.write(json!({"id": 1, "email": "a@b.com", "note": null}).as_object().unwrap())
            .unwrap();
        sink.write(json!({"id": 2, "email": "c, d", "note": {"k": true}}).as_object().unwrap())
            .unwrap();

        assert_eq!(
            sink.finish().unwrap(),
            "id,email,note\n1,a@b.com,\n2,\"c, d\",\"{\"\"k\"\":true}\"\n"
        );
    }

    #[test]
    fn test_export_header_only() {
        let header = vec!["id".to_string(), "email".to_string()];
        let sink = Box::new(CsvExportSink::new(&header).unwrap());
        assert_eq!(sink.finish().unwrap(), "id,email\n");
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(None), "");
        assert_eq!(cell_text(Some(&json!("x"))), "x");
        assert_eq!(cell_text(Some(&json!(false))), "false");
        assert_eq!(cell_text(Some(&json!(1.5))), "1.5");
    }
}
