//! Property-based tests for the export and import pipelines.
//!
//! Uses proptest to verify invariants across random inputs:
//! - An export yields one document per batch, at least one, and the
//!   documents parse back into the filtered records in order
//! - Redaction never leaks a filtered value unless sensitive export is on
//! - Every imported row is either accepted or rejected, in input order

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use bulkport::storage::SqliteRecordStore;
use bulkport::{
    BulkportConfig, ExportOptions, ExportService, FILTERED_PLACEHOLDER, FieldFilter, FieldSet,
    Format, Headers, ImportOptions, ImportService, Record, Records, RowMapping,
};
use proptest::prelude::*;
use serde_json::{Value, json};

fn users(n: usize) -> Records {
    let records = (0..n)
        .map(|i| {
            let fields = json!({"id": i, "email": format!("u{i}@example.com"), "password": format!("pw{i}")});
            Record::new("User", fields.as_object().cloned().unwrap_or_default())
        })
        .collect();
    Records::new("User", records)
}

fn user_store() -> SqliteRecordStore {
    let store = SqliteRecordStore::in_memory().unwrap();
    store
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE, password TEXT NOT NULL);",
        )
        .unwrap();
    store.register_model("User", "users").unwrap();
    store
}

/// Parses one export document back into JSON objects, reading CSV cells
/// with the types the `users` fixture uses.
fn parse_document(format: Format, document: &str) -> Vec<Value> {
    match format {
        Format::Json => match serde_json::from_str(document).unwrap() {
            Value::Array(rows) => rows,
            other => panic!("expected a JSON array, got {other}"),
        },
        Format::Csv => {
            let mut reader = csv::Reader::from_reader(document.as_bytes());
            let headers = reader.headers().unwrap().clone();
            assert_eq!(headers.iter().collect::<Vec<_>>(), ["id", "email", "password"]);
            reader
                .records()
                .map(|row| {
                    let row = row.unwrap();
                    json!({
                        "id": row[0].parse::<u64>().unwrap(),
                        "email": &row[1],
                        "password": &row[2],
                    })
                })
                .collect()
        },
    }
}

proptest! {
    /// Property: document count is `ceil(n / batch)`, and 1 for an empty
    /// collection. Each document parses on its own, and the rows joined back
    /// together are the filtered records in their original order.
    #[test]
    fn prop_export_batches_rebuild_filtered_records(
        n in 0usize..40,
        batch in 1usize..10,
        json_format in any::<bool>(),
    ) {
        let store = user_store();
        let config = BulkportConfig::default().with_batch_size(batch);
        let exporter = ExportService::new(&store, &config, ExportOptions::default());
        let format = if json_format { Format::Json } else { Format::Csv };

        let result = exporter.export(&users(n), format).unwrap();

        prop_assert_eq!(result.len(), n.div_ceil(batch).max(1));
        prop_assert_eq!(result.records, n);

        let mut rows = Vec::new();
        for document in &result.exports {
            let parsed = parse_document(format, document);
            prop_assert!(parsed.len() <= batch);
            rows.extend(parsed);
        }
        let expected: Vec<Value> = (0..n)
            .map(|i| json!({"id": i, "email": format!("u{i}@example.com"), "password": FILTERED_PLACEHOLDER}))
            .collect();
        prop_assert_eq!(rows, expected);
    }

    /// Property: filtered values never appear in an export unless requested.
    #[test]
    fn prop_export_never_leaks_passwords(n in 1usize..15, sensitive in any::<bool>()) {
        let store = user_store();
        let config = BulkportConfig::default().with_batch_size(4);
        let options = ExportOptions::default().with_export_sensitive(sensitive);
        let exporter = ExportService::new(&store, &config, options);

        let result = exporter.to_csv(&users(n)).unwrap();
        let text = result.exports.concat();

        for i in 0..n {
            let password = format!("pw{i}");
            let email = format!("u{i}@example.com");
            prop_assert_eq!(text.contains(&password), sensitive);
            prop_assert!(text.contains(&email));
        }
        prop_assert_eq!(text.contains(FILTERED_PLACEHOLDER), !sensitive);
    }

    /// Property: a field filter replaces exactly the matching top-level keys.
    #[test]
    fn prop_field_filter_replaces_matching_keys(
        keys in prop::collection::btree_set("[a-z_]{1,12}", 0..8),
        fragment in "[a-z]{2,4}",
    ) {
        let filter = FieldFilter::new([fragment.clone()]);
        let fields: FieldSet = keys.iter().map(|k| (k.clone(), json!(k))).collect();

        let filtered = filter.apply(&fields);

        prop_assert_eq!(filtered.len(), fields.len());
        for key in &keys {
            let expected = if key.contains(&fragment) {
                Value::String(FILTERED_PLACEHOLDER.to_string())
            } else {
                json!(key)
            };
            prop_assert_eq!(&filtered[key.as_str()], &expected);
        }
    }

    /// Property: accepted + rejected equals the number of input rows.
    #[test]
    fn prop_import_accounts_for_every_row(rows in prop::collection::vec((0u8..6, any::<bool>()), 0..20)) {
        let store = user_store();
        let importer = ImportService::new(&store, "User", ImportOptions::default());

        let mut csv = String::from("email,password\n");
        for (email, has_password) in &rows {
            let password = if *has_password { "secret" } else { "" };
            let line = format!("u{email}@example.com,{password}\n");
            csv.push_str(&line);
        }

        let result = importer.csv(&csv, &Headers::FirstRow, &RowMapping::default()).unwrap();

        prop_assert_eq!(result.total(), rows.len());
        let mut seen = std::collections::HashSet::new();
        let expected_accepted = rows
            .iter()
            .filter(|(email, has_password)| *has_password && seen.insert(*email))
            .count();
        prop_assert_eq!(result.rows_accepted.len(), expected_accepted);
    }
}
