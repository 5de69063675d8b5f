//! `SQLite`-backed record store.

use super::connection::{acquire_lock, configure_connection};
use super::metrics::{record_operation_metrics, status_of};
use super::relation::SqliteRelation;
use super::schema::ModelSchema;
use super::sql::{from_sql_value, quote_ident, to_sql_value};
use crate::models::{FieldSet, Record, RecordId, SaveOutcome};
use crate::storage::traits::{RecordStore, UnitOfWork};
use crate::{Error, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params, params_from_iter};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::instrument;

/// Record store over existing `SQLite` tables.
///
/// Each model is registered against a table; the table's columns become the
/// model's fields in declared order. Validation is derived from the table
/// definition:
///
/// - a `NOT NULL` column without a default must have a non-blank value
/// - a column with a single-column unique index must not repeat a stored value
///
/// # Concurrency Model
///
/// One `Mutex<Connection>` serves every call. A [`UnitOfWork`] scope opened on
/// the store covers all writes made through it until commit or rollback, so
/// scopes should not be shared across threads.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    models: Mutex<HashMap<String, Arc<ModelSchema>>>,
}

impl SqliteRecordStore {
    /// Opens a store on a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or configured.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        let conn = Connection::open(&db_path).map_err(|e| Error::operation("open_sqlite", e))?;
        configure_connection(&conn, false)?;
        Ok(Self::from_connection(conn, Some(db_path)))
    }

    /// Opens a store on a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::operation("open_sqlite_in_memory", e))?;
        configure_connection(&conn, true)?;
        Ok(Self::from_connection(conn, None))
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> Self {
        Self {
            conn: Mutex::new(conn),
            db_path,
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Runs one or more raw SQL statements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        acquire_lock(&self.conn)
            .execute_batch(sql)
            .map_err(|e| Error::operation("execute_batch", e))
    }

    /// Registers `model` as backed by `table`, reflecting its columns.
    ///
    /// Registering a model again refreshes its schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the table does not exist.
    #[instrument(skip(self), fields(backend = "sqlite"))]
    pub fn register_model(&self, model: &str, table: &str) -> Result<()> {
        let schema = {
            let conn = acquire_lock(&self.conn);
            ModelSchema::reflect(&conn, model, table)?
        };
        tracing::debug!(columns = schema.columns.len(), unique = ?schema.unique, "Registered model");
        acquire_lock(&self.models).insert(model.to_string(), Arc::new(schema));
        Ok(())
    }

    /// Returns the reflected schema of a registered model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the model is not registered.
    pub fn schema(&self, model: &str) -> Result<Arc<ModelSchema>> {
        acquire_lock(&self.models)
            .get(model)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("unknown model: {model}")))
    }

    /// Returns every record of `model` as a batch source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the model is not registered.
    pub fn relation(&self, model: &str) -> Result<SqliteRelation<'_>> {
        Ok(SqliteRelation::new(self, self.schema(model)?))
    }

    /// Counts the stored rows of a model.
    pub(crate) fn count_rows(&self, schema: &ModelSchema) -> Result<usize> {
        let conn = acquire_lock(&self.conn);
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(&schema.table)),
                [],
                |row| row.get(0),
            )
            .map_err(|e| Error::operation("count_rows", e))?;
        usize::try_from(count).map_err(|e| Error::operation("count_rows", e))
    }

    /// Reads up to `limit` records whose page key sorts after `after`, in
    /// page key order. Returns the records and the last key read.
    ///
    /// The page key is `rowid`, or the primary key of a `WITHOUT ROWID`
    /// table. `None` starts from the first row.
    pub(crate) fn fetch_page(
        &self,
        schema: &ModelSchema,
        after: Option<&SqlValue>,
        limit: usize,
    ) -> Result<(Vec<Record>, Option<SqlValue>)> {
        let start = Instant::now();
        let result: Result<(Vec<Record>, Option<SqlValue>)> = (|| {
            let columns = schema
                .columns
                .iter()
                .map(|c| quote_ident(&c.name))
                .collect::<Vec<_>>()
                .join(", ");
            let key = schema.page_key();
            let table = quote_ident(&schema.table);
            let limit = SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX));
            let (sql, bound) = match after {
                Some(after) => (
                    format!(
                        "SELECT {key}, {columns} FROM {table} WHERE {key} > ?1 ORDER BY {key} LIMIT ?2"
                    ),
                    vec![after.clone(), limit],
                ),
                None => (
                    format!("SELECT {key}, {columns} FROM {table} ORDER BY {key} LIMIT ?1"),
                    vec![limit],
                ),
            };

            let conn = acquire_lock(&self.conn);
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| Error::operation("prepare_fetch_page", e))?;
            let mut rows = stmt
                .query(params_from_iter(bound.iter()))
                .map_err(|e| Error::operation("fetch_page", e))?;

            let mut records = Vec::new();
            let mut last = None;
            while let Some(row) = rows.next().map_err(|e| Error::operation("fetch_page", e))? {
                let cursor: SqlValue =
                    row.get(0).map_err(|e| Error::operation("fetch_page", e))?;
                let mut fields = FieldSet::new();
                for (i, column) in schema.columns.iter().enumerate() {
                    let value: SqlValue = row
                        .get(i + 1)
                        .map_err(|e| Error::operation("fetch_page", e))?;
                    fields.insert(column.name.clone(), from_sql_value(value));
                }
                let id = identity_of(schema, &fields).or_else(|| match &cursor {
                    SqlValue::Integer(rowid) => Some(RecordId::from(*rowid)),
                    _ => None,
                });
                let record = Record::new(schema.model.clone(), fields);
                records.push(match id {
                    Some(id) => record.with_id(id),
                    None => record,
                });
                last = Some(cursor);
            }
            Ok((records, last))
        })();

        record_operation_metrics("fetch_page", start, status_of(&result));
        result
    }

    fn insert(conn: &Connection, schema: &ModelSchema, fields: &FieldSet) -> Result<RecordId> {
        let table = quote_ident(&schema.table);
        if fields.is_empty() {
            conn.execute(&format!("INSERT INTO {table} DEFAULT VALUES"), [])
                .map_err(|e| Error::operation("insert_record", e))?;
        } else {
            let columns = fields.keys().map(|k| quote_ident(k)).collect::<Vec<_>>();
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>();
            let sql = format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            );
            let values = fields.values().map(to_sql_value).collect::<Vec<_>>();
            conn.execute(&sql, params_from_iter(values.iter()))
                .map_err(|e| Error::operation("insert_record", e))?;
        }

        if let Some(id) = identity_of(schema, fields) {
            return Ok(id);
        }

        // Only rowid tables get here: a WITHOUT ROWID key is validated as required.
        let rowid = conn.last_insert_rowid();
        match schema.identity.as_deref() {
            Some(column) if !schema.identity_is_rowid() => {
                let value: SqlValue = conn
                    .query_row(
                        &format!("SELECT {} FROM {table} WHERE rowid = ?1", quote_ident(column)),
                        params![rowid],
                        |row| row.get(0),
                    )
                    .map_err(|e| Error::operation("read_identity", e))?;
                let mut stored = FieldSet::new();
                stored.insert(column.to_string(), from_sql_value(value));
                Ok(identity_of(schema, &stored).unwrap_or_else(|| RecordId::from(rowid)))
            },
            _ => Ok(RecordId::from(rowid)),
        }
    }
}

/// Reads a record's identity from a non-`rowid` primary key, if it has one.
fn identity_of(schema: &ModelSchema, fields: &FieldSet) -> Option<RecordId> {
    let key = schema
        .identity
        .as_deref()
        .filter(|_| !schema.identity_is_rowid())
        .and_then(|column| fields.get(column))?;

    match key {
        serde_json::Value::String(s) => Some(RecordId::new(s.clone())),
        serde_json::Value::Null => None,
        value => Some(RecordId::new(value.to_string())),
    }
}

impl RecordStore for SqliteRecordStore {
    fn field_names(&self, model: &str) -> Result<Vec<String>> {
        Ok(self.schema(model)?.field_names())
    }

    fn build(&self, model: &str, fields: FieldSet) -> Result<Record> {
        let schema = self.schema(model)?;
        schema.check_fields(&fields)?;
        Ok(Record::new(model, fields))
    }

    #[instrument(skip(self, record), fields(operation = "save", backend = "sqlite", model = record.model()))]
    fn save(&self, record: &Record) -> Result<SaveOutcome> {
        let schema = self.schema(record.model())?;
        schema.check_fields(record.fields())?;

        let start = Instant::now();
        let result: Result<SaveOutcome> = (|| {
            let conn = acquire_lock(&self.conn);

            let errors = schema.validate(&conn, record.fields())?;
            if !errors.is_empty() {
                return Ok(SaveOutcome::Invalid(errors));
            }

            Self::insert(&conn, &schema, record.fields()).map(SaveOutcome::Saved)
        })();

        record_operation_metrics("save", start, status_of(&result));
        result
    }
}

impl UnitOfWork for SqliteRecordStore {
    #[instrument(skip(self), fields(backend = "sqlite"))]
    fn begin(&self) -> Result<()> {
        acquire_lock(&self.conn)
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| Error::operation("begin_transaction", e))
    }

    #[instrument(skip(self), fields(backend = "sqlite"))]
    fn commit(&self) -> Result<()> {
        acquire_lock(&self.conn)
            .execute_batch("COMMIT")
            .map_err(|e| Error::operation("commit_transaction", e))
    }

    #[instrument(skip(self), fields(backend = "sqlite"))]
    fn rollback(&self) -> Result<()> {
        acquire_lock(&self.conn)
            .execute_batch("ROLLBACK")
            .map_err(|e| Error::operation("rollback_transaction", e))
    }
}
