//! Table reflection for registered models.

use super::sql::quote_ident;
use crate::models::{FieldErrors, FieldSet};
use crate::{Error, Result};
use rusqlite::{Connection, params};
use serde_json::Value;

/// Validation message for a missing required value.
pub const BLANK: &str = "can't be blank";

/// Validation message for a duplicate unique value.
pub const TAKEN: &str = "has already been taken";

/// One reflected column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared type as written in the table definition.
    pub declared_type: String,
    /// Whether the column is `NOT NULL`.
    pub not_null: bool,
    /// Whether the column has a `DEFAULT`.
    pub has_default: bool,
    /// Whether the column is part of the primary key.
    pub primary_key: bool,
}

/// Reflected shape of one model's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSchema {
    /// Model name used by callers.
    pub model: String,
    /// Backing table.
    pub table: String,
    /// Columns in declared order.
    pub columns: Vec<Column>,
    /// Columns covered by a single-column unique index.
    pub unique: Vec<String>,
    /// Single-column primary key, if any.
    pub identity: Option<String>,
    /// Whether the table was created `WITHOUT ROWID`.
    pub without_rowid: bool,
}

impl ModelSchema {
    /// Reads the table definition behind `model`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the table does not exist, or if it
    /// is a `WITHOUT ROWID` table without a single-column primary key.
    pub fn reflect(conn: &Connection, model: &str, table: &str) -> Result<Self> {
        let columns = read_columns(conn, table)?;
        if columns.is_empty() {
            return Err(Error::InvalidInput(format!(
                "table '{table}' for model {model} does not exist"
            )));
        }

        let mut keys = columns.iter().filter(|c| c.primary_key);
        let identity = match (keys.next(), keys.next()) {
            (Some(column), None) => Some(column.name.clone()),
            _ => None,
        };

        let without_rowid = read_without_rowid(conn, table)?;
        if without_rowid && identity.is_none() {
            return Err(Error::InvalidInput(format!(
                "table '{table}' for model {model} has no rowid and no single-column primary key"
            )));
        }

        let unique = read_unique_columns(conn, table)?;

        Ok(Self {
            model: model.to_string(),
            table: table.to_string(),
            columns,
            unique,
            identity,
            without_rowid,
        })
    }

    /// Returns the column names in declared order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns whether the model declares `name`.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Returns whether the identity column is an alias for `rowid`.
    #[must_use]
    pub fn identity_is_rowid(&self) -> bool {
        !self.without_rowid
            && self.identity.as_deref().is_some_and(|name| {
                self.columns
                    .iter()
                    .any(|c| c.name == name && c.declared_type.eq_ignore_ascii_case("INTEGER"))
            })
    }

    /// Returns the SQL expression rows are ordered and paged by: `rowid`, or
    /// the primary key of a `WITHOUT ROWID` table.
    #[must_use]
    pub fn page_key(&self) -> String {
        match self.identity.as_deref() {
            Some(column) if self.without_rowid => quote_ident(column),
            _ => "rowid".to_string(),
        }
    }

    /// Rejects fields the model does not declare.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first unknown field.
    pub fn check_fields(&self, fields: &FieldSet) -> Result<()> {
        match fields.keys().find(|name| !self.has_field(name)) {
            Some(unknown) => Err(Error::InvalidInput(format!(
                "unknown attribute '{unknown}' for {}",
                self.model
            ))),
            None => Ok(()),
        }
    }

    /// Runs field-level validation against the current table contents.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if a uniqueness lookup fails.
    pub fn validate(&self, conn: &Connection, fields: &FieldSet) -> Result<FieldErrors> {
        let mut errors = FieldErrors::new();

        for column in self.columns.iter().filter(|c| self.requires_value(c)) {
            if is_blank(fields.get(&column.name)) {
                errors.add(column.name.clone(), BLANK);
            }
        }

        for name in &self.unique {
            let Some(value) = fields.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            if self.value_taken(conn, name, value)? {
                errors.add(name.clone(), TAKEN);
            }
        }

        Ok(errors)
    }

    fn requires_value(&self, column: &Column) -> bool {
        if column.primary_key && self.without_rowid {
            return true;
        }
        let generated_key = column.primary_key && self.identity_is_rowid();
        column.not_null && !column.has_default && !generated_key
    }

    fn value_taken(&self, conn: &Connection, column: &str, value: &Value) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            quote_ident(&self.table),
            quote_ident(column)
        );
        conn.query_row(&sql, params![super::sql::to_sql_value(value)], |row| row.get(0))
            .map_err(|e| Error::operation("check_unique", e))
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

fn read_columns(conn: &Connection, table: &str) -> Result<Vec<Column>> {
    let mut stmt = conn
        .prepare(
            "SELECT name, type, \"notnull\", dflt_value IS NOT NULL, pk
             FROM pragma_table_info(?1) ORDER BY cid",
        )
        .map_err(|e| Error::operation("prepare_table_info", e))?;

    let columns = stmt
        .query_map(params![table], |row| {
            Ok(Column {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: row.get(2)?,
                has_default: row.get(3)?,
                primary_key: row.get::<_, i64>(4)? > 0,
            })
        })
        .map_err(|e| Error::operation("table_info", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::operation("table_info", e));
    columns
}

fn read_without_rowid(conn: &Connection, table: &str) -> Result<bool> {
    conn.query_row(
        "SELECT COALESCE(MAX(wr), 0) FROM pragma_table_list WHERE name = ?1",
        params![table],
        |row| row.get(0),
    )
    .map_err(|e| Error::operation("table_list", e))
}

fn read_unique_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM pragma_index_list(?1)
             WHERE \"unique\" = 1 AND partial = 0 AND origin != 'pk'
             ORDER BY seq",
        )
        .map_err(|e| Error::operation("prepare_index_list", e))?;
    let indexes: Vec<String> = stmt
        .query_map(params![table], |row| row.get(0))
        .map_err(|e| Error::operation("index_list", e))?
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::operation("index_list", e))?;

    let mut unique = Vec::new();
    for index in indexes {
        let columns: Vec<Option<String>> = conn
            .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
            .and_then(|mut stmt| {
                let names = stmt
                    .query_map(params![index], |row| row.get(0))?
                    .collect::<std::result::Result<_, _>>();
                names
            })
            .map_err(|e| Error::operation("index_info", e))?;

        if let [Some(column)] = columns.as_slice() {
            if !unique.contains(column) {
                unique.push(column.clone());
            }
        }
    }
    Ok(unique)
}
