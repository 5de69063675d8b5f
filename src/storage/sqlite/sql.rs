//! SQL helpers: identifier quoting and value conversion.
//!
//! Table and column names come from reflected schema or caller-supplied
//! model registrations, so every identifier is quoted before it is spliced
//! into a statement. Values always travel as bound parameters.

use rusqlite::types::Value as SqlValue;
use serde_json::{Number, Value};

/// Quotes an identifier for use in a statement.
///
/// # Examples
///
/// ```
/// use bulkport::storage::sqlite::quote_ident;
///
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Converts a field value into a bindable `SQLite` value.
///
/// Booleans become 0/1. Arrays and objects are stored as JSON text.
#[must_use]
pub fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n.as_i64().map_or_else(
            || n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
            SqlValue::Integer,
        ),
        Value::String(s) => SqlValue::Text(s.clone()),
        nested @ (Value::Array(_) | Value::Object(_)) => SqlValue::Text(nested.to_string()),
    }
}

/// Converts a stored `SQLite` value into a field value.
///
/// Blobs are rendered as lowercase hex.
#[must_use]
pub fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(null), SqlValue::Null ; "null")]
    #[test_case(json!(true), SqlValue::Integer(1) ; "bool")]
    #[test_case(json!(42), SqlValue::Integer(42) ; "integer")]
    #[test_case(json!(1.5), SqlValue::Real(1.5) ; "real")]
    #[test_case(json!("a"), SqlValue::Text("a".to_string()) ; "text")]
    #[test_case(json!({"k": [1]}), SqlValue::Text("{\"k\":[1]}".to_string()) ; "nested")]
    fn test_to_sql_value(input: Value, expected: SqlValue) {
        assert_eq!(to_sql_value(&input), expected);
    }

    #[test]
    fn test_from_sql_value() {
        assert_eq!(from_sql_value(SqlValue::Integer(7)), json!(7));
        assert_eq!(from_sql_value(SqlValue::Real(0.25)), json!(0.25));
        assert_eq!(from_sql_value(SqlValue::Text("x".to_string())), json!("x"));
        assert_eq!(from_sql_value(SqlValue::Blob(vec![0xde, 0xad])), json!("dead"));
        assert_eq!(from_sql_value(SqlValue::Real(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("select"), "\"select\"");
    }
}
