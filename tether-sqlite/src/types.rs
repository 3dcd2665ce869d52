//! Conversion between loader values and SQLite values.

use rusqlite::types::{Value as SqliteValue, ValueRef};
use tether_query::{Row, Value};

/// Convert a loader value to a SQLite value.
pub fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::String(s) => SqliteValue::Text(s.clone()),
    }
}

/// Convert a list of loader values to SQLite parameters.
pub fn to_params(values: &[Value]) -> Vec<SqliteValue> {
    values.iter().map(to_sqlite).collect()
}

/// Convert a SQLite value to a loader value.
///
/// Blobs are read as (lossy) UTF-8 text.
pub fn from_sqlite(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Read every column of a result row, keyed by its label.
pub fn read_row(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut out = Row::new();
    for (index, column) in columns.iter().enumerate() {
        out.push(column.clone(), from_sqlite(row.get_ref(index)?));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_sqlite() {
        assert_eq!(to_sqlite(&Value::Null), SqliteValue::Null);
        assert_eq!(to_sqlite(&Value::Bool(true)), SqliteValue::Integer(1));
        assert_eq!(to_sqlite(&Value::Int(42)), SqliteValue::Integer(42));
        assert_eq!(to_sqlite(&Value::Float(1.5)), SqliteValue::Real(1.5));
        assert_eq!(
            to_sqlite(&Value::from("Tom")),
            SqliteValue::Text("Tom".into())
        );
    }

    #[test]
    fn test_from_sqlite() {
        assert_eq!(from_sqlite(ValueRef::Null), Value::Null);
        assert_eq!(from_sqlite(ValueRef::Integer(7)), Value::Int(7));
        assert_eq!(from_sqlite(ValueRef::Real(0.25)), Value::Float(0.25));
        assert_eq!(from_sqlite(ValueRef::Text(b"Google")), Value::from("Google"));
        assert_eq!(from_sqlite(ValueRef::Blob(b"raw")), Value::from("raw"));
    }

    #[test]
    fn test_read_row_keeps_labels_in_order() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let mut stmt = conn
            .prepare("SELECT 1 AS t0__id, 'Tom' AS t0__name, NULL AS t1__id")
            .unwrap();
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let row = stmt
            .query_row([], |row| read_row(row, &columns))
            .unwrap();

        let labels: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(labels, vec!["t0__id", "t0__name", "t1__id"]);
        assert_eq!(row.get("t0__name"), Some(&Value::from("Tom")));
        assert_eq!(row.get("t1__id"), Some(&Value::Null));
    }
}
