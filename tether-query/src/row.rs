//! Rows returned by a [`QueryEngine`](crate::traits::QueryEngine).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// A fetched row: column label to value, in select order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: IndexMap<String, Value>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column.
    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.columns.insert(column.into(), value);
    }

    /// Builder form of [`Row::push`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value.into());
        self
    }

    /// Get a raw value by column label.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Get a value or fail if the column is missing.
    pub fn try_get(&self, column: &str) -> QueryResult<&Value> {
        self.columns
            .get(column)
            .ok_or_else(|| QueryError::deserialization(format!("column '{}' not found", column)))
    }

    /// Get a non-null integer column.
    pub fn get_i64(&self, column: &str) -> QueryResult<i64> {
        let value = self.try_get(column)?;
        value.as_i64().ok_or_else(|| {
            QueryError::deserialization(format!(
                "expected int in column '{}', found {}",
                column,
                value.type_name()
            ))
        })
    }

    /// Get a nullable integer column.
    pub fn get_opt_i64(&self, column: &str) -> QueryResult<Option<i64>> {
        match self.try_get(column)? {
            Value::Null => Ok(None),
            _ => self.get_i64(column).map(Some),
        }
    }

    /// Get a non-null text column.
    pub fn get_string(&self, column: &str) -> QueryResult<String> {
        let value = self.try_get(column)?;
        value.as_str().map(str::to_string).ok_or_else(|| {
            QueryError::deserialization(format!(
                "expected string in column '{}', found {}",
                column,
                value.type_name()
            ))
        })
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over `(label, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}
