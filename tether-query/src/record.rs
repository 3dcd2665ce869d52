//! Untyped records produced by the loader before they become models.

use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};

use crate::error::QueryResult;
use crate::relations::PRIMARY_KEY;
use crate::row::Row;
use crate::value::Value;

/// Related rows fetched for one relation of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// A single reference, absent when the foreign key is null.
    One(Option<Box<Record>>),
    /// A collection, ordered by ascending identity.
    Many(Vec<Record>),
}

impl Loaded {
    /// Number of related records.
    pub fn len(&self) -> usize {
        match self {
            Self::One(r) => usize::from(r.is_some()),
            Self::Many(v) => v.len(),
        }
    }

    /// Check if nothing is related.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Self::One(Some(record)) => record.to_json(),
            Self::One(None) => JsonValue::Null,
            Self::Many(records) => JsonValue::Array(records.iter().map(Record::to_json).collect()),
        }
    }
}

/// A fetched row of one model plus whatever relations were loaded with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Model name.
    pub model: String,
    /// Column values.
    pub values: Row,
    /// Loaded relations, by name.
    pub relations: IndexMap<String, Loaded>,
}

impl Record {
    /// Create a record without loaded relations.
    pub fn new(model: impl Into<String>, values: Row) -> Self {
        Self {
            model: model.into(),
            values,
            relations: IndexMap::new(),
        }
    }

    /// The identity column.
    pub fn id(&self) -> QueryResult<i64> {
        self.values.get_i64(PRIMARY_KEY)
    }

    /// Get a column value (`Null` when absent).
    pub fn value(&self, column: &str) -> Value {
        self.values.get(column).cloned().unwrap_or(Value::Null)
    }

    /// Get a non-null integer column.
    pub fn get_i64(&self, column: &str) -> QueryResult<i64> {
        self.values.get_i64(column)
    }

    /// Get a nullable integer column.
    pub fn get_opt_i64(&self, column: &str) -> QueryResult<Option<i64>> {
        self.values.get_opt_i64(column)
    }

    /// Get a non-null text column.
    pub fn get_string(&self, column: &str) -> QueryResult<String> {
        self.values.get_string(column)
    }

    /// Remove and return a loaded relation.
    pub fn take_relation(&mut self, name: &str) -> Option<Loaded> {
        self.relations.shift_remove(name)
    }

    /// Render the record and its loaded relations as JSON.
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (column, value) in self.values.iter() {
            map.insert(
                column.to_string(),
                serde_json::to_value(value).unwrap_or(JsonValue::Null),
            );
        }
        for (name, loaded) in &self.relations {
            map.insert(name.clone(), loaded.to_json());
        }
        JsonValue::Object(map)
    }
}
