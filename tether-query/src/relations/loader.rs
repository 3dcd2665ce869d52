//! Relation loading strategies and the per-relation loader used by explicit
//! and lazy loading.

use std::fmt;

use indexmap::IndexMap;

use crate::error::QueryResult;
use crate::filter::Filter;
use crate::record::{Loaded, Record};
use crate::row::Row;
use crate::traits::Model;
use crate::value::Value;

use super::spec::{ModelSpec, PRIMARY_KEY, RelationSpec, RelationType};

/// Strategy that caused a relation fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStrategy {
    /// Loaded with the root query through JOINs.
    Eager,
    /// Loaded on request through an entry.
    Explicit,
    /// Loaded on first access through the originating session.
    Lazy,
}

impl LoadStrategy {
    /// Check if this is eager loading.
    pub fn is_eager(&self) -> bool {
        matches!(self, Self::Eager)
    }

    /// Check if this is explicit loading.
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit)
    }

    /// Check if this is lazy loading.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy)
    }

    /// Lowercase name, used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Explicit => "explicit",
            Self::Lazy => "lazy",
        }
    }
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The key that identifies an entity's related rows for `relation`.
///
/// The foreign key value for many-to-one relations, the entity's identity for
/// one-to-many relations.
pub fn relation_key<M: Model>(entity: &M, relation: &RelationSpec) -> Value {
    match relation.relation_type {
        RelationType::ManyToOne => entity.column_value(&relation.foreign_key),
        RelationType::OneToMany => Value::Int(entity.id()),
    }
}

/// Builds the separate query that loads one relation for a batch of keys,
/// and groups its rows back per key.
#[derive(Debug, Clone, Copy)]
pub struct RelationLoader<'a> {
    relation: &'a RelationSpec,
    related: &'a ModelSpec,
}

impl<'a> RelationLoader<'a> {
    /// Create a loader for `relation`, whose target is `related`.
    pub fn new(relation: &'a RelationSpec, related: &'a ModelSpec) -> Self {
        Self { relation, related }
    }

    fn match_column(&self) -> &str {
        match self.relation.relation_type {
            RelationType::ManyToOne => PRIMARY_KEY,
            RelationType::OneToMany => &self.relation.foreign_key,
        }
    }

    /// Build the query for `keys`.
    ///
    /// Null and duplicate keys are dropped. Returns `None` when nothing is
    /// left to fetch.
    pub fn build_query(&self, keys: &[Value]) -> Option<(String, Vec<Value>)> {
        self.build_filtered_query(keys, &Filter::None)
    }

    /// Build the query for `keys`, narrowed by `filter` on the related columns.
    pub fn build_filtered_query(
        &self,
        keys: &[Value],
        filter: &Filter,
    ) -> Option<(String, Vec<Value>)> {
        let mut params: Vec<Value> = Vec::new();
        for key in keys {
            if !key.is_null() && !params.contains(key) {
                params.push(key.clone());
            }
        }
        if params.is_empty() {
            return None;
        }

        let columns: Vec<_> = self
            .related
            .column_names()
            .map(|c| format!("\"{}\"", c))
            .collect();
        let placeholders = vec!["?"; params.len()].join(", ");
        let mut condition = format!("\"{}\" IN ({})", self.match_column(), placeholders);
        if !filter.is_none() {
            condition = format!("{} AND {}", condition, filter.to_sql(None, &mut params));
        }

        let sql = format!(
            "SELECT {} FROM \"{}\" WHERE {} ORDER BY \"{}\" ASC",
            columns.join(", "),
            self.related.table,
            condition,
            PRIMARY_KEY
        );
        Some((sql, params))
    }

    /// Group fetched rows per key, in key order.
    pub fn group(&self, keys: &[Value], rows: Vec<Row>) -> QueryResult<Vec<Loaded>> {
        let column = self.match_column();
        let mut by_key: IndexMap<i64, Vec<Record>> = IndexMap::new();
        for row in rows {
            let key = row.get_i64(column)?;
            by_key
                .entry(key)
                .or_default()
                .push(Record::new(&self.related.name, row));
        }

        let loaded = keys
            .iter()
            .map(|key| {
                let records = key
                    .as_i64()
                    .and_then(|k| by_key.get(&k))
                    .cloned()
                    .unwrap_or_default();
                match self.relation.relation_type {
                    RelationType::ManyToOne => {
                        Loaded::One(records.into_iter().next().map(Box::new))
                    }
                    RelationType::OneToMany => Loaded::Many(records),
                }
            })
            .collect();
        Ok(loaded)
    }
}
