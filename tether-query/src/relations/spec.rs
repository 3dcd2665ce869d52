//! Model, column, and relation specifications.
//!
//! Every model describes itself once through [`Model::describe`](crate::traits::Model::describe).
//! The descriptions are collected into a [`Schema`], which validates the
//! relationship graph as a whole before any session is opened.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::traits::Model;

/// Name of the identity column every model carries.
pub const PRIMARY_KEY: &str = "id";

/// Type of relation between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationType {
    /// Many-to-one relation (e.g., User belongs to Company). The foreign key
    /// lives on the owning model.
    ManyToOne,
    /// One-to-many relation (e.g., Company has many Users). The foreign key
    /// lives on the related model.
    OneToMany,
}

impl RelationType {
    /// Check if this relation returns multiple records.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::OneToMany)
    }

    /// Check if this relation returns a single record.
    pub fn is_one(&self) -> bool {
        matches!(self, Self::ManyToOne)
    }
}

/// Specification for a relation between models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSpec {
    /// Name of the relation (field name).
    pub name: String,
    /// Type of relation.
    pub relation_type: RelationType,
    /// Name of the related model.
    pub related_model: String,
    /// Foreign key column. On the owner for `ManyToOne`, on the related model for `OneToMany`.
    pub foreign_key: String,
}

impl RelationSpec {
    /// Create a many-to-one relation spec.
    ///
    /// The foreign key defaults to `{name}_id`.
    pub fn many_to_one(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            foreign_key: format!("{}_id", name),
            name,
            relation_type: RelationType::ManyToOne,
            related_model: related_model.into(),
        }
    }

    /// Create a one-to-many relation spec.
    ///
    /// The foreign key must be set with [`RelationSpec::foreign_key`].
    pub fn one_to_many(name: impl Into<String>, related_model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            relation_type: RelationType::OneToMany,
            related_model: related_model.into(),
            foreign_key: String::new(),
        }
    }

    /// Set the foreign key column.
    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        self.foreign_key = column.into();
        self
    }
}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 64-bit integer.
    Integer,
    /// UTF-8 text.
    Text,
    /// Floating point.
    Real,
    /// Boolean, stored as 0/1.
    Bool,
}

impl ColumnType {
    /// Get the SQLite type name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Integer | Self::Bool => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
        }
    }
}

/// Specification for a single column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Storage type.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Model referenced by this column, for foreign keys.
    pub references: Option<String>,
}

impl ColumnSpec {
    /// Create a non-null column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            references: None,
        }
    }

    /// Create a non-null integer column.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    /// Create a non-null text column.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Text)
    }

    /// Create a foreign key column referencing `model`.
    pub fn foreign_key(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            references: Some(model.into()),
            ..Self::new(name, ColumnType::Integer)
        }
    }

    /// Mark the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

/// Description of a model: its table, columns, and relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Model name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Columns in declaration order, starting with the primary key.
    pub columns: Vec<ColumnSpec>,
    /// Relations in declaration order.
    pub relations: IndexMap<String, RelationSpec>,
}

impl ModelSpec {
    /// Create a model spec with just the primary key column.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: vec![ColumnSpec::integer(PRIMARY_KEY)],
            relations: IndexMap::new(),
        }
    }

    /// Add a column.
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a relation.
    pub fn relation(mut self, relation: RelationSpec) -> Self {
        self.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Get a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check if the model has a column.
    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    /// Get a relation by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.get(name)
    }

    /// Get a relation by name or fail with a configuration error.
    pub fn relation_or_err(&self, name: &str) -> QueryResult<&RelationSpec> {
        self.relations
            .get(name)
            .ok_or_else(|| QueryError::unknown_relation(&self.name, name))
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns written on insert (everything but the identity).
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.name != PRIMARY_KEY)
    }
}

/// Validated registry of model specifications.
#[derive(Debug, Clone)]
pub struct Schema {
    models: IndexMap<String, ModelSpec>,
    creation_order: Vec<String>,
}

impl Schema {
    /// Start building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Get a model by name.
    pub fn model(&self, name: &str) -> QueryResult<&ModelSpec> {
        self.models
            .get(name)
            .ok_or_else(|| QueryError::unknown_model(name))
    }

    /// Get the spec for a model type.
    pub fn spec_of<M: Model>(&self) -> QueryResult<&ModelSpec> {
        self.model(M::MODEL_NAME)
    }

    /// All models in registration order.
    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    /// Models ordered so that every referenced model precedes its referrers.
    pub fn creation_order(&self) -> impl DoubleEndedIterator<Item = &ModelSpec> {
        self.creation_order.iter().filter_map(|n| self.models.get(n))
    }

    /// Resolve a dotted relation path starting at `model`.
    ///
    /// Returns the relation at each step.
    pub fn resolve_path(&self, model: &str, path: &str) -> QueryResult<Vec<&RelationSpec>> {
        if path.trim().is_empty() {
            return Err(QueryError::invalid_include(model, "Empty relation path"));
        }

        let mut current = self.model(model)?;
        let mut out = Vec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(QueryError::invalid_include(
                    model,
                    format!("Malformed relation path '{}'", path),
                ));
            }
            let relation = current.relation_or_err(segment)?;
            out.push(relation);
            current = self.model(&relation.related_model)?;
        }
        Ok(out)
    }
}

/// Collects model specs and validates them into a [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    models: Vec<ModelSpec>,
}

impl SchemaBuilder {
    /// Register a model type.
    pub fn register<M: Model>(self) -> Self {
        self.model(M::describe())
    }

    /// Register a model spec directly.
    pub fn model(mut self, spec: ModelSpec) -> Self {
        self.models.push(spec);
        self
    }

    /// Validate the relationship graph and build the schema.
    pub fn build(self) -> QueryResult<Schema> {
        let mut models: IndexMap<String, ModelSpec> = IndexMap::new();
        for spec in self.models {
            if models.contains_key(&spec.name) {
                return Err(QueryError::configuration(format!(
                    "Model '{}' is registered twice",
                    spec.name
                )));
            }
            if let Some(other) = models.values().find(|m| m.table == spec.table) {
                return Err(QueryError::configuration(format!(
                    "Models '{}' and '{}' share table '{}'",
                    other.name, spec.name, spec.table
                )));
            }
            models.insert(spec.name.clone(), spec);
        }

        for spec in models.values() {
            validate_model(spec, &models)?;
        }

        let creation_order = creation_order(&models)?;
        debug!(models = models.len(), "Schema validated");

        Ok(Schema {
            models,
            creation_order,
        })
    }
}

fn validate_model(spec: &ModelSpec, models: &IndexMap<String, ModelSpec>) -> QueryResult<()> {
    let mut seen = Vec::new();
    for column in &spec.columns {
        if seen.contains(&column.name.as_str()) {
            return Err(QueryError::configuration(format!(
                "{} declares column '{}' twice",
                spec.name, column.name
            ))
            .with_model(&spec.name));
        }
        seen.push(column.name.as_str());

        if let Some(ref target) = column.references {
            if !models.contains_key(target) {
                return Err(QueryError::unknown_model(target)
                    .with_context(format!("Resolving {}.{}", spec.name, column.name)));
            }
        }
    }

    for relation in spec.relations.values() {
        if spec.has_column(&relation.name) {
            return Err(QueryError::configuration(format!(
                "{} relation '{}' shadows a column of the same name",
                spec.name, relation.name
            ))
            .with_model(&spec.name)
            .with_field(&relation.name));
        }

        let related = models.get(&relation.related_model).ok_or_else(|| {
            QueryError::unknown_model(&relation.related_model)
                .with_context(format!("Resolving {}.{}", spec.name, relation.name))
        })?;

        // The side carrying the foreign key depends on the cardinality.
        let (owner, column) = match relation.relation_type {
            RelationType::ManyToOne => (spec, spec.get_column(&relation.foreign_key)),
            RelationType::OneToMany => (related, related.get_column(&relation.foreign_key)),
        };

        let column = column.ok_or_else(|| {
            QueryError::configuration(format!(
                "{}.{} uses foreign key '{}', which is not a column of {}",
                spec.name, relation.name, relation.foreign_key, owner.name
            ))
            .with_model(&spec.name)
            .with_field(&relation.name)
        })?;

        let expected = match relation.relation_type {
            RelationType::ManyToOne => &related.name,
            RelationType::OneToMany => &spec.name,
        };
        if column.references.as_deref() != Some(expected.as_str()) {
            return Err(QueryError::configuration(format!(
                "{}.{} must reference {}",
                owner.name, column.name, expected
            ))
            .with_model(&owner.name)
            .with_field(&column.name));
        }
    }

    Ok(())
}

/// Topologically order models by their foreign keys.
fn creation_order(models: &IndexMap<String, ModelSpec>) -> QueryResult<Vec<String>> {
    let mut ordered: Vec<String> = Vec::with_capacity(models.len());

    while ordered.len() < models.len() {
        let next = models.values().find(|m| {
            !ordered.contains(&m.name)
                && m.columns
                    .iter()
                    .filter_map(|c| c.references.as_ref())
                    .all(|target| target == &m.name || ordered.contains(target))
        });

        match next {
            Some(model) => ordered.push(model.name.clone()),
            None => {
                let remaining: Vec<_> = models
                    .keys()
                    .filter(|n| !ordered.contains(n))
                    .map(String::as_str)
                    .collect();
                return Err(QueryError::configuration(format!(
                    "Foreign keys form a cycle between: {}",
                    remaining.join(", ")
                )));
            }
        }
    }

    Ok(ordered)
}
