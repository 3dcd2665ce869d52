//! Core traits: the storage seam and the model contract.

pub use futures::future::BoxFuture;

use crate::error::QueryResult;
use crate::lazy::{Hydrator, RelationSlot};
use crate::record::Record;
use crate::relations::ModelSpec;
use crate::row::Row;
use crate::value::Value;

/// The storage collaborator the loader talks to.
///
/// Implementations execute already-planned SQL with `?` placeholders. The
/// trait is object safe so sessions can hold an `Arc<dyn QueryEngine>`.
pub trait QueryEngine: Send + Sync {
    /// Run a read and return every row.
    fn query(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Run a write and return the number of affected rows.
    fn execute(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<u64>>;

    /// Run an INSERT and return the identity assigned by the store.
    fn insert(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<i64>>;

    /// Run several statements without parameters.
    fn execute_batch(&self, sql: &str) -> BoxFuture<'_, QueryResult<()>>;
}

/// An entity mapped to a table.
///
/// Implementors are plain structs whose relation fields are
/// [`Reference`](crate::lazy::Reference) or [`Collection`](crate::lazy::Collection)
/// wrappers.
///
/// ```rust,ignore
/// impl Model for User {
///     const MODEL_NAME: &'static str = "User";
///
///     fn describe() -> ModelSpec {
///         ModelSpec::new("User", "users")
///             .column(ColumnSpec::text("name"))
///             .column(ColumnSpec::foreign_key("company_id", "Company").nullable())
///             .relation(RelationSpec::many_to_one("company", "Company"))
///     }
///     // ...
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// The model name used in the schema.
    const MODEL_NAME: &'static str;

    /// Describe the table, columns, and relations of this model.
    fn describe() -> ModelSpec;

    /// The identity of this entity (0 before it is added).
    fn id(&self) -> i64;

    /// Store the identity assigned on insert.
    fn set_id(&mut self, id: i64);

    /// The current value of a column. Unknown columns yield `Value::Null`.
    fn column_value(&self, column: &str) -> Value;

    /// Build an entity from a fetched record.
    fn from_record(record: Record, hydrator: &Hydrator) -> QueryResult<Self>;

    /// The relation slot with the given name, if the model has one.
    fn relation(&self, name: &str) -> Option<&dyn RelationSlot>;
}
