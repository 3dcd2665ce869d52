//! Relationship graph, include trees, and the planners behind each loading strategy.
//!
//! - [`Schema`] / [`ModelSpec`] / [`RelationSpec`] describe the models and how they relate
//! - [`Include`] collects the relation paths to load eagerly
//! - [`JoinPlan`] turns an include tree into one combined fetch
//! - [`RelationLoader`] builds the separate fetch used by explicit and lazy loading
//!
//! ## Example
//!
//! ```rust,ignore
//! // Eager: one fetch, whole path populated
//! let users = session
//!     .query::<User>()
//!     .include("company")
//!     .then_include("country")
//!     .then_include("capital")
//!     .all()
//!     .await?;
//!
//! // Explicit: one fetch for one relation of one entity
//! session.entry(&company).collection("users")?.load().await?;
//! ```

mod include;
mod loader;
mod plan;
mod spec;

pub use include::{Include, IncludeSpec, include};
pub use loader::{LoadStrategy, RelationLoader, relation_key};
pub use plan::{JoinPlan, SelectArgs};
pub use spec::{
    ColumnSpec, ColumnType, ModelSpec, PRIMARY_KEY, RelationSpec, RelationType, Schema,
    SchemaBuilder,
};
