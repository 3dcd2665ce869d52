//! # tether-query
//!
//! Relationship loading for the Tether ORM.
//!
//! Models are declared once through the [`Model`] trait and validated as a
//! [`Schema`] when a [`SessionFactory`] is built. Related rows can then be
//! loaded three ways:
//!
//! - **Eager**: `include` / `then_include` fetch the roots and the whole path in one statement
//! - **Explicit**: `session.entry(&entity).reference(..)` / `.collection(..)` fetch one relation on request
//! - **Lazy**: with lazy loading enabled, `relation.load()` fetches on first access through the
//!   session that produced the entity, and fails once that session is released
//!
//! ## Filters
//!
//! ```rust
//! use tether_query::{Filter, Value};
//!
//! let filter = Filter::and([
//!     Filter::eq("name", "Tom"),
//!     Filter::IsNotNull("company_id".into()),
//! ]);
//!
//! let mut params = Vec::new();
//! let sql = filter.to_sql(None, &mut params);
//! assert_eq!(sql, "(\"name\" = ? AND \"company_id\" IS NOT NULL)");
//! assert_eq!(params, vec![Value::from("Tom")]);
//! ```
//!
//! ## Include paths
//!
//! ```rust
//! use tether_query::Include;
//!
//! let include = Include::new()
//!     .add_path("company.country.capital")
//!     .add_path("position");
//! assert_eq!(include.len(), 2);
//! assert_eq!(include.paths()[2], "company.country.capital");
//! ```
//!
//! ## Sessions
//!
//! ```rust,ignore
//! let factory = SessionFactory::builder(engine)
//!     .register::<User>()
//!     .register::<Company>()
//!     .lazy_loading(true)
//!     .build()?;
//!
//! let session = factory.open();
//! let users = session.query::<User>().include("company").all().await?;
//! assert_eq!(session.fetch_count(), 1);
//! ```

pub mod entry;
pub mod error;
pub mod filter;
pub mod lazy;
pub mod logging;
pub mod query;
pub mod record;
pub mod relations;
pub mod row;
pub mod session;
pub mod traits;
pub mod types;
pub mod value;

pub use entry::{CollectionEntry, Entry, ReferenceEntry};
pub use error::{ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult, Suggestion};
pub use filter::Filter;
pub use lazy::{Collection, Hydrate, Hydrator, LoadState, Reference, Relation, RelationSlot};
pub use query::Query;
pub use record::{Loaded, Record};
pub use relations::{
    ColumnSpec, ColumnType, Include, IncludeSpec, JoinPlan, LoadStrategy, ModelSpec,
    RelationLoader, RelationSpec, RelationType, Schema, SchemaBuilder, SelectArgs,
};
pub use row::Row;
pub use session::{
    Session, SessionCore, SessionFactory, SessionFactoryBuilder, SessionOptions, SessionStats,
};
pub use traits::{BoxFuture, Model, QueryEngine};
pub use types::{OrderByField, SortOrder};
pub use value::Value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorKind, QueryError, QueryResult};
    pub use crate::filter::Filter;
    pub use crate::lazy::{Collection, Hydrator, LoadState, Reference, RelationSlot};
    pub use crate::record::Record;
    pub use crate::relations::{ColumnSpec, LoadStrategy, ModelSpec, RelationSpec};
    pub use crate::session::{Session, SessionFactory};
    pub use crate::traits::{Model, QueryEngine};
    pub use crate::types::{OrderByField, SortOrder};
    pub use crate::value::Value;
}

#[cfg(test)]
pub(crate) mod testing;
