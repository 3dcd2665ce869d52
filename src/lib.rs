//! # Tether
//!
//! An async ORM core focused on how related rows reach your entities.
//!
//! Tether provides:
//! - Model descriptions validated into a schema once, when sessions are configured
//! - Eager loading of include paths in a single statement
//! - Explicit loading of one relation, or one relation for many entities
//! - Lazy loading bound to the session that produced an entity
//! - A pooled SQLite engine built on `tokio-rusqlite`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tether_orm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tether_orm::QueryError> {
//!     let engine = Arc::new(SqliteEngine::connect("sqlite://helloapp.db").await?);
//!     let factory = SessionFactory::builder(engine.clone())
//!         .register::<City>()
//!         .register::<Country>()
//!         .build()?;
//!     engine.recreate(factory.schema()).await?;
//!
//!     let session = factory.open();
//!     let countries = session.query::<Country>().include("capital").all().await?;
//!
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Relationship loading: models, sessions, queries, and relation slots.
pub mod query {
    pub use tether_query::*;
}

/// The SQLite storage engine.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use tether_sqlite::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use tether_query::prelude::*;

    #[cfg(feature = "sqlite")]
    pub use tether_sqlite::{SqliteConfig, SqliteEngine};
}

// Re-export key types at the crate root
pub use tether_query::{ErrorKind, QueryError, QueryResult, Session, SessionFactory};

#[cfg(feature = "sqlite")]
pub use tether_sqlite::SqliteEngine;
