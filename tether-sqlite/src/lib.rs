//! SQLite storage engine for the Tether ORM.
//!
//! Implements the loader's [`QueryEngine`](tether_query::QueryEngine) over
//! `tokio-rusqlite`, and creates or drops the tables of a validated schema.
//!
//! # Features
//!
//! - Configuration from a connection URL
//! - Connection pooling (one shared connection for in-memory databases)
//! - Driver errors mapped onto loader error kinds
//! - `ensure_deleted` / `ensure_created` for whole-schema recreation
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_query::SessionFactory;
//! use tether_sqlite::SqliteEngine;
//!
//! let engine = Arc::new(SqliteEngine::connect("sqlite://helloapp.db").await?);
//! let factory = SessionFactory::builder(engine.clone())
//!     .register::<User>()
//!     .register::<Company>()
//!     .build()?;
//!
//! engine.ensure_deleted(factory.schema()).await?;
//! engine.ensure_created(factory.schema()).await?;
//! ```

pub mod config;
pub mod connection;
pub mod ddl;
pub mod engine;
pub mod error;
pub mod pool;
pub mod types;

pub use config::{DatabasePath, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use ddl::SqliteDdl;
pub use engine::SqliteEngine;
pub use error::{SqliteError, SqliteResult};
pub use pool::{PoolConfig, PoolStats, SqlitePool, SqlitePoolBuilder};
