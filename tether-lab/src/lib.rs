//! # tether-lab
//!
//! A console lab for the three relationship-loading strategies of the Tether
//! ORM. It recreates a small SQLite database of users, companies, positions,
//! countries, and cities, seeds it, and prints related rows loaded eagerly,
//! lazily, and explicitly.
//!
//! ```rust,ignore
//! let lab = Lab::connect("sqlite::memory:").await?;
//! lab.recreate().await?;
//! lab.seed().await?;
//!
//! for line in Scenario::Eager.run(&lab).await? {
//!     println!("{}", line);
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod output;
pub mod scenarios;
pub mod seed;

use std::sync::Arc;

use tether_query::SessionFactory;
use tether_sqlite::SqliteEngine;
use tracing::info;

pub use config::LabConfig;
pub use error::{LabError, LabResult};
pub use scenarios::Scenario;
pub use seed::SeedReport;

/// A database with the lab schema and two session factories over it.
///
/// Both factories share one engine; they differ only in whether lazy loading
/// is enabled.
#[derive(Debug)]
pub struct Lab {
    engine: Arc<SqliteEngine>,
    sessions: SessionFactory,
    lazy_sessions: SessionFactory,
}

impl Lab {
    /// Open the database behind `url` and validate the schema.
    pub async fn connect(url: &str) -> LabResult<Self> {
        let engine = Arc::new(SqliteEngine::connect(url).await?);
        let sessions = models::register(SessionFactory::builder(engine.clone())).build()?;
        let lazy_sessions = models::register(SessionFactory::builder(engine.clone()))
            .lazy_loading(true)
            .build()?;

        info!(url, "Lab connected");
        Ok(Self {
            engine,
            sessions,
            lazy_sessions,
        })
    }

    /// The storage engine.
    pub fn engine(&self) -> &SqliteEngine {
        &self.engine
    }

    /// Sessions without lazy loading.
    pub fn sessions(&self) -> &SessionFactory {
        &self.sessions
    }

    /// Sessions whose unloaded relations fetch on first access.
    pub fn lazy_sessions(&self) -> &SessionFactory {
        &self.lazy_sessions
    }

    /// Drop and create every table.
    pub async fn recreate(&self) -> LabResult<()> {
        self.engine.recreate(self.sessions.schema()).await?;
        Ok(())
    }

    /// Insert the sample rows in a session of their own.
    pub async fn seed(&self) -> LabResult<SeedReport> {
        let session = self.sessions.open();
        Ok(seed::seed(&session).await?)
    }
}
