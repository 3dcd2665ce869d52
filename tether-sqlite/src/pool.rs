//! Connection pool for SQLite.
//!
//! - File databases: idle connections are reused, up to `max_connections` at once
//! - In-memory databases: every borrower gets the same connection, since a
//!   second connection would open a second, empty database

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_rusqlite::Connection;
use tracing::{debug, info, trace};

use crate::config::SqliteConfig;
use crate::connection::{IdleQueue, PooledConnection, SqliteConnection};
use crate::error::{SqliteError, SqliteResult};

/// A connection pool for SQLite.
///
/// ```rust,ignore
/// use tether_sqlite::{SqliteConfig, SqlitePool};
///
/// let pool = SqlitePool::new(SqliteConfig::file("helloapp.db")).await?;
/// let conn = pool.get().await?;
/// // Returned to the pool when dropped
/// ```
#[derive(Clone)]
pub struct SqlitePool {
    config: Arc<SqliteConfig>,
    semaphore: Arc<Semaphore>,
    idle_connections: IdleQueue,
    /// The single connection behind an in-memory database.
    shared: Option<Connection>,
    pool_config: Arc<PoolConfig>,
    stats: Arc<Mutex<PoolStats>>,
}

/// Statistics about pool usage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of connection reuses.
    pub reuses: u64,
    /// Number of new connections opened.
    pub opens: u64,
    /// Number of connections closed due to expiration.
    pub expirations: u64,
}

impl SqlitePool {
    /// Create a new connection pool from configuration.
    pub async fn new(config: SqliteConfig) -> SqliteResult<Self> {
        Self::with_pool_config(config, PoolConfig::default()).await
    }

    /// Create a new connection pool with custom pool configuration.
    ///
    /// Opens one connection up front, so an unreachable store fails here.
    pub async fn with_pool_config(config: SqliteConfig, pool_config: PoolConfig) -> SqliteResult<Self> {
        if pool_config.max_connections == 0 {
            return Err(SqliteError::config("max_connections must be at least 1"));
        }

        let first = Self::open_connection(&config).await?;
        let mut idle = VecDeque::with_capacity(pool_config.max_connections);
        let shared = if config.path.is_memory() {
            Some(first)
        } else {
            idle.push_back(PooledConnection::new(first));
            None
        };

        info!(
            path = %config.path_str(),
            max_connections = pool_config.max_connections,
            shared = shared.is_some(),
            "SQLite connection pool created"
        );

        Ok(Self {
            config: Arc::new(config),
            semaphore: Arc::new(Semaphore::new(pool_config.max_connections)),
            idle_connections: Arc::new(Mutex::new(idle)),
            shared,
            pool_config: Arc::new(pool_config),
            stats: Arc::new(Mutex::new(PoolStats {
                opens: 1,
                ..PoolStats::default()
            })),
        })
    }

    async fn open_connection(config: &SqliteConfig) -> SqliteResult<Connection> {
        let init_sql = config.init_sql();

        let conn = match &config.path {
            crate::config::DatabasePath::Memory => Connection::open_in_memory().await?,
            crate::config::DatabasePath::File(path) => Connection::open(path).await?,
        };

        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            Ok(())
        })
        .await?;

        debug!(path = %config.path_str(), "Opened SQLite connection");
        Ok(conn)
    }

    /// Borrow a connection.
    ///
    /// Waits for a free slot for at most `acquire_timeout`.
    pub async fn get(&self) -> SqliteResult<SqliteConnection> {
        trace!("Acquiring connection from pool");

        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match self.pool_config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire).await.map_err(|_| {
                SqliteError::pool(format!("no connection available after {:?}", limit))
            })?,
            None => acquire.await,
        }
        .map_err(|e| SqliteError::pool(format!("failed to acquire permit: {}", e)))?;

        if let Some(ref shared) = self.shared {
            self.stats.lock().reuses += 1;
            return Ok(SqliteConnection::new_pooled(
                shared.clone(),
                permit,
                None,
                Instant::now(),
            ));
        }

        if let Some(pooled) = self.take_idle() {
            return Ok(SqliteConnection::new_pooled(
                pooled.conn,
                permit,
                Some(self.idle_connections.clone()),
                pooled.created_at,
            ));
        }

        debug!("No idle connections, opening new connection");
        let conn = Self::open_connection(&self.config).await?;
        self.stats.lock().opens += 1;
        Ok(SqliteConnection::new_pooled(
            conn,
            permit,
            Some(self.idle_connections.clone()),
            Instant::now(),
        ))
    }

    /// Pop the first idle connection that has not expired.
    fn take_idle(&self) -> Option<PooledConnection> {
        let mut idle = self.idle_connections.lock();
        let mut stats = self.stats.lock();

        while let Some(pooled) = idle.pop_front() {
            let too_old = self
                .pool_config
                .max_lifetime
                .is_some_and(|lifetime| pooled.created_at.elapsed() > lifetime);
            let too_idle = self
                .pool_config
                .idle_timeout
                .is_some_and(|timeout| pooled.last_used.elapsed() > timeout);

            if too_old || too_idle {
                stats.expirations += 1;
                continue;
            }
            stats.reuses += 1;
            return Some(pooled);
        }
        None
    }

    /// Get the database configuration.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Get the pool settings.
    pub fn pool_config(&self) -> &PoolConfig {
        &self.pool_config
    }

    /// Get pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats.lock().clone()
    }

    /// Get the number of connections that could be borrowed right now.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the number of idle file connections.
    pub fn idle_count(&self) -> usize {
        self.idle_connections.lock().len()
    }

    /// Create a builder for configuring the pool.
    pub fn builder() -> SqlitePoolBuilder {
        SqlitePoolBuilder::new()
    }
}

impl std::fmt::Debug for SqlitePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlitePool")
            .field("path", &self.config.path_str())
            .field("shared", &self.shared.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Configuration for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of concurrent connections.
    pub max_connections: usize,
    /// How long `get` waits for a free connection.
    pub acquire_timeout: Option<Duration>,
    /// Maximum idle time before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime of a connection before it is recycled.
    pub max_lifetime: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(300)),
            max_lifetime: Some(Duration::from_secs(1800)),
        }
    }
}

/// Builder for creating a connection pool.
#[derive(Debug, Default)]
pub struct SqlitePoolBuilder {
    config: Option<SqliteConfig>,
    url: Option<String>,
    pool_config: PoolConfig,
}

impl SqlitePoolBuilder {
    /// Create a new pool builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the database URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: SqliteConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: usize) -> Self {
        self.pool_config.max_connections = n;
        self
    }

    /// Set how long `get` waits for a free connection.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.acquire_timeout = Some(timeout);
        self
    }

    /// Set the idle timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_config.idle_timeout = Some(timeout);
        self
    }

    /// Build the connection pool.
    pub async fn build(self) -> SqliteResult<SqlitePool> {
        let config = if let Some(config) = self.config {
            config
        } else if let Some(url) = self.url {
            SqliteConfig::from_url(url)?
        } else {
            return Err(SqliteError::config("no database URL or config provided"));
        };

        SqlitePool::with_pool_config(config, self.pool_config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_builder_requires_a_source() {
        let err = SqlitePoolBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, SqliteError::Config(_)));
    }

    #[tokio::test]
    async fn test_memory_pool_shares_one_database() {
        let pool = SqlitePool::builder()
            .url("sqlite::memory:")
            .build()
            .await
            .unwrap();

        let conn = pool.get().await.unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        drop(conn);

        let other = pool.get().await.unwrap();
        let rows = other.query("SELECT COUNT(*) AS n FROM t", Vec::new()).await.unwrap();
        assert_eq!(rows[0].get_i64("n").unwrap(), 0);
        assert_eq!(pool.stats().opens, 1);
    }

    #[tokio::test]
    async fn test_file_pool_reuses_connections() {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePool::new(SqliteConfig::file(dir.path().join("pool.db")))
            .await
            .unwrap();
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.get().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        drop(conn);
        assert_eq!(pool.idle_count(), 1);

        let _again = pool.get().await.unwrap();
        let stats = pool.stats();
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.reuses, 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_times_out() {
        let pool = SqlitePool::builder()
            .url(":memory:")
            .max_connections(1)
            .acquire_timeout(Duration::from_millis(20))
            .build()
            .await
            .unwrap();

        let _held = pool.get().await.unwrap();
        let err = pool.get().await.unwrap_err();
        assert!(matches!(err, SqliteError::Pool(_)));
    }

    #[tokio::test]
    async fn test_unopenable_path_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("app.db");
        let err = SqlitePool::new(SqliteConfig::file(path)).await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
