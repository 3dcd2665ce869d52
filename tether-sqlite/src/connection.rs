//! SQLite connection wrapper.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tether_query::{Row, Value};
use tokio::sync::OwnedSemaphorePermit;
use tokio_rusqlite::Connection;
use tracing::{debug, trace};

use crate::error::{SqliteError, SqliteResult};
use crate::types::{read_row, to_params};

/// An idle connection waiting in the pool.
pub(crate) struct PooledConnection {
    pub conn: Connection,
    pub created_at: Instant,
    pub last_used: Instant,
}

impl PooledConnection {
    pub fn new(conn: Connection) -> Self {
        let now = Instant::now();
        Self {
            conn,
            created_at: now,
            last_used: now,
        }
    }
}

pub(crate) type IdleQueue = Arc<Mutex<VecDeque<PooledConnection>>>;

/// A connection borrowed from a [`SqlitePool`](crate::SqlitePool).
///
/// File connections go back to the pool when this is dropped.
pub struct SqliteConnection {
    conn: Option<Connection>,
    _permit: OwnedSemaphorePermit,
    return_to_pool: Option<IdleQueue>,
    created_at: Instant,
}

impl SqliteConnection {
    pub(crate) fn new_pooled(
        conn: Connection,
        permit: OwnedSemaphorePermit,
        return_to_pool: Option<IdleQueue>,
        created_at: Instant,
    ) -> Self {
        Self {
            conn: Some(conn),
            _permit: permit,
            return_to_pool,
            created_at,
        }
    }

    fn conn(&self) -> SqliteResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| SqliteError::pool("connection already returned to the pool"))
    }

    /// Run a query and return every row, keyed by column label.
    pub async fn query(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();
        let params = to_params(&params);
        debug!(sql = %sql, params = params.len(), "Executing query");

        self.conn()?
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt
                    .column_names()
                    .iter()
                    .map(|s| s.to_string())
                    .collect();

                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| {
                    read_row(row, &columns)
                })?;

                let results: Result<Vec<_>, _> = rows.collect();
                Ok(results?)
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(&self, sql: &str, params: Vec<Value>) -> SqliteResult<u64> {
        let sql = sql.to_string();
        let params = to_params(&params);
        debug!(sql = %sql, "Executing statement");

        let affected = self
            .conn()?
            .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?))
            .await?;
        Ok(affected as u64)
    }

    /// Execute an INSERT and return the rowid the store assigned.
    pub async fn insert(&self, sql: &str, params: Vec<Value>) -> SqliteResult<i64> {
        let sql = sql.to_string();
        let params = to_params(&params);
        debug!(sql = %sql, "Executing insert");

        self.conn()?
            .call(move |conn| {
                conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(SqliteError::from)
    }

    /// Execute several statements separated by semicolons.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        debug!(sql = %sql, "Executing batch");

        self.conn()?
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await
            .map_err(SqliteError::from)
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("pooled", &self.return_to_pool.is_some())
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if let Some(pool) = self.return_to_pool.take() {
            if let Some(conn) = self.conn.take() {
                trace!("Returning connection to pool");
                pool.lock().push_back(PooledConnection {
                    conn,
                    created_at: self.created_at,
                    last_used: Instant::now(),
                });
            }
        }
    }
}
