//! SQLite query engine implementation.

use tether_query::relations::Schema;
use tether_query::{BoxFuture, QueryEngine, QueryResult, Row, Value};
use tracing::{debug, info, instrument};

use crate::config::SqliteConfig;
use crate::ddl::SqliteDdl;
use crate::error::SqliteError;
use crate::pool::SqlitePool;

/// SQLite query engine.
///
/// Every call borrows a connection from the pool for its duration.
#[derive(Clone, Debug)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    /// Create a new SQLite engine with the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database behind a connection URL.
    ///
    /// Fails with `StorageUnavailable` if the store cannot be opened.
    pub async fn connect(url: &str) -> QueryResult<Self> {
        let config = SqliteConfig::from_url(url)?;
        let pool = SqlitePool::new(config).await?;
        Ok(Self::new(pool))
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    #[instrument(skip(self, params), fields(sql = %sql))]
    async fn run_query(&self, sql: String, params: Vec<Value>) -> Result<Vec<Row>, SqliteError> {
        let conn = self.pool.get().await?;
        let rows = conn.query(&sql, params).await?;
        debug!(rows = rows.len(), "Query returned");
        Ok(rows)
    }

    #[instrument(skip(self, params), fields(sql = %sql))]
    async fn run_execute(&self, sql: String, params: Vec<Value>) -> Result<u64, SqliteError> {
        let conn = self.pool.get().await?;
        conn.execute(&sql, params).await
    }

    #[instrument(skip(self, params), fields(sql = %sql))]
    async fn run_insert(&self, sql: String, params: Vec<Value>) -> Result<i64, SqliteError> {
        let conn = self.pool.get().await?;
        let id = conn.insert(&sql, params).await?;
        debug!(id, "Inserted row");
        Ok(id)
    }

    #[instrument(skip(self, sql))]
    async fn run_batch(&self, sql: String) -> Result<(), SqliteError> {
        let conn = self.pool.get().await?;
        conn.execute_batch(&sql).await
    }

    /// Drop every table of the schema, if present.
    pub async fn ensure_deleted(&self, schema: &Schema) -> QueryResult<()> {
        let sql = SqliteDdl.drop_all(schema);
        self.run_batch(sql).await?;
        info!(path = %self.pool.config().path_str(), "Dropped schema tables");
        Ok(())
    }

    /// Create every table of the schema, referenced tables first.
    pub async fn ensure_created(&self, schema: &Schema) -> QueryResult<()> {
        let sql = SqliteDdl.create_all(schema)?;
        self.run_batch(sql).await?;
        info!(path = %self.pool.config().path_str(), "Created schema tables");
        Ok(())
    }

    /// Drop and recreate every table of the schema.
    pub async fn recreate(&self, schema: &Schema) -> QueryResult<()> {
        self.ensure_deleted(schema).await?;
        self.ensure_created(schema).await
    }
}

impl QueryEngine for SqliteEngine {
    fn query(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let sql = sql.to_string();
        Box::pin(async move { Ok(self.run_query(sql, params).await?) })
    }

    fn execute(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(async move { Ok(self.run_execute(sql, params).await?) })
    }

    fn insert(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<i64>> {
        let sql = sql.to_string();
        Box::pin(async move { Ok(self.run_insert(sql, params).await?) })
    }

    fn execute_batch(&self, sql: &str) -> BoxFuture<'_, QueryResult<()>> {
        let sql = sql.to_string();
        Box::pin(async move { Ok(self.run_batch(sql).await?) })
    }
}
