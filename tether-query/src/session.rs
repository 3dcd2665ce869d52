//! Sessions: the scoped unit of work every fetch goes through.
//!
//! A [`SessionFactory`] owns the validated [`Schema`] and the storage engine.
//! Each [`Session`] it opens counts its fetches per [`LoadStrategy`] and is
//! released when dropped (or [`Session::close`]d). Lazy relation slots only
//! hold a weak link to the session, so they stop working once it is released.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace};

use crate::entry::Entry;
use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::lazy::Hydrator;
use crate::query::Query;
use crate::record::Loaded;
use crate::relations::{LoadStrategy, RelationLoader, Schema, SchemaBuilder, relation_key};
use crate::row::Row;
use crate::traits::{Model, QueryEngine};
use crate::value::Value;

/// Options shared by every session of a factory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Whether unloaded relations fetch themselves on first access.
    pub lazy_loading: bool,
}

/// Fetch and write counters of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Every read sent to the store.
    pub fetches: u64,
    /// Reads of roots without included relations.
    pub plain_fetches: u64,
    /// Reads of roots with included relations.
    pub eager_fetches: u64,
    /// Relation reads requested through an entry or a batch load.
    pub explicit_fetches: u64,
    /// Relation reads triggered by first access.
    pub lazy_fetches: u64,
    /// Inserts.
    pub writes: u64,
}

impl SessionStats {
    fn record(&mut self, strategy: Option<LoadStrategy>) {
        self.fetches += 1;
        match strategy {
            None => self.plain_fetches += 1,
            Some(LoadStrategy::Eager) => self.eager_fetches += 1,
            Some(LoadStrategy::Explicit) => self.explicit_fetches += 1,
            Some(LoadStrategy::Lazy) => self.lazy_fetches += 1,
        }
    }
}

/// Builder for [`SessionFactory`].
pub struct SessionFactoryBuilder {
    engine: Arc<dyn QueryEngine>,
    schema: SchemaBuilder,
    options: SessionOptions,
}

impl SessionFactoryBuilder {
    /// Register a model.
    pub fn register<M: Model>(mut self) -> Self {
        self.schema = self.schema.register::<M>();
        self
    }

    /// Enable or disable lazy loading.
    pub fn lazy_loading(mut self, enabled: bool) -> Self {
        self.options.lazy_loading = enabled;
        self
    }

    /// Validate the schema and build the factory.
    pub fn build(self) -> QueryResult<SessionFactory> {
        let schema = self.schema.build()?;
        info!(
            models = schema.models().count(),
            lazy_loading = self.options.lazy_loading,
            "Session factory ready"
        );
        Ok(SessionFactory {
            engine: self.engine,
            schema: Arc::new(schema),
            options: self.options,
            next_id: AtomicU64::new(1),
        })
    }
}

/// Opens sessions over one engine and one validated schema.
pub struct SessionFactory {
    engine: Arc<dyn QueryEngine>,
    schema: Arc<Schema>,
    options: SessionOptions,
    next_id: AtomicU64,
}

impl SessionFactory {
    /// Start building a factory over `engine`.
    pub fn builder(engine: Arc<dyn QueryEngine>) -> SessionFactoryBuilder {
        SessionFactoryBuilder {
            engine,
            schema: Schema::builder(),
            options: SessionOptions::default(),
        }
    }

    /// Open a new session.
    pub fn open(&self) -> Session {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let core = Arc::new_cyclic(|this| SessionCore {
            id,
            engine: Arc::clone(&self.engine),
            schema: Arc::clone(&self.schema),
            options: self.options,
            open: AtomicBool::new(true),
            stats: Mutex::new(SessionStats::default()),
            this: this.clone(),
        });
        debug!(session = id, "Session opened");
        Session { core }
    }

    /// The validated schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The engine sessions fetch through.
    pub fn engine(&self) -> &Arc<dyn QueryEngine> {
        &self.engine
    }

    /// Options applied to every session.
    pub fn options(&self) -> SessionOptions {
        self.options
    }
}

impl fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionFactory")
            .field("options", &self.options)
            .field("models", &self.schema.models().count())
            .finish()
    }
}

/// Shared state of one session.
///
/// Owned by the [`Session`]; lazy relation slots hold it weakly.
pub struct SessionCore {
    id: u64,
    engine: Arc<dyn QueryEngine>,
    schema: Arc<Schema>,
    options: SessionOptions,
    open: AtomicBool,
    stats: Mutex<SessionStats>,
    this: Weak<SessionCore>,
}

impl SessionCore {
    /// Session id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Check if the session is still open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// The validated schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> SessionStats {
        *self.stats.lock()
    }

    /// A hydrator whose unloaded slots link back here when lazy loading is on.
    pub fn hydrator(&self) -> Hydrator {
        let session = self.options.lazy_loading.then(|| self.this.clone());
        Hydrator::new(Arc::clone(&self.schema), session)
    }

    fn ensure_open(&self) -> QueryResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(QueryError::invalid_operation(format!(
                "Session {} has been released",
                self.id
            )))
        }
    }

    /// Send a read to the store.
    #[instrument(skip(self, params), fields(session = self.id))]
    pub(crate) async fn fetch(
        &self,
        strategy: Option<LoadStrategy>,
        sql: &str,
        params: Vec<Value>,
    ) -> QueryResult<Vec<Row>> {
        self.ensure_open()?;
        self.stats.lock().record(strategy);

        let rows = self.engine.query(sql, params).await?;
        debug!(rows = rows.len(), "Fetched");
        Ok(rows)
    }

    /// Send an INSERT to the store.
    #[instrument(skip(self, params), fields(session = self.id))]
    pub(crate) async fn insert(&self, sql: &str, params: Vec<Value>) -> QueryResult<i64> {
        self.ensure_open()?;
        self.stats.lock().writes += 1;
        self.engine.insert(sql, params).await
    }

    /// Load one relation for a batch of keys, one result per key.
    ///
    /// Keys that are all null resolve without a fetch.
    pub(crate) async fn load_relation(
        &self,
        strategy: LoadStrategy,
        model: &str,
        relation: &str,
        keys: &[Value],
    ) -> QueryResult<Vec<Loaded>> {
        self.load_relation_where(strategy, model, relation, keys, &Filter::None)
            .await
    }

    /// Like [`load_relation`](Self::load_relation), keeping only related rows
    /// that match `filter`.
    pub(crate) async fn load_relation_where(
        &self,
        strategy: LoadStrategy,
        model: &str,
        relation: &str,
        keys: &[Value],
        filter: &Filter,
    ) -> QueryResult<Vec<Loaded>> {
        let spec = self.schema.model(model)?.relation_or_err(relation)?;
        let related = self.schema.model(&spec.related_model)?;
        if let Some(column) = filter.columns().into_iter().find(|c| !related.has_column(c)) {
            return Err(QueryError::invalid_filter(&related.name, column)
                .with_context(format!("Loading {}.{}", model, relation)));
        }
        let loader = RelationLoader::new(spec, related);

        let rows = match loader.build_filtered_query(keys, filter) {
            Some((sql, params)) => self.fetch(Some(strategy), &sql, params).await?,
            None => {
                trace!(model, relation, "No keys to resolve, skipping fetch");
                Vec::new()
            }
        };
        loader.group(keys, rows)
    }

    /// Load `relation` for every entity and store it in their slots.
    pub(crate) async fn fill<M: Model>(
        &self,
        strategy: LoadStrategy,
        entities: &[&M],
        relation: &str,
    ) -> QueryResult<()> {
        self.fill_where(strategy, entities, relation, &Filter::None)
            .await
    }

    /// Load the rows of `relation` matching `filter` for every entity and
    /// store them in their slots.
    pub(crate) async fn fill_where<M: Model>(
        &self,
        strategy: LoadStrategy,
        entities: &[&M],
        relation: &str,
        filter: &Filter,
    ) -> QueryResult<()> {
        let spec = self.schema.spec_of::<M>()?.relation_or_err(relation)?;
        let keys: Vec<Value> = entities.iter().map(|e| relation_key(*e, spec)).collect();

        let loaded = self
            .load_relation_where(strategy, M::MODEL_NAME, relation, &keys, filter)
            .await?;

        let hydrator = self.hydrator();
        for (entity, loaded) in entities.iter().zip(loaded) {
            let slot = entity.relation(relation).ok_or_else(|| {
                QueryError::internal(format!(
                    "{} declares '{}' but exposes no slot for it",
                    M::MODEL_NAME,
                    relation
                ))
            })?;
            slot.fill(loaded, &hydrator)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SessionCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCore")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .field("stats", &self.stats())
            .finish()
    }
}

/// A scoped unit of work.
///
/// ```rust,ignore
/// let session = factory.open();
/// let users = session.query::<User>().include("company").all().await?;
/// session.close();
/// ```
pub struct Session {
    core: Arc<SessionCore>,
}

impl Session {
    /// Session id.
    pub fn id(&self) -> u64 {
        self.core.id
    }

    /// Check if the session is open. Always true until it is dropped.
    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Snapshot of the fetch counters.
    pub fn stats(&self) -> SessionStats {
        self.core.stats()
    }

    /// Total number of reads sent to the store.
    pub fn fetch_count(&self) -> u64 {
        self.core.stats().fetches
    }

    /// The validated schema.
    pub fn schema(&self) -> &Schema {
        self.core.schema()
    }

    pub(crate) fn core(&self) -> &Arc<SessionCore> {
        &self.core
    }

    /// Start a query of `M`.
    pub fn query<M: Model>(&self) -> Query<'_, M> {
        Query::new(self)
    }

    /// Find an entity by identity.
    pub async fn find<M: Model>(&self, id: i64) -> QueryResult<Option<M>> {
        self.query::<M>().where_eq("id", id).first().await
    }

    /// Access the relations of an entity for explicit loading.
    pub fn entry<'s, M: Model>(&'s self, entity: &'s M) -> Entry<'s, M> {
        Entry::new(self, entity)
    }

    /// Load `relation` for every entity with a single fetch.
    pub async fn load_related<M: Model>(&self, entities: &[M], relation: &str) -> QueryResult<()> {
        if entities.is_empty() {
            self.core.schema.spec_of::<M>()?.relation_or_err(relation)?;
            return Ok(());
        }
        let refs: Vec<&M> = entities.iter().collect();
        self.core.fill(LoadStrategy::Explicit, &refs, relation).await
    }

    /// Insert an entity and store the identity the store assigned.
    pub async fn add<M: Model>(&self, entity: &mut M) -> QueryResult<i64> {
        let spec = self.core.schema.spec_of::<M>()?;
        let columns: Vec<_> = spec.insert_columns().collect();

        let sql = if columns.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES", spec.table)
        } else {
            let names: Vec<_> = columns.iter().map(|c| format!("\"{}\"", c.name)).collect();
            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                spec.table,
                names.join(", "),
                vec!["?"; columns.len()].join(", ")
            )
        };
        let params = columns.iter().map(|c| entity.column_value(&c.name)).collect();

        let id = self
            .core
            .insert(&sql, params)
            .await
            .map_err(|e| e.with_model(M::MODEL_NAME))?;
        entity.set_id(id);
        debug!(session = self.id(), model = M::MODEL_NAME, id, "Added entity");
        Ok(id)
    }

    /// Release the session. Lazy slots created by it stop loading.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.core.open.store(false, Ordering::Release);
        let stats = self.core.stats();
        debug!(
            session = self.core.id,
            fetches = stats.fetches,
            writes = stats.writes,
            "Session released"
        );
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.core.id)
            .field("open", &self.is_open())
            .finish()
    }
}
