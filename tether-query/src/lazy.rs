//! Relation slots with lazy loading support.
//!
//! Every relation field on a model is a [`Relation<T>`]: a single
//! [`Reference<M>`] or a [`Collection<M>`]. A slot starts `Unloaded` and
//! becomes `Loaded` through eager inclusion, an explicit entry load, or, when
//! the session factory enables it, a lazy fetch on first [`Relation::load`].
//!
//! Lazy slots keep only a weak link to the session that produced them, so
//! releasing the session turns later lazy access into an
//! [`InvalidOperation`](crate::error::ErrorKind::InvalidOperation) error.
//!
//! # Example
//!
//! ```rust,ignore
//! let users = session.query::<User>().all().await?;
//! for user in &users {
//!     // First access fetches through the session; later accesses hit the cache.
//!     let company = user.company.load().await?;
//!     println!("{} - {}", user.name, company.map(|c| c.name.clone()).unwrap_or_default());
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{QueryError, QueryResult};
use crate::record::{Loaded, Record};
use crate::relations::{LoadStrategy, RelationType, Schema};
use crate::session::SessionCore;
use crate::traits::Model;
use crate::value::Value;

/// Observable state of a relation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadState {
    /// Not yet loaded.
    Unloaded,
    /// A lazy fetch is in flight.
    Loading,
    /// Loaded (possibly empty).
    Loaded,
}

enum RelationState<T> {
    Unloaded,
    Loading,
    Loaded(T),
}

impl<T> RelationState<T> {
    fn load_state(&self) -> LoadState {
        match self {
            Self::Unloaded => LoadState::Unloaded,
            Self::Loading => LoadState::Loading,
            Self::Loaded(_) => LoadState::Loaded,
        }
    }
}

/// What a lazy slot needs to fetch itself later.
#[derive(Clone)]
struct LazyLink {
    session: Weak<SessionCore>,
    model: String,
    key: Value,
}

/// A relation field on a model.
pub struct Relation<T> {
    name: String,
    state: Mutex<RelationState<T>>,
    link: Option<LazyLink>,
}

/// A many-to-one relation: at most one related entity.
pub type Reference<M> = Relation<Option<Arc<M>>>;

/// A one-to-many relation: related entities ordered by identity.
pub type Collection<M> = Relation<Vec<Arc<M>>>;

impl<T> Relation<T> {
    /// Create an unloaded slot with no session behind it.
    pub fn unloaded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(RelationState::Unloaded),
            link: None,
        }
    }

    /// Create a slot that is already loaded.
    pub fn loaded(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(RelationState::Loaded(value)),
            link: None,
        }
    }

    /// The relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state of the slot.
    pub fn state(&self) -> LoadState {
        self.state.lock().load_state()
    }

    /// Check if the slot is loaded.
    pub fn is_loaded(&self) -> bool {
        self.state() == LoadState::Loaded
    }

    /// Check if the slot can fetch itself lazily.
    pub fn is_lazy(&self) -> bool {
        self.link.is_some()
    }

    fn set(&self, value: T) {
        *self.state.lock() = RelationState::Loaded(value);
    }
}

impl<T: Clone> Relation<T> {
    /// The loaded value, without fetching.
    pub fn peek(&self) -> Option<T> {
        match &*self.state.lock() {
            RelationState::Loaded(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl<T: Hydrate> Relation<T> {
    /// Return the loaded value, fetching it through the originating session on first access.
    ///
    /// Fails with `InvalidOperation` when the session has been released, when lazy
    /// loading is disabled, or when another load of this slot is in flight.
    pub async fn load(&self) -> QueryResult<T> {
        let (core, link) = {
            let mut state = self.state.lock();
            match &*state {
                RelationState::Loaded(value) => {
                    trace!(relation = %self.name, "Relation already loaded");
                    return Ok(value.clone());
                }
                RelationState::Loading => {
                    return Err(QueryError::invalid_operation(format!(
                        "Relation '{}' is already being loaded",
                        self.name
                    ))
                    .with_field(&self.name));
                }
                RelationState::Unloaded => {}
            }

            let link = self
                .link
                .clone()
                .ok_or_else(|| QueryError::lazy_loading_disabled(&self.name))?;
            let core = match link.session.upgrade() {
                Some(core) if core.is_open() => core,
                _ => return Err(QueryError::session_closed(&self.name).with_model(&link.model)),
            };

            *state = RelationState::Loading;
            (core, link)
        };
        let guard = LoadingGuard::new(&self.state);

        debug!(
            session = core.id(),
            model = %link.model,
            relation = %self.name,
            "Lazy loading relation"
        );

        let result = async {
            let mut loaded = core
                .load_relation(
                    LoadStrategy::Lazy,
                    &link.model,
                    &self.name,
                    std::slice::from_ref(&link.key),
                )
                .await?;
            let loaded = loaded
                .pop()
                .ok_or_else(|| QueryError::internal("relation loader returned no result"))?;
            T::hydrate(loaded, &core.hydrator())
        }
        .await;

        let value = result?;
        guard.complete(value.clone());
        Ok(value)
    }
}

/// Holds a slot in `Loading` and puts it back to `Unloaded` unless the load
/// completes, including when the loading future is dropped mid-fetch.
struct LoadingGuard<'a, T> {
    state: &'a Mutex<RelationState<T>>,
    pending: bool,
}

impl<'a, T> LoadingGuard<'a, T> {
    fn new(state: &'a Mutex<RelationState<T>>) -> Self {
        Self {
            state,
            pending: true,
        }
    }

    fn complete(mut self, value: T) {
        *self.state.lock() = RelationState::Loaded(value);
        self.pending = false;
    }
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        if !self.pending {
            return;
        }
        let mut state = self.state.lock();
        if matches!(*state, RelationState::Loading) {
            trace!("Relation load abandoned, resetting slot");
            *state = RelationState::Unloaded;
        }
    }
}

impl<M> Relation<Option<Arc<M>>> {
    /// The loaded entity, or `None` if unloaded or absent. Never fetches.
    pub fn get(&self) -> Option<Arc<M>> {
        match &*self.state.lock() {
            RelationState::Loaded(value) => value.clone(),
            _ => None,
        }
    }
}

impl<M> Relation<Vec<Arc<M>>> {
    /// The loaded entities, or an empty list if unloaded. Never fetches.
    pub fn get(&self) -> Vec<Arc<M>> {
        match &*self.state.lock() {
            RelationState::Loaded(value) => value.clone(),
            _ => Vec::new(),
        }
    }
}

impl<T: Clone> Clone for Relation<T> {
    fn clone(&self) -> Self {
        let state = match &*self.state.lock() {
            RelationState::Loaded(value) => RelationState::Loaded(value.clone()),
            _ => RelationState::Unloaded,
        };
        Self {
            name: self.name.clone(),
            state: Mutex::new(state),
            link: self.link.clone(),
        }
    }
}

impl<T> fmt::Debug for Relation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("lazy", &self.link.is_some())
            .finish()
    }
}

/// Converts loaded records into the value held by a relation slot.
pub trait Hydrate: Clone + Send + Sync + Sized + 'static {
    /// Whether the slot holds a collection.
    const MANY: bool;

    /// Model name of the related entity.
    fn target() -> &'static str;

    /// Build the slot value.
    fn hydrate(loaded: Loaded, hydrator: &Hydrator) -> QueryResult<Self>;
}

impl<M: Model> Hydrate for Option<Arc<M>> {
    const MANY: bool = false;

    fn target() -> &'static str {
        M::MODEL_NAME
    }

    fn hydrate(loaded: Loaded, hydrator: &Hydrator) -> QueryResult<Self> {
        match loaded {
            Loaded::One(Some(record)) => Ok(Some(Arc::new(M::from_record(*record, hydrator)?))),
            Loaded::One(None) => Ok(None),
            Loaded::Many(_) => Err(QueryError::internal(format!(
                "collection result for a {} reference",
                M::MODEL_NAME
            ))),
        }
    }
}

impl<M: Model> Hydrate for Vec<Arc<M>> {
    const MANY: bool = true;

    fn target() -> &'static str {
        M::MODEL_NAME
    }

    fn hydrate(loaded: Loaded, hydrator: &Hydrator) -> QueryResult<Self> {
        match loaded {
            Loaded::Many(records) => records
                .into_iter()
                .map(|r| M::from_record(r, hydrator).map(Arc::new))
                .collect(),
            Loaded::One(_) => Err(QueryError::internal(format!(
                "single result for a {} collection",
                M::MODEL_NAME
            ))),
        }
    }
}

/// Type-erased access to a relation slot, used by explicit loading.
pub trait RelationSlot: Send + Sync {
    /// The relation name.
    fn name(&self) -> &str;

    /// Current state of the slot.
    fn state(&self) -> LoadState;

    /// Replace the slot contents with freshly loaded records.
    fn fill(&self, loaded: Loaded, hydrator: &Hydrator) -> QueryResult<()>;
}

impl<T: Hydrate> RelationSlot for Relation<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> LoadState {
        Relation::state(self)
    }

    fn fill(&self, loaded: Loaded, hydrator: &Hydrator) -> QueryResult<()> {
        let value = T::hydrate(loaded, hydrator)?;
        self.set(value);
        Ok(())
    }
}

/// Builds relation slots while turning records into models.
///
/// Carries a weak session link when lazy loading is enabled so unloaded
/// slots can fetch themselves later.
#[derive(Clone)]
pub struct Hydrator {
    schema: Arc<Schema>,
    session: Option<Weak<SessionCore>>,
}

impl Hydrator {
    /// Create a hydrator. Pass a session to make unloaded slots lazy.
    pub fn new(schema: Arc<Schema>, session: Option<Weak<SessionCore>>) -> Self {
        Self { schema, session }
    }

    /// Create a hydrator without lazy loading.
    pub fn detached(schema: Arc<Schema>) -> Self {
        Self::new(schema, None)
    }

    /// The schema models are resolved against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build the many-to-one slot `name` of `record`.
    pub fn reference<M: Model>(&self, record: &mut Record, name: &str) -> QueryResult<Reference<M>> {
        self.relation(record, name)
    }

    /// Build the one-to-many slot `name` of `record`.
    pub fn collection<M: Model>(&self, record: &mut Record, name: &str) -> QueryResult<Collection<M>> {
        self.relation(record, name)
    }

    /// Build a relation slot, taking loaded rows out of `record` if present.
    pub fn relation<T: Hydrate>(&self, record: &mut Record, name: &str) -> QueryResult<Relation<T>> {
        let spec = self.schema.model(&record.model)?.relation_or_err(name)?;

        if spec.relation_type.is_many() != T::MANY {
            return Err(QueryError::configuration(format!(
                "{}.{} is declared as {:?} but the field holds a {}",
                record.model,
                name,
                spec.relation_type,
                if T::MANY { "collection" } else { "reference" }
            ))
            .with_model(&record.model)
            .with_field(name));
        }
        if spec.related_model != T::target() {
            return Err(QueryError::configuration(format!(
                "{}.{} relates to {} but the field holds {}",
                record.model,
                name,
                spec.related_model,
                T::target()
            ))
            .with_model(&record.model)
            .with_field(name));
        }

        if let Some(loaded) = record.take_relation(name) {
            return Ok(Relation::loaded(name, T::hydrate(loaded, self)?));
        }

        let mut relation = Relation::unloaded(name);
        if let Some(ref session) = self.session {
            let key = match spec.relation_type {
                RelationType::ManyToOne => record.value(&spec.foreign_key),
                RelationType::OneToMany => Value::Int(record.id()?),
            };
            relation.link = Some(LazyLink {
                session: session.clone(),
                model: record.model.clone(),
                key,
            });
        }
        Ok(relation)
    }
}

impl fmt::Debug for Hydrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hydrator")
            .field("lazy", &self.session.is_some())
            .finish()
    }
}
