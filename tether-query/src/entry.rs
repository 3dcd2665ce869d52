//! Explicit loading of one relation of an already fetched entity.
//!
//! ```rust,ignore
//! let company = session.find::<Company>(1).await?.unwrap();
//! session.entry(&company).collection("users")?.load().await?;
//! session.entry(&user).reference("company")?.load().await?;
//!
//! // Or fill the slot with only the rows matching a filter
//! session
//!     .entry(&company)
//!     .collection("users")?
//!     .load_where(Filter::eq("position_id", 1))
//!     .await?;
//! let managers = company.users.get();
//! ```

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::lazy::LoadState;
use crate::query::Query;
use crate::relations::{LoadStrategy, RelationSpec};
use crate::session::Session;
use crate::traits::Model;

/// The relations of one entity, seen through a session.
#[derive(Debug)]
pub struct Entry<'s, M: Model> {
    session: &'s Session,
    entity: &'s M,
}

impl<'s, M: Model> Entry<'s, M> {
    pub(crate) fn new(session: &'s Session, entity: &'s M) -> Self {
        Self { session, entity }
    }

    /// The entity.
    pub fn entity(&self) -> &'s M {
        self.entity
    }

    fn relation_spec(&self, name: &str) -> QueryResult<&'s RelationSpec> {
        let session: &'s Session = self.session;
        session.schema().spec_of::<M>()?.relation_or_err(name)
    }

    /// Access a many-to-one relation.
    ///
    /// Fails with a configuration error if `name` is unknown or is a collection.
    pub fn reference(&self, name: &str) -> QueryResult<ReferenceEntry<'s, M>> {
        let relation = self.relation_spec(name)?;
        if !relation.relation_type.is_one() {
            return Err(QueryError::configuration(format!(
                "{}.{} is a collection; use collection(\"{}\")",
                M::MODEL_NAME,
                name,
                name
            ))
            .with_model(M::MODEL_NAME)
            .with_field(name));
        }
        Ok(ReferenceEntry {
            session: self.session,
            entity: self.entity,
            relation,
        })
    }

    /// Access a one-to-many relation.
    ///
    /// Fails with a configuration error if `name` is unknown or is a reference.
    pub fn collection(&self, name: &str) -> QueryResult<CollectionEntry<'s, M>> {
        let relation = self.relation_spec(name)?;
        if !relation.relation_type.is_many() {
            return Err(QueryError::configuration(format!(
                "{}.{} is a single reference; use reference(\"{}\")",
                M::MODEL_NAME,
                name,
                name
            ))
            .with_model(M::MODEL_NAME)
            .with_field(name));
        }
        Ok(CollectionEntry {
            session: self.session,
            entity: self.entity,
            relation,
        })
    }

    /// Load a relation of either kind with one fetch.
    pub async fn load(&self, name: &str) -> QueryResult<()> {
        let relation = self.relation_spec(name)?;
        load_one(self.session, self.entity, relation).await
    }

    /// Check if a relation is loaded.
    pub fn is_loaded(&self, name: &str) -> QueryResult<bool> {
        self.relation_spec(name)?;
        Ok(slot_state(self.entity, name) == LoadState::Loaded)
    }
}

async fn load_one<M: Model>(session: &Session, entity: &M, relation: &RelationSpec) -> QueryResult<()> {
    session
        .core()
        .fill(LoadStrategy::Explicit, &[entity], &relation.name)
        .await
}

fn slot_state<M: Model>(entity: &M, name: &str) -> LoadState {
    entity
        .relation(name)
        .map(|slot| slot.state())
        .unwrap_or(LoadState::Unloaded)
}

/// A many-to-one relation of one entity.
#[derive(Debug)]
pub struct ReferenceEntry<'s, M: Model> {
    session: &'s Session,
    entity: &'s M,
    relation: &'s RelationSpec,
}

impl<'s, M: Model> ReferenceEntry<'s, M> {
    /// The relation name.
    pub fn name(&self) -> &str {
        &self.relation.name
    }

    /// Fetch the related entity into the slot.
    ///
    /// A null foreign key resolves to no entity without a fetch. Loading again
    /// fetches again and leaves the slot in the same state.
    pub async fn load(&self) -> QueryResult<()> {
        load_one(self.session, self.entity, self.relation).await
    }

    /// Check if the slot is loaded.
    pub fn is_loaded(&self) -> bool {
        slot_state(self.entity, &self.relation.name) == LoadState::Loaded
    }
}

/// A one-to-many relation of one entity.
#[derive(Debug)]
pub struct CollectionEntry<'s, M: Model> {
    session: &'s Session,
    entity: &'s M,
    relation: &'s RelationSpec,
}

impl<'s, M: Model> CollectionEntry<'s, M> {
    /// The relation name.
    pub fn name(&self) -> &str {
        &self.relation.name
    }

    /// Fetch every related entity into the slot.
    pub async fn load(&self) -> QueryResult<()> {
        load_one(self.session, self.entity, self.relation).await
    }

    /// Fetch the related entities matching `filter` into the slot.
    ///
    /// The fetch is keyed by the foreign key equal to this entity's identity,
    /// so the slot holds the matching subset of the collection. Filter
    /// columns must belong to the related model.
    pub async fn load_where(&self, filter: Filter) -> QueryResult<()> {
        self.session
            .core()
            .fill_where(
                LoadStrategy::Explicit,
                &[self.entity],
                &self.relation.name,
                &filter,
            )
            .await
    }

    /// Check if the slot is loaded.
    pub fn is_loaded(&self) -> bool {
        slot_state(self.entity, &self.relation.name) == LoadState::Loaded
    }

    /// A query of the related entities, pre-filtered to this entity.
    ///
    /// Returns detached entities; use [`load_where`](Self::load_where) to
    /// fill the slot instead.
    pub fn query<U: Model>(&self) -> Query<'s, U> {
        let query = Query::new(self.session);
        if U::MODEL_NAME != self.relation.related_model {
            return query.fail(format!(
                "{}.{} relates to {}, not {}",
                M::MODEL_NAME,
                self.relation.name,
                self.relation.related_model,
                U::MODEL_NAME
            ));
        }
        query.filter(Filter::eq(
            self.relation.foreign_key.as_str(),
            self.entity.id(),
        ))
    }
}
