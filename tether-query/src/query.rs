//! Root queries with eager relation loading.

use std::fmt;
use std::marker::PhantomData;

use tracing::{Level, debug, trace};

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::relations::{Include, IncludeSpec, JoinPlan, LoadStrategy, SelectArgs};
use crate::session::Session;
use crate::traits::Model;
use crate::types::OrderByField;
use crate::value::Value;

/// A query of root entities of type `M`.
///
/// Built fluently and executed with [`Query::all`] or [`Query::first`]. Every
/// included relation path is fetched in the same statement as the roots.
///
/// ```rust,ignore
/// let users = session
///     .query::<User>()
///     .include("company")
///     .then_include("country")
///     .then_include("capital")
///     .include("position")
///     .all()
///     .await?;
/// ```
///
/// Invalid includes, filters, and orderings are reported by `all`, `first`,
/// and `to_sql` before anything is fetched.
pub struct Query<'s, M: Model> {
    session: &'s Session,
    include: Include,
    cursor: Vec<String>,
    args: SelectArgs,
    error: Option<String>,
    _model: PhantomData<fn() -> M>,
}

impl<'s, M: Model> Query<'s, M> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self {
            session,
            include: Include::new(),
            cursor: Vec::new(),
            args: SelectArgs::default(),
            error: None,
            _model: PhantomData,
        }
    }

    pub(crate) fn fail(mut self, message: impl Into<String>) -> Self {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
        self
    }

    /// Include a relation of the root.
    ///
    /// Subsequent [`then_include`](Self::then_include) calls extend this path.
    pub fn include(mut self, relation: &str) -> Self {
        self.cursor = vec![relation.to_string()];
        self.include.insert(IncludeSpec::new(relation));
        self
    }

    /// Include a relation of the last included relation.
    pub fn then_include(mut self, relation: &str) -> Self {
        if self.cursor.is_empty() {
            return self.fail(format!(
                "then_include(\"{}\") must follow include()",
                relation
            ));
        }
        self.cursor.push(relation.to_string());
        if let Some(spec) = IncludeSpec::from_segments(&self.cursor) {
            self.include.insert(spec);
        }
        self
    }

    /// Include a dotted path such as `company.country.capital`.
    pub fn include_path(mut self, path: &str) -> Self {
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.trim().is_empty()) {
            return self.fail(format!("Malformed include path '{}'", path));
        }
        if let Some(spec) = IncludeSpec::from_segments(&segments) {
            self.include.insert(spec);
        }
        self.cursor = segments;
        self
    }

    /// Add a filter on root columns (combined with AND).
    pub fn filter(mut self, filter: Filter) -> Self {
        self.args.filter = std::mem::take(&mut self.args.filter).and_then(filter);
        self
    }

    /// Add an equality filter on a root column.
    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// Order roots by a column. Identity order always applies last.
    pub fn order_by(mut self, order: OrderByField) -> Self {
        self.args.order_by.push(order);
        self
    }

    /// Return at most `n` roots.
    pub fn take(mut self, n: u64) -> Self {
        self.args.take = Some(n);
        self
    }

    /// Skip the first `n` roots.
    pub fn skip(mut self, n: u64) -> Self {
        self.args.skip = Some(n);
        self
    }

    /// The relations included so far.
    pub fn includes(&self) -> &Include {
        &self.include
    }

    fn plan(&self) -> QueryResult<JoinPlan> {
        if let Some(ref message) = self.error {
            return Err(QueryError::invalid_include(M::MODEL_NAME, message.clone()));
        }
        JoinPlan::build(
            self.session.schema(),
            M::MODEL_NAME,
            &self.include,
            &self.args,
        )
    }

    /// The statement this query would run, for inspection.
    pub fn to_sql(&self) -> QueryResult<String> {
        Ok(self.plan()?.sql().to_string())
    }

    /// Run the query and return every root.
    pub async fn all(self) -> QueryResult<Vec<M>> {
        let plan = self.plan()?;
        let core = self.session.core();
        let strategy = (!self.include.is_empty()).then_some(LoadStrategy::Eager);

        let rows = core
            .fetch(strategy, plan.sql(), plan.params().to_vec())
            .await
            .map_err(|e| e.with_sql(plan.sql()))?;
        let records = plan.hydrate(rows)?;
        if tracing::enabled!(Level::TRACE) {
            for record in &records {
                trace!(model = M::MODEL_NAME, record = %record.to_json(), "Hydrated record");
            }
        }

        debug!(
            model = M::MODEL_NAME,
            roots = records.len(),
            includes = ?self.include.paths(),
            "Query complete"
        );

        let hydrator = core.hydrator();
        records
            .into_iter()
            .map(|record| M::from_record(record, &hydrator))
            .collect()
    }

    /// Run the query and return the first root, if any.
    pub async fn first(self) -> QueryResult<Option<M>> {
        Ok(self.take(1).all().await?.into_iter().next())
    }
}

impl<M: Model> Clone for Query<'_, M> {
    fn clone(&self) -> Self {
        Self {
            session: self.session,
            include: self.include.clone(),
            cursor: self.cursor.clone(),
            args: self.args.clone(),
            error: self.error.clone(),
            _model: PhantomData,
        }
    }
}

impl<M: Model> fmt::Debug for Query<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("model", &M::MODEL_NAME)
            .field("include", &self.include.paths())
            .field("args", &self.args)
            .finish()
    }
}
