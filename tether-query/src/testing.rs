//! Fixtures shared by the unit tests: a scripted engine and two small models.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use parking_lot::Mutex;

use crate::error::QueryResult;
use crate::lazy::{Collection, Hydrator, Reference, RelationSlot};
use crate::record::Record;
use crate::relations::{ColumnSpec, ModelSpec, RelationSpec};
use crate::row::Row;
use crate::session::SessionFactory;
use crate::traits::{BoxFuture, Model, QueryEngine};
use crate::value::Value;

/// Engine that records every statement and replays queued result sets.
#[derive(Default)]
pub struct MockEngine {
    responses: Mutex<VecDeque<Vec<Row>>>,
    log: Mutex<Vec<(String, Vec<Value>)>>,
    next_id: AtomicI64,
    stalled: AtomicBool,
}

impl MockEngine {
    pub fn respond(&self, rows: Vec<Row>) {
        self.responses.lock().push_back(rows);
    }

    /// Make later reads never complete until switched back.
    pub fn stall(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn params(&self, index: usize) -> Vec<Value> {
        self.log.lock()[index].1.clone()
    }
}

impl QueryEngine for MockEngine {
    fn query(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        self.log.lock().push((sql.to_string(), params));
        if self.stalled.load(Ordering::SeqCst) {
            return Box::pin(futures::future::pending());
        }
        let rows = self.responses.lock().pop_front().unwrap_or_default();
        Box::pin(async move { Ok(rows) })
    }

    fn execute(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<u64>> {
        self.log.lock().push((sql.to_string(), params));
        Box::pin(async { Ok(0) })
    }

    fn insert(&self, sql: &str, params: Vec<Value>) -> BoxFuture<'_, QueryResult<i64>> {
        self.log.lock().push((sql.to_string(), params));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Box::pin(async move { Ok(id) })
    }

    fn execute_batch(&self, sql: &str) -> BoxFuture<'_, QueryResult<()>> {
        self.log.lock().push((sql.to_string(), Vec::new()));
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub members: Collection<Member>,
}

impl Model for Team {
    const MODEL_NAME: &'static str = "Team";

    fn describe() -> ModelSpec {
        ModelSpec::new("Team", "teams")
            .column(ColumnSpec::text("name"))
            .relation(RelationSpec::one_to_many("members", "Member").foreign_key("team_id"))
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            _ => Value::Null,
        }
    }

    fn from_record(mut record: Record, hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
            members: hydrator.collection(&mut record, "members")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "members" => Some(&self.members),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub team_id: Option<i64>,
    pub team: Reference<Team>,
}

impl Member {
    pub fn new(name: &str, team_id: Option<i64>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            team_id,
            team: Reference::unloaded("team"),
        }
    }
}

impl Model for Member {
    const MODEL_NAME: &'static str = "Member";

    fn describe() -> ModelSpec {
        ModelSpec::new("Member", "members")
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::foreign_key("team_id", "Team").nullable())
            .relation(RelationSpec::many_to_one("team", "Team"))
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => self.id.into(),
            "name" => self.name.as_str().into(),
            "team_id" => self.team_id.into(),
            _ => Value::Null,
        }
    }

    fn from_record(mut record: Record, hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
            team_id: record.get_opt_i64("team_id")?,
            team: hydrator.reference(&mut record, "team")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "team" => Some(&self.team),
            _ => None,
        }
    }
}

pub fn factory(lazy: bool) -> (Arc<MockEngine>, SessionFactory) {
    let engine = Arc::new(MockEngine::default());
    let factory = SessionFactory::builder(engine.clone())
        .register::<Team>()
        .register::<Member>()
        .lazy_loading(lazy)
        .build()
        .unwrap();
    (engine, factory)
}

pub fn member_row(id: i64, name: &str, team_id: Option<i64>) -> Row {
    Row::new()
        .with("t0__id", id)
        .with("t0__name", name)
        .with("t0__team_id", team_id)
}

pub fn team_row(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}
