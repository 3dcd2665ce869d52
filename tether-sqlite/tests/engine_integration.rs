//! Sessions over a real SQLite store.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tether_query::prelude::*;
use tether_query::{ErrorCode, Record};
use tether_sqlite::SqliteEngine;

#[derive(Debug)]
struct City {
    id: i64,
    name: String,
}

impl Model for City {
    const MODEL_NAME: &'static str = "City";

    fn describe() -> ModelSpec {
        ModelSpec::new("City", "cities").column(ColumnSpec::text("name"))
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

    fn from_record(record: Record, _hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
        })
    }

    fn relation(&self, _name: &str) -> Option<&dyn RelationSlot> {
        None
    }
}

#[derive(Debug)]
struct Country {
    id: i64,
    name: String,
    capital_id: i64,
    capital: Reference<City>,
}

impl Country {
    fn new(name: &str, capital_id: i64) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            capital_id,
            capital: Reference::unloaded("capital"),
        }
    }
}

impl Model for Country {
    const MODEL_NAME: &'static str = "Country";

    fn describe() -> ModelSpec {
        ModelSpec::new("Country", "countries")
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::foreign_key("capital_id", "City"))
            .relation(RelationSpec::many_to_one("capital", "City"))
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
            "capital_id" => self.capital_id.into(),
            _ => Value::Null,
        }
    }

    fn from_record(mut record: Record, hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
            capital_id: record.get_i64("capital_id")?,
            capital: hydrator.reference(&mut record, "capital")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "capital" => Some(&self.capital),
            _ => None,
        }
    }
}

async fn setup(url: &str, lazy: bool) -> (Arc<SqliteEngine>, SessionFactory) {
    let engine = Arc::new(SqliteEngine::connect(url).await.unwrap());
    let factory = SessionFactory::builder(engine.clone())
        .register::<Country>()
        .register::<City>()
        .lazy_loading(lazy)
        .build()
        .unwrap();
    engine.recreate(factory.schema()).await.unwrap();
    (engine, factory)
}

async fn seed(factory: &SessionFactory) {
    let session = factory.open();
    let mut washington = City {
        id: 0,
        name: "Washington".into(),
    };
    session.add(&mut washington).await.unwrap();
    session
        .add(&mut Country::new("USA", washington.id))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_eager_include_through_sqlite() {
    let (_engine, factory) = setup("sqlite::memory:", false).await;
    seed(&factory).await;

    let session = factory.open();
    let countries = session
        .query::<Country>()
        .include("capital")
        .all()
        .await
        .unwrap();

    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].capital.get().unwrap().name, "Washington");
    assert_eq!(session.fetch_count(), 1);
}

#[tokio::test]
async fn test_lazy_reference_through_sqlite() {
    let (_engine, factory) = setup("sqlite::memory:", true).await;
    seed(&factory).await;

    let session = factory.open();
    let usa = session.find::<Country>(1).await.unwrap().unwrap();
    assert_eq!(usa.capital.load().await.unwrap().unwrap().name, "Washington");
    assert_eq!(session.stats().lazy_fetches, 1);
}

#[tokio::test]
async fn test_missing_capital_is_rejected() {
    let (_engine, factory) = setup("sqlite::memory:", false).await;
    let session = factory.open();

    let err = session
        .add(&mut Country::new("Atlantis", 42))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ForeignKeyConstraint);
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn test_recreate_file_database_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("geo.db").display());

    let (engine, factory) = setup(&url, false).await;
    seed(&factory).await;
    engine.recreate(factory.schema()).await.unwrap();
    seed(&factory).await;

    let session = factory.open();
    let countries = session.query::<Country>().all().await.unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].id, 1);
}
