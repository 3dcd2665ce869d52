//! The lab schema: users work for companies in countries with capitals.

use tether_query::prelude::*;
use tether_query::session::SessionFactoryBuilder;

/// Register every lab model with a factory builder.
pub fn register(builder: SessionFactoryBuilder) -> SessionFactoryBuilder {
    builder
        .register::<City>()
        .register::<Country>()
        .register::<Company>()
        .register::<Position>()
        .register::<User>()
}

/// The capital of a country.
#[derive(Debug)]
pub struct City {
    pub id: i64,
    pub name: String,
}

impl City {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
        }
    }
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

/// A country, with its capital and the companies registered there.
#[derive(Debug)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital_id: i64,
    pub capital: Reference<City>,
    pub companies: Collection<Company>,
}

impl Country {
    pub fn new(name: &str, capital: &City) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            capital_id: capital.id,
            capital: Reference::unloaded("capital"),
            companies: Collection::unloaded("companies"),
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
            .relation(RelationSpec::one_to_many("companies", "Company").foreign_key("country_id"))
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
            companies: hydrator.collection(&mut record, "companies")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "capital" => Some(&self.capital),
            "companies" => Some(&self.companies),
            _ => None,
        }
    }
}

/// A company and its employees.
#[derive(Debug)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub country_id: Option<i64>,
    pub country: Reference<Country>,
    pub users: Collection<User>,
}

impl Company {
    pub fn new(name: &str, country: Option<&Country>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            country_id: country.map(|c| c.id),
            country: Reference::unloaded("country"),
            users: Collection::unloaded("users"),
        }
    }
}

impl Model for Company {
    const MODEL_NAME: &'static str = "Company";

    fn describe() -> ModelSpec {
        ModelSpec::new("Company", "companies")
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::foreign_key("country_id", "Country").nullable())
            .relation(RelationSpec::many_to_one("country", "Country"))
            .relation(RelationSpec::one_to_many("users", "User").foreign_key("company_id"))
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
            "country_id" => self.country_id.into(),
            _ => Value::Null,
        }
    }

    fn from_record(mut record: Record, hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
            country_id: record.get_opt_i64("country_id")?,
            country: hydrator.reference(&mut record, "country")?,
            users: hydrator.collection(&mut record, "users")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "country" => Some(&self.country),
            "users" => Some(&self.users),
            _ => None,
        }
    }
}

/// A job title.
#[derive(Debug)]
pub struct Position {
    pub id: i64,
    pub name: String,
    pub users: Collection<User>,
}

impl Position {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            users: Collection::unloaded("users"),
        }
    }
}

impl Model for Position {
    const MODEL_NAME: &'static str = "Position";

    fn describe() -> ModelSpec {
        ModelSpec::new("Position", "positions")
            .column(ColumnSpec::text("name"))
            .relation(RelationSpec::one_to_many("users", "User").foreign_key("position_id"))
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
            users: hydrator.collection(&mut record, "users")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "users" => Some(&self.users),
            _ => None,
        }
    }
}

/// An employee.
#[derive(Debug)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub company_id: Option<i64>,
    pub position_id: Option<i64>,
    pub company: Reference<Company>,
    pub position: Reference<Position>,
}

impl User {
    pub fn new(name: &str, company: Option<&Company>, position: Option<&Position>) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            company_id: company.map(|c| c.id),
            position_id: position.map(|p| p.id),
            company: Reference::unloaded("company"),
            position: Reference::unloaded("position"),
        }
    }
}

impl Model for User {
    const MODEL_NAME: &'static str = "User";

    fn describe() -> ModelSpec {
        ModelSpec::new("User", "users")
            .column(ColumnSpec::text("name"))
            .column(ColumnSpec::foreign_key("company_id", "Company").nullable())
            .column(ColumnSpec::foreign_key("position_id", "Position").nullable())
            .relation(RelationSpec::many_to_one("company", "Company"))
            .relation(RelationSpec::many_to_one("position", "Position"))
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
            "company_id" => self.company_id.into(),
            "position_id" => self.position_id.into(),
            _ => Value::Null,
        }
    }

    fn from_record(mut record: Record, hydrator: &Hydrator) -> QueryResult<Self> {
        Ok(Self {
            id: record.id()?,
            name: record.get_string("name")?,
            company_id: record.get_opt_i64("company_id")?,
            position_id: record.get_opt_i64("position_id")?,
            company: hydrator.reference(&mut record, "company")?,
            position: hydrator.reference(&mut record, "position")?,
        })
    }

    fn relation(&self, name: &str) -> Option<&dyn RelationSlot> {
        match name {
            "company" => Some(&self.company),
            "position" => Some(&self.position),
            _ => None,
        }
    }
}
