//! Table creation and removal for a validated schema.
//!
//! Only whole tables are created or dropped; there is no diffing or versioning.

use tether_query::relations::{ColumnSpec, ModelSpec, PRIMARY_KEY, Schema};
use tether_query::QueryResult;

/// Generates SQLite DDL for the models of a [`Schema`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDdl;

impl SqliteDdl {
    /// `CREATE TABLE` statements, referenced tables first.
    pub fn create_all(&self, schema: &Schema) -> QueryResult<String> {
        let mut statements = Vec::new();
        for model in schema.creation_order() {
            statements.push(self.create_table(schema, model)?);
        }
        Ok(statements.join("\n"))
    }

    /// `DROP TABLE` statements, referencing tables first.
    pub fn drop_all(&self, schema: &Schema) -> String {
        schema
            .creation_order()
            .rev()
            .map(|model| self.drop_table(&model.table))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Generate a CREATE TABLE statement.
    pub fn create_table(&self, schema: &Schema, model: &ModelSpec) -> QueryResult<String> {
        let mut columns = Vec::with_capacity(model.columns.len());
        for column in &model.columns {
            columns.push(self.column_definition(schema, column)?);
        }

        Ok(format!(
            "CREATE TABLE \"{}\" (\n    {}\n);",
            model.table,
            columns.join(",\n    ")
        ))
    }

    /// Generate a column definition.
    ///
    /// The identity is an `INTEGER PRIMARY KEY`, i.e. an alias of the rowid,
    /// so the store assigns it on insert.
    fn column_definition(&self, schema: &Schema, column: &ColumnSpec) -> QueryResult<String> {
        if column.name == PRIMARY_KEY {
            return Ok(format!("\"{}\" INTEGER PRIMARY KEY", column.name));
        }

        let mut parts = vec![
            format!("\"{}\"", column.name),
            column.column_type.as_sql().to_string(),
        ];

        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        if let Some(ref target) = column.references {
            let target = schema.model(target)?;
            parts.push(format!(
                "REFERENCES \"{}\" (\"{}\")",
                target.table, PRIMARY_KEY
            ));
        }

        Ok(parts.join(" "))
    }

    /// Generate a DROP TABLE statement.
    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS \"{}\";", table)
    }
}
