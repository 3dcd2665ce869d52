//! Single-statement join planning for eager loading.
//!
//! An include tree is validated against the [`Schema`] and turned into one
//! `SELECT ... LEFT JOIN ...` statement. Every table gets an alias (`t0` for
//! the root, then `t1`, `t2`, ... in depth-first order) and every column is
//! labelled `{alias}__{column}`, so the flat result rows can be folded back
//! into a tree of [`Record`]s.

use indexmap::IndexMap;
use tracing::trace;

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::record::{Loaded, Record};
use crate::row::Row;
use crate::types::OrderByField;
use crate::value::Value;

use super::include::{Include, IncludeSpec};
use super::spec::{ModelSpec, PRIMARY_KEY, RelationType, Schema};

/// Root-level filtering, ordering, and pagination of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectArgs {
    /// WHERE condition on root columns.
    pub filter: Filter,
    /// Root ordering, applied before the identity tiebreaker.
    pub order_by: Vec<OrderByField>,
    /// Maximum number of roots.
    pub take: Option<u64>,
    /// Number of roots to skip.
    pub skip: Option<u64>,
}

impl SelectArgs {
    /// Check if the root needs to be paginated.
    pub fn is_paginated(&self) -> bool {
        self.take.is_some() || self.skip.is_some()
    }
}

#[derive(Debug, Clone)]
struct Node {
    alias: String,
    model: String,
    columns: Vec<String>,
    children: Vec<Edge>,
}

#[derive(Debug, Clone)]
struct Edge {
    relation: String,
    relation_type: RelationType,
    node: Node,
}

fn label(alias: &str, column: &str) -> String {
    format!("{}__{}", alias, column)
}

/// A validated eager-loading statement and the shape needed to read it back.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    root: Node,
    sql: String,
    params: Vec<Value>,
}

impl JoinPlan {
    /// Plan a query of `root_model` with `include` loaded eagerly.
    ///
    /// Fails with a configuration error for an unknown model, relation, or
    /// column. Nothing is fetched.
    pub fn build(
        schema: &Schema,
        root_model: &str,
        include: &Include,
        args: &SelectArgs,
    ) -> QueryResult<Self> {
        let root_spec = schema.model(root_model)?;

        for column in args.filter.columns() {
            if !root_spec.has_column(column) {
                return Err(QueryError::invalid_filter(root_model, column));
            }
        }
        for order in &args.order_by {
            if !root_spec.has_column(&order.column) {
                return Err(QueryError::invalid_filter(root_model, &order.column)
                    .with_context("Validating ORDER BY"));
            }
        }

        let mut joins = Vec::new();
        let mut counter = 0;
        let root = plan_node(
            schema,
            root_spec,
            include.specs(),
            "",
            &mut counter,
            &mut joins,
        )?;

        let mut select = Vec::new();
        let mut tiebreakers = Vec::new();
        collect_columns(&root, &mut select, &mut tiebreakers);

        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM ", select.join(", "));

        if args.is_paginated() {
            sql.push_str(&format!("(SELECT * FROM \"{}\"", root_spec.table));
            if !args.filter.is_none() {
                sql.push_str(" WHERE ");
                sql.push_str(&args.filter.to_sql(None, &mut params));
            }
            let mut inner_order: Vec<_> = args.order_by.iter().map(|o| o.to_sql(None)).collect();
            inner_order.push(format!("\"{}\" ASC", PRIMARY_KEY));
            sql.push_str(" ORDER BY ");
            sql.push_str(&inner_order.join(", "));

            // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
            let limit = args.take.map(|n| n as i64).unwrap_or(-1);
            sql.push_str(" LIMIT ?");
            params.push(Value::Int(limit));
            if let Some(skip) = args.skip {
                sql.push_str(" OFFSET ?");
                params.push(Value::Int(skip as i64));
            }
            sql.push_str(&format!(") AS {}", root.alias));
        } else {
            sql.push_str(&format!("\"{}\" AS {}", root_spec.table, root.alias));
        }

        for join in &joins {
            sql.push(' ');
            sql.push_str(join);
        }

        if !args.is_paginated() && !args.filter.is_none() {
            sql.push_str(" WHERE ");
            sql.push_str(&args.filter.to_sql(Some(&root.alias), &mut params));
        }

        let mut order: Vec<_> = args
            .order_by
            .iter()
            .map(|o| o.to_sql(Some(&root.alias)))
            .collect();
        order.extend(tiebreakers);
        sql.push_str(" ORDER BY ");
        sql.push_str(&order.join(", "));

        trace!(model = root_model, tables = counter, sql = %sql, "Planned eager query");

        Ok(Self { root, sql, params })
    }

    /// The planned statement.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters, in placeholder order.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Fold joined rows into de-duplicated root records with their included relations.
    ///
    /// Roots keep their first-appearance order; collections are ordered by
    /// ascending identity because the statement orders every alias by `id`.
    pub fn hydrate(&self, rows: Vec<Row>) -> QueryResult<Vec<Record>> {
        let mut roots: IndexMap<i64, Draft> = IndexMap::new();
        let id_label = label(&self.root.alias, PRIMARY_KEY);

        for row in &rows {
            let id = row.get_i64(&id_label)?;
            let draft = roots
                .entry(id)
                .or_insert_with(|| Draft::from_row(&self.root, row));
            absorb(&self.root, draft, row)?;
        }

        Ok(roots.into_values().map(Draft::finish).collect())
    }
}

fn plan_node<'s>(
    schema: &Schema,
    spec: &ModelSpec,
    includes: impl Iterator<Item = &'s IncludeSpec>,
    path: &str,
    counter: &mut usize,
    joins: &mut Vec<String>,
) -> QueryResult<Node> {
    let alias = format!("t{}", counter);
    *counter += 1;

    let mut children = Vec::new();
    for include in includes {
        let full_path = if path.is_empty() {
            include.relation_name.clone()
        } else {
            format!("{}.{}", path, include.relation_name)
        };

        let relation = spec
            .get_relation(&include.relation_name)
            .ok_or_else(|| {
                QueryError::unknown_relation(&spec.name, &include.relation_name)
                    .with_context(format!("Resolving include path '{}'", full_path))
            })?;
        let related = schema.model(&relation.related_model)?;

        let child_alias = format!("t{}", counter);
        let on = match relation.relation_type {
            RelationType::ManyToOne => format!(
                "{}.\"{}\" = {}.\"{}\"",
                child_alias, PRIMARY_KEY, alias, relation.foreign_key
            ),
            RelationType::OneToMany => format!(
                "{}.\"{}\" = {}.\"{}\"",
                child_alias, relation.foreign_key, alias, PRIMARY_KEY
            ),
        };
        joins.push(format!(
            "LEFT JOIN \"{}\" AS {} ON {}",
            related.table, child_alias, on
        ));

        let node = plan_node(
            schema,
            related,
            include.nested_specs(),
            &full_path,
            counter,
            joins,
        )?;
        children.push(Edge {
            relation: relation.name.clone(),
            relation_type: relation.relation_type,
            node,
        });
    }

    Ok(Node {
        alias,
        model: spec.name.clone(),
        columns: spec.column_names().map(str::to_string).collect(),
        children,
    })
}

fn collect_columns(node: &Node, select: &mut Vec<String>, order: &mut Vec<String>) {
    for column in &node.columns {
        select.push(format!(
            "{}.\"{}\" AS \"{}\"",
            node.alias,
            column,
            label(&node.alias, column)
        ));
    }
    order.push(format!("{}.\"{}\" ASC", node.alias, PRIMARY_KEY));
    for edge in &node.children {
        collect_columns(&edge.node, select, order);
    }
}

struct Draft {
    record: Record,
    slots: IndexMap<String, DraftSlot>,
}

enum DraftSlot {
    One(Option<Box<Draft>>),
    Many(IndexMap<i64, Draft>),
}

impl Draft {
    fn from_row(node: &Node, row: &Row) -> Self {
        let values = node
            .columns
            .iter()
            .map(|column| {
                let value = row
                    .get(&label(&node.alias, column))
                    .cloned()
                    .unwrap_or(Value::Null);
                (column.clone(), value)
            })
            .collect();
        Self {
            record: Record::new(&node.model, values),
            slots: IndexMap::new(),
        }
    }

    fn finish(self) -> Record {
        let mut record = self.record;
        for (name, slot) in self.slots {
            let loaded = match slot {
                DraftSlot::One(draft) => Loaded::One(draft.map(|d| Box::new(d.finish()))),
                DraftSlot::Many(drafts) => {
                    Loaded::Many(drafts.into_values().map(Draft::finish).collect())
                }
            };
            record.relations.insert(name, loaded);
        }
        record
    }
}

fn absorb(node: &Node, draft: &mut Draft, row: &Row) -> QueryResult<()> {
    for edge in &node.children {
        let id = row.get_opt_i64(&label(&edge.node.alias, PRIMARY_KEY))?;

        // The slot exists even without a match so the relation reads as loaded.
        let slot = draft
            .slots
            .entry(edge.relation.clone())
            .or_insert_with(|| match edge.relation_type {
                RelationType::ManyToOne => DraftSlot::One(None),
                RelationType::OneToMany => DraftSlot::Many(IndexMap::new()),
            });

        let Some(id) = id else { continue };

        let child: &mut Draft = match slot {
            DraftSlot::One(existing) => {
                &mut **existing.get_or_insert_with(|| Box::new(Draft::from_row(&edge.node, row)))
            }
            DraftSlot::Many(drafts) => drafts
                .entry(id)
                .or_insert_with(|| Draft::from_row(&edge.node, row)),
        };
        absorb(&edge.node, child, row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::relations::spec::{ColumnSpec, RelationSpec};
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::builder()
            .model(ModelSpec::new("City", "cities").column(ColumnSpec::text("name")))
            .model(
                ModelSpec::new("Country", "countries")
                    .column(ColumnSpec::text("name"))
                    .column(ColumnSpec::foreign_key("capital_id", "City"))
                    .relation(RelationSpec::many_to_one("capital", "City")),
            )
            .model(
                ModelSpec::new("Company", "companies")
                    .column(ColumnSpec::text("name"))
                    .column(ColumnSpec::foreign_key("country_id", "Country").nullable())
                    .relation(RelationSpec::many_to_one("country", "Country"))
                    .relation(RelationSpec::one_to_many("users", "User").foreign_key("company_id")),
            )
            .model(
                ModelSpec::new("User", "users")
                    .column(ColumnSpec::text("name"))
                    .column(ColumnSpec::foreign_key("company_id", "Company").nullable())
                    .relation(RelationSpec::many_to_one("company", "Company")),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_plain_query() {
        let plan = JoinPlan::build(&schema(), "City", &Include::new(), &SelectArgs::default())
            .unwrap();
        assert_eq!(
            plan.sql(),
            "SELECT t0.\"id\" AS \"t0__id\", t0.\"name\" AS \"t0__name\" \
             FROM \"cities\" AS t0 ORDER BY t0.\"id\" ASC"
        );
        assert!(plan.params().is_empty());
    }

    #[test]
    fn test_nested_join_sql() {
        let include = Include::new().add_path("company.country.capital");
        let plan = JoinPlan::build(&schema(), "User", &include, &SelectArgs::default()).unwrap();
        let sql = plan.sql();

        assert!(sql.contains("FROM \"users\" AS t0"));
        assert!(sql.contains("LEFT JOIN \"companies\" AS t1 ON t1.\"id\" = t0.\"company_id\""));
        assert!(sql.contains("LEFT JOIN \"countries\" AS t2 ON t2.\"id\" = t1.\"country_id\""));
        assert!(sql.contains("LEFT JOIN \"cities\" AS t3 ON t3.\"id\" = t2.\"capital_id\""));
        assert!(sql.contains("t3.\"name\" AS \"t3__name\""));
        assert!(sql.ends_with(
            "ORDER BY t0.\"id\" ASC, t1.\"id\" ASC, t2.\"id\" ASC, t3.\"id\" ASC"
        ));
    }

    #[test]
    fn test_one_to_many_join() {
        let include = Include::new().add_path("users");
        let plan = JoinPlan::build(&schema(), "Company", &include, &SelectArgs::default()).unwrap();
        assert!(plan
            .sql()
            .contains("LEFT JOIN \"users\" AS t1 ON t1.\"company_id\" = t0.\"id\""));
    }

    #[test]
    fn test_filter_and_pagination() {
        let args = SelectArgs {
            filter: Filter::eq("name", "Tom"),
            order_by: vec![OrderByField::desc("name")],
            take: Some(2),
            skip: Some(1),
        };
        let include = Include::new().add_path("company");
        let plan = JoinPlan::build(&schema(), "User", &include, &args).unwrap();

        assert!(plan.sql().contains(
            "FROM (SELECT * FROM \"users\" WHERE \"name\" = ? \
             ORDER BY \"name\" DESC, \"id\" ASC LIMIT ? OFFSET ?) AS t0"
        ));
        assert!(plan
            .sql()
            .ends_with("ORDER BY t0.\"name\" DESC, t0.\"id\" ASC, t1.\"id\" ASC"));
        assert_eq!(
            plan.params(),
            &[Value::from("Tom"), Value::Int(2), Value::Int(1)]
        );
    }

    #[test]
    fn test_skip_without_take() {
        let args = SelectArgs {
            skip: Some(3),
            ..SelectArgs::default()
        };
        let plan = JoinPlan::build(&schema(), "City", &Include::new(), &args).unwrap();
        assert!(plan.sql().contains("LIMIT ? OFFSET ?"));
        assert_eq!(plan.params(), &[Value::Int(-1), Value::Int(3)]);
    }

    #[test]
    fn test_unknown_relation() {
        let include = Include::new().add_path("company.ceo");
        let err = JoinPlan::build(&schema(), "User", &include, &SelectArgs::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownRelation);
        assert!(err.context.operation.unwrap().contains("company.ceo"));
    }

    #[test]
    fn test_unknown_filter_column() {
        let args = SelectArgs {
            filter: Filter::eq("email", "x"),
            ..SelectArgs::default()
        };
        let err = JoinPlan::build(&schema(), "User", &Include::new(), &args).unwrap_err();
        assert!(err.is_configuration());
    }

    fn joined_row(company: (i64, &str), user: Option<(i64, &str)>) -> Row {
        let (uid, uname) = match user {
            Some((id, name)) => (Value::Int(id), Value::from(name)),
            None => (Value::Null, Value::Null),
        };
        Row::new()
            .with("t0__id", company.0)
            .with("t0__name", company.1)
            .with("t0__country_id", Value::Null)
            .with("t1__id", uid)
            .with("t1__name", uname)
            .with("t1__company_id", company.0)
    }

    #[test]
    fn test_hydrate_dedupes_roots() {
        let include = Include::new().add_path("users");
        let plan = JoinPlan::build(&schema(), "Company", &include, &SelectArgs::default()).unwrap();

        let rows = vec![
            joined_row((1, "Microsoft"), Some((1, "Tom"))),
            joined_row((1, "Microsoft"), Some((3, "Alice"))),
            joined_row((2, "Google"), Some((2, "Bob"))),
            joined_row((2, "Google"), Some((4, "Kate"))),
            joined_row((3, "Empty"), None),
        ];
        let records = plan.hydrate(rows).unwrap();
        assert_eq!(records.len(), 3);

        let names = |record: &Record| match &record.relations["users"] {
            Loaded::Many(users) => users
                .iter()
                .map(|u| u.get_string("name").unwrap())
                .collect::<Vec<_>>(),
            Loaded::One(_) => panic!("expected a collection"),
        };
        assert_eq!(names(&records[0]), vec!["Tom", "Alice"]);
        assert_eq!(names(&records[1]), vec!["Bob", "Kate"]);
        assert!(names(&records[2]).is_empty());
    }
}
