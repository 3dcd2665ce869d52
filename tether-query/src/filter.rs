//! Filter types for building WHERE clauses.
//!
//! Filters render to SQLite-style `?` placeholders. Column names are quoted and,
//! when the filter is applied inside a join, qualified with the root alias.

use crate::value::Value;

/// A filter condition on the columns of a single model.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (matches everything).
    #[default]
    None,
    /// Column equals value (`IS NULL` for a null value).
    Equals(String, Value),
    /// Column does not equal value (`IS NOT NULL` for a null value).
    NotEquals(String, Value),
    /// Column is one of the values.
    In(String, Vec<Value>),
    /// Column contains the substring.
    Contains(String, Value),
    /// Column is null.
    IsNull(String),
    /// Column is not null.
    IsNotNull(String),
    /// All filters match.
    And(Vec<Filter>),
    /// Any filter matches.
    Or(Vec<Filter>),
    /// Filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an equality filter.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals(column.into(), value.into())
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Every column this filter references.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None => {}
            Self::Equals(col, _)
            | Self::NotEquals(col, _)
            | Self::In(col, _)
            | Self::Contains(col, _)
            | Self::IsNull(col)
            | Self::IsNotNull(col) => out.push(col),
            Self::And(filters) | Self::Or(filters) => {
                for f in filters {
                    f.collect_columns(out);
                }
            }
            Self::Not(inner) => inner.collect_columns(out),
        }
    }

    /// Generate SQL for this filter, appending bound values to `params`.
    ///
    /// `qualifier` is the table alias to prefix columns with, if any.
    pub fn to_sql(&self, qualifier: Option<&str>, params: &mut Vec<Value>) -> String {
        let col = |name: &str| match qualifier {
            Some(alias) => format!("{}.\"{}\"", alias, name),
            None => format!("\"{}\"", name),
        };

        match self {
            Self::None => "1 = 1".to_string(),

            Self::Equals(c, val) => {
                if val.is_null() {
                    format!("{} IS NULL", col(c))
                } else {
                    params.push(val.clone());
                    format!("{} = ?", col(c))
                }
            }
            Self::NotEquals(c, val) => {
                if val.is_null() {
                    format!("{} IS NOT NULL", col(c))
                } else {
                    params.push(val.clone());
                    format!("{} != ?", col(c))
                }
            }

            Self::In(c, values) => {
                if values.is_empty() {
                    return "1 = 0".to_string();
                }
                params.extend(values.iter().cloned());
                let placeholders = vec!["?"; values.len()].join(", ");
                format!("{} IN ({})", col(c), placeholders)
            }

            Self::Contains(c, val) => {
                match val {
                    Value::String(s) => params.push(Value::String(format!("%{}%", s))),
                    other => params.push(other.clone()),
                }
                format!("{} LIKE ?", col(c))
            }

            Self::IsNull(c) => format!("{} IS NULL", col(c)),
            Self::IsNotNull(c) => format!("{} IS NOT NULL", col(c)),

            Self::And(filters) => {
                if filters.is_empty() {
                    return "1 = 1".to_string();
                }
                let parts: Vec<_> = filters.iter().map(|f| f.to_sql(qualifier, params)).collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    return "1 = 0".to_string();
                }
                let parts: Vec<_> = filters.iter().map(|f| f.to_sql(qualifier, params)).collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => {
                let inner = filter.to_sql(qualifier, params);
                format!("NOT ({})", inner)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_equals_filter() {
        let mut params = Vec::new();
        let sql = Filter::eq("company_id", 1i64).to_sql(None, &mut params);
        assert_eq!(sql, "\"company_id\" = ?");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_equals_null_renders_is_null() {
        let mut params = Vec::new();
        let sql = Filter::eq("company_id", Value::Null).to_sql(Some("t0"), &mut params);
        assert_eq!(sql, "t0.\"company_id\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_in_filter() {
        let mut params = Vec::new();
        let filter = Filter::In("id".into(), vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(filter.to_sql(None, &mut params), "\"id\" IN (?, ?)");
        assert_eq!(params.len(), 2);

        let empty = Filter::In("id".into(), vec![]);
        assert_eq!(empty.to_sql(None, &mut params), "1 = 0");
    }

    #[test]
    fn test_and_or_nesting() {
        let filter = Filter::and([
            Filter::eq("name", "Tom"),
            Filter::or([Filter::IsNull("company_id".into()), Filter::eq("company_id", 2i64)]),
        ]);
        let mut params = Vec::new();
        let sql = filter.to_sql(Some("t0"), &mut params);
        assert_eq!(
            sql,
            "(t0.\"name\" = ? AND (t0.\"company_id\" IS NULL OR t0.\"company_id\" = ?))"
        );
        assert_eq!(params, vec![Value::from("Tom"), Value::Int(2)]);
    }

    #[test]
    fn test_and_collapses() {
        assert!(Filter::and([Filter::None, Filter::None]).is_none());
        assert_eq!(
            Filter::and([Filter::None, Filter::eq("id", 1i64)]),
            Filter::eq("id", 1i64)
        );
        let chained = Filter::eq("a", 1i64).and_then(Filter::eq("b", 2i64));
        assert!(matches!(chained, Filter::And(ref v) if v.len() == 2));
    }

    #[test]
    fn test_columns() {
        let filter = Filter::not(Filter::and([
            Filter::eq("name", "Tom"),
            Filter::Contains("email".into(), "x".into()),
        ]));
        assert_eq!(filter.columns(), vec!["name", "email"]);
    }
}
