//! Include specifications for eager loading relations.

use indexmap::IndexMap;

/// Specification for including a relation in a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeSpec {
    /// Name of the relation to include.
    pub relation_name: String,
    /// Nested includes, in the order they were requested.
    pub nested: IndexMap<String, IncludeSpec>,
}

impl IncludeSpec {
    /// Create a new include spec for a relation.
    pub fn new(relation_name: impl Into<String>) -> Self {
        Self {
            relation_name: relation_name.into(),
            nested: IndexMap::new(),
        }
    }

    /// Include a nested relation.
    pub fn include(mut self, nested: IncludeSpec) -> Self {
        merge_into(&mut self.nested, nested);
        self
    }

    /// Check if there are nested includes.
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }

    /// Get all nested include specs.
    pub fn nested_specs(&self) -> impl Iterator<Item = &IncludeSpec> {
        self.nested.values()
    }

    /// Build a chain of specs from path segments (`["company", "country"]`).
    ///
    /// Returns `None` for an empty path.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Option<Self> {
        let (last, rest) = segments.split_last()?;
        let mut spec = IncludeSpec::new(last.as_ref());
        for segment in rest.iter().rev() {
            spec = IncludeSpec::new(segment.as_ref()).include(spec);
        }
        Some(spec)
    }

    fn merge(&mut self, other: IncludeSpec) {
        for (_, nested) in other.nested {
            merge_into(&mut self.nested, nested);
        }
    }
}

fn merge_into(map: &mut IndexMap<String, IncludeSpec>, spec: IncludeSpec) {
    match map.get_mut(&spec.relation_name) {
        Some(existing) => existing.merge(spec),
        None => {
            map.insert(spec.relation_name.clone(), spec);
        }
    }
}

/// The set of relations to load eagerly with a query.
///
/// Adding the same relation twice merges the nested trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Include {
    specs: IndexMap<String, IncludeSpec>,
}

impl Include {
    /// Create a new empty include set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation to include.
    pub fn add(mut self, spec: IncludeSpec) -> Self {
        self.insert(spec);
        self
    }

    /// Add a relation to include in place.
    pub fn insert(&mut self, spec: IncludeSpec) {
        merge_into(&mut self.specs, spec);
    }

    /// Add a dotted path such as `company.country.capital`.
    ///
    /// Segments are not validated here; the join planner checks them against the schema.
    pub fn add_path(mut self, path: &str) -> Self {
        let segments: Vec<&str> = path.split('.').collect();
        if let Some(spec) = IncludeSpec::from_segments(&segments) {
            self.insert(spec);
        }
        self
    }

    /// Get an include spec by relation name.
    pub fn get(&self, relation: &str) -> Option<&IncludeSpec> {
        self.specs.get(relation)
    }

    /// Check if a relation is included.
    pub fn contains(&self, relation: &str) -> bool {
        self.specs.contains_key(relation)
    }

    /// Get all include specs.
    pub fn specs(&self) -> impl Iterator<Item = &IncludeSpec> {
        self.specs.values()
    }

    /// Check if there are any includes.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Get the number of top-level includes.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Every included path in dotted form, depth first.
    pub fn paths(&self) -> Vec<String> {
        fn walk(prefix: &str, spec: &IncludeSpec, out: &mut Vec<String>) {
            let path = if prefix.is_empty() {
                spec.relation_name.clone()
            } else {
                format!("{}.{}", prefix, spec.relation_name)
            };
            out.push(path.clone());
            for nested in spec.nested_specs() {
                walk(&path, nested, out);
            }
        }

        let mut out = Vec::new();
        for spec in self.specs() {
            walk("", spec, &mut out);
        }
        out
    }
}

impl From<IncludeSpec> for Include {
    fn from(spec: IncludeSpec) -> Self {
        Self::new().add(spec)
    }
}

impl FromIterator<IncludeSpec> for Include {
    fn from_iter<T: IntoIterator<Item = IncludeSpec>>(iter: T) -> Self {
        let mut include = Self::new();
        for spec in iter {
            include.insert(spec);
        }
        include
    }
}

/// Helper function to create an include spec.
pub fn include(relation: impl Into<String>) -> IncludeSpec {
    IncludeSpec::new(relation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_include_spec_nested() {
        let spec = IncludeSpec::new("company").include(IncludeSpec::new("country"));
        assert!(spec.has_nested());
        assert!(spec.nested.contains_key("country"));
    }

    #[test]
    fn test_add_path() {
        let includes = Include::new()
            .add_path("company.country.capital")
            .add_path("position");

        assert_eq!(includes.len(), 2);
        assert_eq!(
            includes.paths(),
            vec![
                "company",
                "company.country",
                "company.country.capital",
                "position"
            ]
        );
    }

    #[test]
    fn test_merging_same_relation() {
        let includes = Include::new()
            .add(include("company").include(include("country")))
            .add(include("company").include(include("users")));

        assert_eq!(includes.len(), 1);
        let company = includes.get("company").unwrap();
        let nested: Vec<_> = company.nested.keys().cloned().collect();
        assert_eq!(nested, vec!["country", "users"]);
    }

    #[test]
    fn test_from_segments() {
        assert!(IncludeSpec::from_segments::<&str>(&[]).is_none());
        let spec = IncludeSpec::from_segments(&["a", "b"]).unwrap();
        assert_eq!(spec.relation_name, "a");
        assert!(spec.nested.contains_key("b"));
    }

    #[test]
    fn test_include_from_iter() {
        let includes: Include = vec![include("company"), include("position")]
            .into_iter()
            .collect();
        assert_eq!(includes.len(), 2);
        assert!(includes.contains("position"));
    }
}
