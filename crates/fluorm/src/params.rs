//! Named parameter values supplied at execution time.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio_postgres::types::ToSql;

use crate::error::{OrmError, OrmResult};
use crate::render::compound_prefix;

/// A clone-friendly parameter value.
#[derive(Clone)]
pub struct Param(Arc<dyn ToSql + Send + Sync>);

impl Param {
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// The value as a tokio-postgres bind argument.
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&self.0).finish()
    }
}

/// Parameter values keyed by name.
///
/// ```ignore
/// let params = Params::new().set("min_age", 18i32).set("status", "active");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Params {
    values: IndexMap<String, Param>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, replacing any previous one with the same name.
    pub fn set<T: ToSql + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        value: T,
    ) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: ToSql + Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.values.insert(name.into(), Param::new(value));
    }

    pub fn insert_param(&mut self, name: impl Into<String>, param: Param) {
        self.values.insert(name.into(), param);
    }

    pub fn get(&self, name: &str) -> Option<&Param> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// The same values renamed for the `index`-th sub-query of a compound
    /// query (`id` becomes `q1_id` for index 1).
    pub fn prefixed(&self, index: usize) -> Params {
        let prefix = compound_prefix(index);
        Params {
            values: self
                .values
                .iter()
                .map(|(k, v)| (format!("{prefix}{k}"), v.clone()))
                .collect(),
        }
    }

    /// The same values renamed for row `index` of a multi-row INSERT
    /// (`email` becomes `email_2` for index 2).
    pub fn indexed(&self, index: usize) -> Params {
        Params {
            values: self
                .values
                .iter()
                .map(|(k, v)| (format!("{k}_{index}"), v.clone()))
                .collect(),
        }
    }

    /// Add every value of `other`; on a name clash `other` wins.
    pub fn merge(mut self, other: Params) -> Self {
        self.values.extend(other.values);
        self
    }

    /// Bind arguments in the order a rendered statement lists its names.
    pub fn bind(&self, names: &[String]) -> OrmResult<Vec<&(dyn ToSql + Sync)>> {
        names
            .iter()
            .map(|name| {
                self.values
                    .get(name)
                    .map(Param::as_sql)
                    .ok_or_else(|| OrmError::MissingParam(name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_follows_placeholder_order() {
        let params = Params::new().set("b", 2i32).set("a", 1i32);
        let bound = params.bind(&["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn bind_reports_missing_name() {
        let params = Params::new().set("a", 1i32);
        let err = params
            .bind(&["a".to_string(), "min_age".to_string()])
            .unwrap_err();
        assert!(matches!(err, OrmError::MissingParam(ref n) if n == "min_age"));
    }

    #[test]
    fn prefixed_and_merged() {
        let first = Params::new().set("id", 1i64).prefixed(0);
        let second = Params::new().set("id", 2i64).prefixed(1);
        let all = first.merge(second).set("page_size", 10i64);

        let names: Vec<_> = all.names().collect();
        assert_eq!(names, vec!["q0_id", "q1_id", "page_size"]);
        assert!(!all.contains("id"));
    }

    #[test]
    fn indexed_names_per_row() {
        let row = Params::new()
            .set("email", "a@x")
            .set("age", 30i32)
            .indexed(3);
        let names: Vec<_> = row.names().collect();
        assert_eq!(names, vec!["email_3", "age_3"]);
    }
}
