use indexmap::IndexMap;

use super::Rendered;

/// Prefix applied to the parameters of the `index`-th sub-query of a
/// compound query.
pub fn compound_prefix(index: usize) -> String {
    format!("q{index}_")
}

/// Accumulates SQL text and assigns `$n` placeholders to named parameters.
#[derive(Debug, Default)]
pub struct RenderContext {
    /// Parameter name -> placeholder index
    params: IndexMap<String, usize>,
    sql: String,
    /// Prepended to every parameter name while set
    prefix: Option<String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholder for `name`, allocating a new index on first use.
    pub fn param(&mut self, name: &str) -> String {
        let key = match &self.prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        };
        let next = self.params.len() + 1;
        let idx = *self.params.entry(key).or_insert(next);
        format!("${idx}")
    }

    pub fn push_param(&mut self, name: &str) {
        let placeholder = self.param(name);
        self.sql.push_str(&placeholder);
    }

    pub fn write(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    /// Set or clear the parameter prefix. Returns the previous one.
    pub fn set_prefix(&mut self, prefix: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.prefix, prefix)
    }

    pub fn finish(self) -> Rendered {
        Rendered {
            sql: self.sql,
            params: self.params.into_keys().collect(),
        }
    }
}
