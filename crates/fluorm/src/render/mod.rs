//! SQL rendering and dialect capabilities.
//!
//! A [`Renderer`] turns a validated [`Ast`] into SQL text with `$n`
//! placeholders plus the parameter names in placeholder order. It also
//! reports [`Capabilities`], which the execution layer consults to pick
//! between inline `RETURNING` and a follow-up read.

mod context;
mod sql;

#[cfg(test)]
mod tests;

pub use context::{RenderContext, compound_prefix};
pub use sql::SqlRenderer;

use crate::ast::Ast;
use crate::error::OrmResult;

/// SQL text plus the named parameters it binds, in `$1, $2, ..` order.
///
/// A name used more than once maps to a single placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<String>,
}

/// Turns query ASTs into dialect-specific SQL.
pub trait Renderer: Send + Sync {
    /// Render a statement, or fail if the dialect cannot express it.
    fn render(&self, ast: &Ast) -> OrmResult<Rendered>;

    /// What the target dialect supports.
    fn capabilities(&self) -> Capabilities;
}

/// Feature flags for a rendering target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `INSERT .. RETURNING`
    pub returning_on_insert: bool,
    /// `UPDATE .. RETURNING`
    pub returning_on_update: bool,
    /// `ON CONFLICT`
    pub upsert: bool,
    /// `AGG(..) FILTER (WHERE ..)`
    pub aggregate_filter: bool,
    /// `NULLS FIRST` / `NULLS LAST`
    pub nulls_ordering: bool,
    /// `FOR UPDATE` and friends
    pub row_locking: bool,
    /// array-typed parameters (`= ANY($n)`)
    pub array_params: bool,
    /// pgvector distance operators
    pub vector_ops: bool,
    /// `OVER (..)`
    pub window_functions: bool,
}

impl Capabilities {
    /// Everything enabled.
    pub const fn all() -> Self {
        Self {
            returning_on_insert: true,
            returning_on_update: true,
            upsert: true,
            aggregate_filter: true,
            nulls_ordering: true,
            row_locking: true,
            array_params: true,
            vector_ops: true,
            window_functions: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Dialects that speak the Postgres wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Redshift,
}

impl Dialect {
    pub fn capabilities(self) -> Capabilities {
        match self {
            Dialect::Postgres => Capabilities::all(),
            Dialect::Redshift => Capabilities {
                returning_on_insert: false,
                returning_on_update: false,
                upsert: false,
                aggregate_filter: false,
                nulls_ordering: true,
                row_locking: false,
                array_params: false,
                vector_ops: false,
                window_functions: true,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Redshift => "redshift",
        }
    }
}
