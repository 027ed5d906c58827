//! Query AST values.
//!
//! Everything in this module has already been validated against a
//! [`Schema`](crate::schema::Schema): tokens can only be minted by the schema,
//! so a renderer never sees an unknown column or a malformed parameter name.

mod expr;
mod stmt;

pub use expr::{
    AggFunc, BinaryOp, CastType, Cond, Direction, Logic, NullsOrder, OrderItem, ScalarExpr,
    ScalarFunc, SelectItem, Window, WindowFunc,
};
pub use stmt::{
    Ast, Bound, CompoundAst, Conflict, DeleteAst, InsertAst, Lock, SelectAst, SetOp, UpdateAst,
};

/// A validated table reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef(String);

impl TableRef {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A validated column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field(String);

impl Field {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// A validated named-parameter reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef(String);

impl ParamRef {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}
