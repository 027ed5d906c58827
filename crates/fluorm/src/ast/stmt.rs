//! Statement values handed to a [`Renderer`](crate::render::Renderer).

use super::expr::{Cond, OrderItem, SelectItem};
use super::{Field, ParamRef, TableRef};

/// LIMIT / OFFSET value.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Literal(u64),
    Param(ParamRef),
}

/// Row-locking clause appended to a SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    Update,
    NoKeyUpdate,
    Share,
    KeyShare,
}

impl Lock {
    pub fn as_sql(self) -> &'static str {
        match self {
            Lock::Update => "FOR UPDATE",
            Lock::NoKeyUpdate => "FOR NO KEY UPDATE",
            Lock::Share => "FOR SHARE",
            Lock::KeyShare => "FOR KEY SHARE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectAst {
    pub table: TableRef,
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    /// ANDed together at render time.
    pub where_: Vec<Cond>,
    pub group_by: Vec<Field>,
    pub having: Vec<Cond>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Bound>,
    pub offset: Option<Bound>,
    pub lock: Option<Lock>,
}

impl SelectAst {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            distinct: false,
            items: Vec::new(),
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
        }
    }
}

/// ON CONFLICT handling for INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum Conflict {
    DoNothing { target: Vec<Field> },
    DoUpdate { target: Vec<Field>, set: Vec<Field> },
}

impl Conflict {
    pub fn target(&self) -> &[Field] {
        match self {
            Conflict::DoNothing { target } | Conflict::DoUpdate { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertAst {
    pub table: TableRef,
    pub columns: Vec<Field>,
    /// One entry per VALUES tuple, each as long as `columns`.
    pub rows: Vec<Vec<ParamRef>>,
    pub conflict: Option<Conflict>,
    pub returning: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAst {
    pub table: TableRef,
    pub set: Vec<(Field, ParamRef)>,
    pub where_: Vec<Cond>,
    pub returning: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAst {
    pub table: TableRef,
    pub where_: Vec<Cond>,
}

/// Set operations joining SELECTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::IntersectAll => "INTERSECT ALL",
            SetOp::Except => "EXCEPT",
            SetOp::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// A left-associative chain of SELECTs.
///
/// The trailing ORDER BY / LIMIT / OFFSET apply to the combined result.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundAst {
    pub first: SelectAst,
    pub rest: Vec<(SetOp, SelectAst)>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Bound>,
    pub offset: Option<Bound>,
}

impl CompoundAst {
    /// Sub-queries in chain order.
    pub fn parts(&self) -> impl Iterator<Item = &SelectAst> {
        std::iter::once(&self.first).chain(self.rest.iter().map(|(_, q)| q))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    Select(SelectAst),
    Insert(InsertAst),
    Update(UpdateAst),
    Delete(DeleteAst),
    Compound(CompoundAst),
}

impl From<SelectAst> for Ast {
    fn from(v: SelectAst) -> Self {
        Ast::Select(v)
    }
}

impl From<InsertAst> for Ast {
    fn from(v: InsertAst) -> Self {
        Ast::Insert(v)
    }
}

impl From<UpdateAst> for Ast {
    fn from(v: UpdateAst) -> Self {
        Ast::Update(v)
    }
}

impl From<DeleteAst> for Ast {
    fn from(v: DeleteAst) -> Self {
        Ast::Delete(v)
    }
}

impl From<CompoundAst> for Ast {
    fn from(v: CompoundAst) -> Self {
        Ast::Compound(v)
    }
}
