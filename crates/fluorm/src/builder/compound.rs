use tokio_postgres::Row;

use super::{SelectMany, unwrap_rendered};
use crate::ast::{Ast, Bound, CompoundAst, OrderItem, ScalarExpr, SelectAst, SetOp};
use crate::client::GenericClient;
use crate::condition::{resolve_direction, resolve_nulls};
use crate::error::{BuildError, OrmResult};
use crate::exec::Op;
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::row::FromRow;
use crate::table::Table;

/// SELECTs joined by set operations, evaluated left to right.
///
/// Parameters of the `i`-th sub-query are supplied as `q<i>_<name>`, so
/// two sub-queries may both use `id` with different values. The trailing
/// ORDER BY / LIMIT / OFFSET apply to the combined result and keep their
/// names unprefixed.
///
/// ```ignore
/// let q = users
///     .select()
///     .where_("id", "=", "id")
///     .union(users.select().where_("id", "=", "id"))
///     .order_by("email", "asc")
///     .limit_param("page_size");
///
/// let params = Params::new().set("id", 1i64).prefixed(0)
///     .merge(Params::new().set("id", 2i64).prefixed(1))
///     .set("page_size", 10i64);
/// let rows = q.fetch_all(&client, &params).await?;
/// ```
pub struct Compound<T> {
    table: Table<T>,
    error: Option<BuildError>,
    first: Option<SelectAst>,
    rest: Vec<(SetOp, SelectAst)>,
    order_by: Vec<OrderItem>,
    limit: Option<Bound>,
    offset: Option<Bound>,
}

impl<T> Compound<T> {
    pub(crate) fn from_select(select: SelectMany<T>) -> Self {
        let (first, error) = match select.to_ast() {
            Ok(ast) => (Some(ast), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            table: select.table().clone(),
            error,
            first,
            rest: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    fn step(mut self, f: impl FnOnce(&mut Self) -> Result<(), BuildError>) -> Self {
        if self.error.is_none() {
            if let Err(e) = f(&mut self) {
                self.error = Some(e);
            }
        }
        self
    }

    pub(crate) fn push(self, op: SetOp, other: SelectMany<T>) -> Self {
        self.step(|b| {
            let ast = other.to_ast()?;
            b.rest.push((op, ast));
            Ok(())
        })
    }

    pub fn union(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::Union, other)
    }

    pub fn union_all(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::UnionAll, other)
    }

    pub fn intersect(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::Intersect, other)
    }

    pub fn intersect_all(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::IntersectAll, other)
    }

    pub fn except(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::Except, other)
    }

    pub fn except_all(self, other: SelectMany<T>) -> Self {
        self.push(SetOp::ExceptAll, other)
    }

    /// Order the combined result by an output column.
    pub fn order_by(self, field: &str, dir: &str) -> Self {
        self.step(|b| {
            let item = OrderItem {
                expr: ScalarExpr::Column(b.table.schema().resolve_field(field)?),
                direction: resolve_direction(dir)?,
                nulls: None,
            };
            b.order_by.push(item);
            Ok(())
        })
    }

    pub fn order_by_nulls(self, field: &str, dir: &str, nulls: &str) -> Self {
        self.step(|b| {
            let item = OrderItem {
                expr: ScalarExpr::Column(b.table.schema().resolve_field(field)?),
                direction: resolve_direction(dir)?,
                nulls: Some(resolve_nulls(nulls)?),
            };
            b.order_by.push(item);
            Ok(())
        })
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(Bound::Literal(n));
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(Bound::Literal(n));
        self
    }

    pub fn limit_param(self, param: &str) -> Self {
        self.step(|b| {
            b.limit = Some(Bound::Param(b.table.schema().resolve_param(param)?));
            Ok(())
        })
    }

    pub fn offset_param(self, param: &str) -> Self {
        self.step(|b| {
            b.offset = Some(Bound::Param(b.table.schema().resolve_param(param)?));
            Ok(())
        })
    }

    fn to_ast(&self) -> Result<CompoundAst, BuildError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let first = match &self.first {
            Some(first) if !self.rest.is_empty() => first.clone(),
            _ => {
                return Err(BuildError::Incomplete(
                    "a compound query needs at least two operands".into(),
                ));
            }
        };
        Ok(CompoundAst {
            first,
            rest: self.rest.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit.clone(),
            offset: self.offset.clone(),
        })
    }

    /// SQL text plus the parameter names to supply: prefixed `q<i>_` names
    /// for the sub-queries, then the trailing LIMIT/OFFSET names.
    pub fn render(&self) -> OrmResult<Rendered> {
        let ast = Ast::Compound(self.to_ast()?);
        self.table.inner.renderer.render(&ast)
    }

    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }

    pub async fn fetch_rows(
        &self,
        client: &impl GenericClient,
        params: &Params,
    ) -> OrmResult<Vec<Row>> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::Compound, &rendered);
        let query = op.query(client, &rendered.sql, &args);
        op.run(query, |rows| QueryResult::Rows(rows.len())).await
    }
}

impl<T: FromRow> Compound<T> {
    pub async fn fetch_all(
        &self,
        client: &impl GenericClient,
        params: &Params,
    ) -> OrmResult<Vec<T>> {
        let rows = self.fetch_rows(client, params).await?;
        rows.iter().map(T::from_row).collect()
    }
}
