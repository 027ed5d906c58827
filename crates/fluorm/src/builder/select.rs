use std::marker::PhantomData;

use tokio_postgres::Row;

use super::{Compound, unwrap_rendered};
use crate::ast::{
    Ast, Bound, Cond, Field, Lock, OrderItem, ScalarExpr, SelectAst, SelectItem, SetOp,
};
use crate::client::GenericClient;
use crate::condition::{
    Condition, resolve_aggregate, resolve_direction, resolve_nulls, resolve_predicate,
};
use crate::error::{BuildError, OrmResult};
use crate::exec::{Op, exactly_one};
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::projection::Projection;
use crate::render::Rendered;
use crate::row::FromRow;
use crate::table::Table;

/// Marker: the query must match exactly one row.
#[derive(Debug, Clone, Copy)]
pub struct One;

/// Marker: the query returns any number of rows.
#[derive(Debug, Clone, Copy)]
pub struct Many;

pub type SelectOne<T> = Select<T, One>;
pub type SelectMany<T> = Select<T, Many>;

/// SELECT builder.
///
/// Without [`fields`](Self::fields) every schema column is selected, in
/// declaration order, so the rows map straight onto `T`.
pub struct Select<T, K = Many> {
    table: Table<T>,
    error: Option<BuildError>,
    distinct: bool,
    fields: Vec<Field>,
    exprs: Vec<SelectItem>,
    exprs_only: bool,
    where_: Vec<Cond>,
    group_by: Vec<Field>,
    having: Vec<Cond>,
    order_by: Vec<OrderItem>,
    limit: Option<Bound>,
    offset: Option<Bound>,
    lock: Option<Lock>,
    _kind: PhantomData<K>,
}

impl<T, K> Select<T, K> {
    pub(crate) fn new(table: Table<T>) -> Self {
        Self {
            table,
            error: None,
            distinct: false,
            fields: Vec::new(),
            exprs: Vec::new(),
            exprs_only: false,
            where_: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            lock: None,
            _kind: PhantomData,
        }
    }

    impl_where_methods!();

    /// Restrict the projection to these columns.
    pub fn fields(self, names: &[&str]) -> Self {
        self.step(|b| {
            let fields = b.table.schema().resolve_fields(names)?;
            b.fields.extend(fields);
            Ok(())
        })
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Project a derived value as `alias`.
    pub fn select_expr(self, expr: impl Into<Projection>, alias: &str) -> Self {
        let expr = expr.into();
        self.step(|b| {
            let schema = b.table.schema();
            let item = SelectItem {
                expr: expr.resolve(schema)?,
                alias: Some(schema.resolve_alias(alias)?),
            };
            b.exprs.push(item);
            Ok(())
        })
    }

    /// Project only the `select_expr` values, no plain columns.
    pub fn exprs_only(mut self) -> Self {
        self.exprs_only = true;
        self
    }

    /// `ORDER BY field dir`; `dir` is `"asc"` or `"desc"`.
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

    /// `ORDER BY field dir NULLS FIRST|LAST`; `nulls` is `"first"` or `"last"`.
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

    /// Order by an expression, e.g. a vector distance:
    /// `order_by_expr(op("embedding", "<->", param("query")), "asc")`.
    pub fn order_by_expr(self, expr: impl Into<Projection>, dir: &str) -> Self {
        let expr = expr.into();
        self.step(|b| {
            let item = OrderItem {
                expr: expr.resolve(b.table.schema())?,
                direction: resolve_direction(dir)?,
                nulls: None,
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

    /// `LIMIT :param`
    pub fn limit_param(self, param: &str) -> Self {
        self.step(|b| {
            b.limit = Some(Bound::Param(b.table.schema().resolve_param(param)?));
            Ok(())
        })
    }

    /// `OFFSET :param`
    pub fn offset_param(self, param: &str) -> Self {
        self.step(|b| {
            b.offset = Some(Bound::Param(b.table.schema().resolve_param(param)?));
            Ok(())
        })
    }

    pub fn group_by(self, names: &[&str]) -> Self {
        self.step(|b| {
            let fields = b.table.schema().resolve_fields(names)?;
            b.group_by.extend(fields);
            Ok(())
        })
    }

    /// HAVING on plain columns or groups; aggregates go through
    /// [`having_agg`](Self::having_agg).
    pub fn having(self, cond: Condition) -> Self {
        self.step(|b| {
            let resolved = cond.resolve(b.table.schema())?;
            b.having.extend(resolved);
            Ok(())
        })
    }

    /// `HAVING AGG(field) op :param`; `field` may be `"*"` for `COUNT(*)`.
    pub fn having_agg(self, func: &str, field: &str, op: &str, param: &str) -> Self {
        self.step(|b| {
            let schema = b.table.schema();
            let func = resolve_aggregate(func)?;
            let field = match field {
                "*" => None,
                name => Some(schema.resolve_field(name)?),
            };
            let cond = Cond::Aggregate {
                func,
                field,
                op: resolve_predicate(op)?,
                param: schema.resolve_param(param)?,
            };
            b.having.push(cond);
            Ok(())
        })
    }

    pub fn for_update(mut self) -> Self {
        self.lock = Some(Lock::Update);
        self
    }

    pub fn for_no_key_update(mut self) -> Self {
        self.lock = Some(Lock::NoKeyUpdate);
        self
    }

    pub fn for_share(mut self) -> Self {
        self.lock = Some(Lock::Share);
        self
    }

    pub fn for_key_share(mut self) -> Self {
        self.lock = Some(Lock::KeyShare);
        self
    }

    pub(crate) fn to_ast(&self) -> Result<SelectAst, BuildError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        let schema = self.table.schema();
        let mut items: Vec<SelectItem> = Vec::new();
        if !self.exprs_only {
            let fields = if self.fields.is_empty() {
                schema.all_fields()
            } else {
                self.fields.clone()
            };
            items.extend(fields.into_iter().map(SelectItem::column));
        } else if self.exprs.is_empty() {
            return Err(BuildError::Incomplete("exprs_only() without any select_expr()".into()));
        }
        items.extend(self.exprs.iter().cloned());

        let mut ast = SelectAst::new(schema.table_ref());
        ast.distinct = self.distinct;
        ast.items = items;
        ast.where_ = self.where_.clone();
        ast.group_by = self.group_by.clone();
        ast.having = self.having.clone();
        ast.order_by = self.order_by.clone();
        ast.limit = self.limit.clone();
        ast.offset = self.offset.clone();
        ast.lock = self.lock;
        Ok(ast)
    }

    /// SQL text plus the parameter names to supply, in placeholder order.
    pub fn render(&self) -> OrmResult<Rendered> {
        let ast = Ast::Select(self.to_ast()?);
        self.table.inner.renderer.render(&ast)
    }

    /// [`render`](Self::render), panicking on error. Meant for queries
    /// defined once at startup.
    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }
}

impl<T: FromRow> Select<T, One> {
    /// Run the query and require exactly one row.
    ///
    /// Zero rows is [`OrmError::NotFound`](crate::OrmError::NotFound), more
    /// than one is [`OrmError::TooManyRows`](crate::OrmError::TooManyRows).
    pub async fn fetch_one(&self, client: &impl GenericClient, params: &Params) -> OrmResult<T> {
        let row = self.fetch_one_row(client, params).await?;
        T::from_row(&row)
    }

    /// Like [`fetch_one`](Self::fetch_one) but returns the raw row, for
    /// projections that do not map onto `T`.
    pub async fn fetch_one_row(
        &self,
        client: &impl GenericClient,
        params: &Params,
    ) -> OrmResult<Row> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::SelectOne, &rendered);
        op.run(
            async {
                let rows = op.query(client, &rendered.sql, &args).await?;
                exactly_one(rows, "no rows found")
            },
            |_| QueryResult::Rows(1),
        )
        .await
    }
}

impl<T: FromRow> Select<T, Many> {
    /// Run the query; zero rows is a valid outcome.
    pub async fn fetch_all(
        &self,
        client: &impl GenericClient,
        params: &Params,
    ) -> OrmResult<Vec<T>> {
        let rows = self.fetch_rows(client, params).await?;
        rows.iter().map(T::from_row).collect()
    }

    pub async fn fetch_rows(
        &self,
        client: &impl GenericClient,
        params: &Params,
    ) -> OrmResult<Vec<Row>> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::SelectMany, &rendered);
        let query = op.query(client, &rendered.sql, &args);
        op.run(query, |rows| QueryResult::Rows(rows.len())).await
    }
}

impl<T> Select<T, Many> {
    fn combine(self, op: SetOp, other: Select<T, Many>) -> Compound<T> {
        Compound::from_select(self).push(op, other)
    }

    pub fn union(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::Union, other)
    }

    pub fn union_all(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::UnionAll, other)
    }

    pub fn intersect(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::Intersect, other)
    }

    pub fn intersect_all(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::IntersectAll, other)
    }

    pub fn except(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::Except, other)
    }

    pub fn except_all(self, other: Select<T, Many>) -> Compound<T> {
        self.combine(SetOp::ExceptAll, other)
    }

    pub(crate) fn table(&self) -> &Table<T> {
        &self.table
    }
}
