use super::{check, unwrap_rendered};
use crate::ast::{
    Ast, BinaryOp, Bound, Cond, Conflict, Direction, Field, InsertAst, OrderItem, ParamRef,
    ScalarExpr, SelectAst, SelectItem,
};
use crate::client::GenericClient;
use crate::error::{BuildError, OrmResult};
use crate::exec::{Op, exactly_one, exactly_one_affected};
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::row::FromRow;
use crate::table::Table;

/// INSERT of every non-primary-key column.
///
/// Each column is bound from the parameter of the same name; batch rows use
/// `<column>_<i>`.
pub struct Insert<T> {
    table: Table<T>,
    error: Option<BuildError>,
    conflict: Option<Conflict>,
}

impl<T> Insert<T> {
    pub(crate) fn new(table: Table<T>) -> Self {
        Self {
            table,
            error: None,
            conflict: None,
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

    /// `ON CONFLICT (target) DO NOTHING`; an empty target matches any
    /// constraint.
    pub fn on_conflict_do_nothing(self, target: &[&str]) -> Self {
        self.step(|b| {
            let target = b.table.schema().resolve_fields(target)?;
            b.conflict = Some(Conflict::DoNothing { target });
            Ok(())
        })
    }

    /// `ON CONFLICT (target) DO UPDATE SET col = EXCLUDED.col, ..`
    pub fn on_conflict_do_update(self, target: &[&str], update: &[&str]) -> Self {
        self.step(|b| {
            let schema = b.table.schema();
            let target = schema.resolve_fields(target)?;
            let set = schema.resolve_fields(update)?;
            if target.is_empty() || set.is_empty() {
                return Err(BuildError::InvalidCondition(
                    "ON CONFLICT DO UPDATE needs a target and columns to update".into(),
                ));
            }
            b.conflict = Some(Conflict::DoUpdate { target, set });
            Ok(())
        })
    }

    fn columns(&self) -> Vec<Field> {
        self.table.schema().non_primary_fields()
    }

    fn ast(&self, rows: Vec<Vec<ParamRef>>, returning: Vec<Field>) -> OrmResult<Rendered> {
        check(&self.error)?;
        let ast = Ast::Insert(InsertAst {
            table: self.table.schema().table_ref(),
            columns: self.columns(),
            rows,
            conflict: self.conflict.clone(),
            returning,
        });
        self.table.inner.renderer.render(&ast)
    }

    fn row(&self, suffix: Option<usize>) -> Result<Vec<ParamRef>, BuildError> {
        let schema = self.table.schema();
        self.columns()
            .iter()
            .map(|f| match suffix {
                Some(i) => schema.resolve_param(&format!("{}_{i}", f.name())),
                None => schema.resolve_param(f.name()),
            })
            .collect()
    }

    /// The statement `exec` sends first. It carries `RETURNING` when the
    /// dialect supports it.
    pub fn render(&self) -> OrmResult<Rendered> {
        check(&self.error)?;
        let returning = if self.table.capabilities().returning_on_insert {
            self.table.schema().all_fields()
        } else {
            Vec::new()
        };
        self.ast(vec![self.row(None)?], returning)
    }

    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }

    /// One statement inserting `rows` rows.
    pub fn render_batch(&self, rows: usize) -> OrmResult<Rendered> {
        check(&self.error)?;
        let values = (0..rows)
            .map(|i| self.row(Some(i)))
            .collect::<Result<Vec<_>, _>>()?;
        self.ast(values, Vec::new())
    }

    /// Read back the inserted row when the dialect has no `RETURNING`.
    ///
    /// Filters by the conflict target when one is set, otherwise by every
    /// inserted column, newest primary key first. Nullable columns match a
    /// NULL parameter against a stored NULL.
    fn fallback_read(&self) -> OrmResult<Rendered> {
        let schema = self.table.schema();
        let keys = match &self.conflict {
            Some(conflict) if !conflict.target().is_empty() => conflict.target().to_vec(),
            _ => self.columns(),
        };

        let mut select = SelectAst::new(schema.table_ref());
        select.items = schema
            .all_fields()
            .into_iter()
            .map(SelectItem::column)
            .collect();
        for field in keys {
            let param = schema.resolve_param(field.name())?;
            let cond = if schema.is_nullable(field.name()) {
                Cond::NullSafeEq { field, param }
            } else {
                Cond::Compare {
                    field,
                    op: BinaryOp::Eq,
                    param,
                }
            };
            select.where_.push(cond);
        }
        select.order_by = schema
            .primary_key()
            .into_iter()
            .map(|f| OrderItem {
                expr: ScalarExpr::Column(f),
                direction: Direction::Desc,
                nulls: None,
            })
            .collect();
        if !select.order_by.is_empty() {
            select.limit = Some(Bound::Literal(1));
        }
        self.table.inner.renderer.render(&Ast::Select(select))
    }

    /// Insert every row of `rows` with one multi-row statement and return
    /// the rows affected. An empty slice is a no-op.
    pub async fn exec_batch(&self, client: &impl GenericClient, rows: &[Params]) -> OrmResult<u64> {
        check(&self.error)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let rendered = self.render_batch(rows.len())?;
        let params = rows
            .iter()
            .enumerate()
            .fold(Params::new(), |acc, (i, row)| acc.merge(row.indexed(i)));
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::InsertBatch, &rendered);
        let statement = op.execute(client, &rendered.sql, &args);
        op.run(statement, |n| QueryResult::Affected(*n)).await
    }
}

impl<T: FromRow> Insert<T> {
    /// Insert one row and return it as stored.
    ///
    /// Uses `RETURNING` when the dialect has it, otherwise runs the INSERT,
    /// requires exactly one affected row and reads the row back.
    pub async fn exec(&self, client: &impl GenericClient, params: &Params) -> OrmResult<T> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::Insert, &rendered);

        if self.table.capabilities().returning_on_insert {
            return op
                .run(
                    async {
                        let rows = op.query(client, &rendered.sql, &args).await?;
                        let row = exactly_one(rows, "no rows inserted")?;
                        T::from_row(&row)
                    },
                    |_| QueryResult::Rows(1),
                )
                .await;
        }

        let read = self.fallback_read()?;
        let read_args = params.bind(&read.params)?;
        op.run(
            async {
                let n = op.execute(client, &rendered.sql, &args).await?;
                exactly_one_affected(n, "no rows inserted")?;
                let rows = op.query(client, &read.sql, &read_args).await?;
                let row = exactly_one(rows, "inserted row not found")?;
                T::from_row(&row)
            },
            |_| QueryResult::Affected(1),
        )
        .await
    }
}
