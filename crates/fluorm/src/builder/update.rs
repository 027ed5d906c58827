use super::{check, unwrap_rendered};
use crate::ast::{Ast, Cond, Field, ParamRef, SelectAst, SelectItem, UpdateAst};
use crate::client::GenericClient;
use crate::error::{BuildError, OrmError, OrmResult};
use crate::exec::{Op, exactly_one, exactly_one_affected};
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::row::FromRow;
use crate::table::Table;

/// UPDATE builder. Refuses to run without a WHERE condition.
pub struct Update<T> {
    table: Table<T>,
    error: Option<BuildError>,
    set: Vec<(Field, ParamRef)>,
    where_: Vec<Cond>,
}

impl<T> Update<T> {
    pub(crate) fn new(table: Table<T>) -> Self {
        Self {
            table,
            error: None,
            set: Vec::new(),
            where_: Vec::new(),
        }
    }

    impl_where_methods!();

    /// `SET field = :param`
    pub fn set(self, field: &str, param: &str) -> Self {
        self.step(|b| {
            let schema = b.table.schema();
            let pair = (schema.resolve_field(field)?, schema.resolve_param(param)?);
            b.set.push(pair);
            Ok(())
        })
    }

    /// Error slot, then SET, then WHERE.
    fn preflight(&self) -> OrmResult<()> {
        check(&self.error)?;
        if self.set.is_empty() {
            return Err(BuildError::Incomplete("update without any SET column".into()).into());
        }
        Ok(())
    }

    fn require_where(&self) -> OrmResult<()> {
        if self.where_.is_empty() {
            return Err(OrmError::MissingWhere {
                operation: OperationKind::Update.verb(),
            });
        }
        Ok(())
    }

    fn statement(&self, returning: Vec<Field>) -> OrmResult<Rendered> {
        let ast = Ast::Update(UpdateAst {
            table: self.table.schema().table_ref(),
            set: self.set.clone(),
            where_: self.where_.clone(),
            returning,
        });
        self.table.inner.renderer.render(&ast)
    }

    /// Every column of the rows the UPDATE matched, using the same resolved
    /// WHERE conditions.
    fn fallback_read(&self) -> OrmResult<Rendered> {
        let schema = self.table.schema();
        let mut select = SelectAst::new(schema.table_ref());
        select.items = schema
            .all_fields()
            .into_iter()
            .map(SelectItem::column)
            .collect();
        select.where_ = self.where_.clone();
        self.table.inner.renderer.render(&Ast::Select(select))
    }

    /// The statement `exec` sends first. It carries `RETURNING` when the
    /// dialect supports it.
    pub fn render(&self) -> OrmResult<Rendered> {
        self.preflight()?;
        self.require_where()?;
        let returning = if self.table.capabilities().returning_on_update {
            self.table.schema().all_fields()
        } else {
            Vec::new()
        };
        self.statement(returning)
    }

    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }

    /// Run the UPDATE once per parameter set, in order, and return the
    /// total rows affected. Stops at the first failure with
    /// [`OrmError::Batch`]. An empty slice is a no-op.
    pub async fn exec_batch(&self, client: &impl GenericClient, sets: &[Params]) -> OrmResult<u64> {
        self.preflight()?;
        if sets.is_empty() {
            return Ok(0);
        }
        self.require_where()?;
        let rendered = self.statement(Vec::new())?;
        let op = Op::new(&self.table.inner, OperationKind::UpdateBatch, &rendered);
        let batch = op.batch(client, &rendered, sets);
        op.run(batch, |n| QueryResult::Affected(*n)).await
    }
}

impl<T: FromRow> Update<T> {
    /// Update exactly one row and return it.
    ///
    /// With `RETURNING` support the row comes back from the UPDATE itself.
    /// Otherwise the UPDATE must report one affected row and the row is read
    /// back with the same WHERE conditions. Zero rows is
    /// [`OrmError::NotFound`], more than one is [`OrmError::TooManyRows`].
    pub async fn exec(&self, client: &impl GenericClient, params: &Params) -> OrmResult<T> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::Update, &rendered);

        if self.table.capabilities().returning_on_update {
            return op
                .run(
                    async {
                        let rows = op.query(client, &rendered.sql, &args).await?;
                        let row = exactly_one(rows, "no rows updated")?;
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
                exactly_one_affected(n, "no rows updated")?;
                let rows = op.query(client, &read.sql, &read_args).await?;
                let row = exactly_one(rows, "updated row not found")?;
                T::from_row(&row)
            },
            |_| QueryResult::Affected(1),
        )
        .await
    }
}
