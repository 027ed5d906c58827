use super::{check, unwrap_rendered};
use crate::ast::{Ast, Cond, DeleteAst};
use crate::client::GenericClient;
use crate::error::{BuildError, OrmError, OrmResult};
use crate::exec::Op;
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::table::Table;

/// DELETE builder. Refuses to run without a WHERE condition.
pub struct Delete<T> {
    table: Table<T>,
    error: Option<BuildError>,
    where_: Vec<Cond>,
}

impl<T> Delete<T> {
    pub(crate) fn new(table: Table<T>) -> Self {
        Self {
            table,
            error: None,
            where_: Vec::new(),
        }
    }

    impl_where_methods!();

    fn require_where(&self) -> OrmResult<()> {
        if self.where_.is_empty() {
            return Err(OrmError::MissingWhere {
                operation: OperationKind::Delete.verb(),
            });
        }
        Ok(())
    }

    pub fn render(&self) -> OrmResult<Rendered> {
        check(&self.error)?;
        self.require_where()?;
        let ast = Ast::Delete(DeleteAst {
            table: self.table.schema().table_ref(),
            where_: self.where_.clone(),
        });
        self.table.inner.renderer.render(&ast)
    }

    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }

    /// Delete the matching rows and return how many were removed.
    pub async fn exec(&self, client: &impl GenericClient, params: &Params) -> OrmResult<u64> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::Delete, &rendered);
        let statement = op.execute(client, &rendered.sql, &args);
        op.run(statement, |n| QueryResult::Affected(*n)).await
    }

    /// Run the DELETE once per parameter set, in order. Stops at the first
    /// failure with [`OrmError::Batch`]. An empty slice is a no-op.
    pub async fn exec_batch(&self, client: &impl GenericClient, sets: &[Params]) -> OrmResult<u64> {
        check(&self.error)?;
        if sets.is_empty() {
            return Ok(0);
        }
        let rendered = self.render()?;
        let op = Op::new(&self.table.inner, OperationKind::DeleteBatch, &rendered);
        let batch = op.batch(client, &rendered, sets);
        op.run(batch, |n| QueryResult::Affected(*n)).await
    }
}
