use super::{check, unwrap_rendered};
use crate::ast::{AggFunc, Ast, CastType, Cond, Field, ScalarExpr, SelectAst, SelectItem};
use crate::client::GenericClient;
use crate::condition::Condition;
use crate::error::{BuildError, OrmResult};
use crate::exec::{Op, exactly_one};
use crate::monitor::{OperationKind, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::row::RowExt;
use crate::table::Table;

/// Output column of every aggregate query.
const VALUE_COLUMN: &str = "value";

/// A single-value aggregate: `SELECT CAST(AGG(..) AS DOUBLE PRECISION) AS "value"`.
///
/// The result decodes as `f64`; SQL NULL (e.g. `AVG` over no rows) becomes
/// `0.0`.
pub struct Aggregate<T> {
    table: Table<T>,
    error: Option<BuildError>,
    func: AggFunc,
    field: Option<Field>,
    filter: Vec<Cond>,
    where_: Vec<Cond>,
}

impl<T> Aggregate<T> {
    pub(crate) fn new(
        table: Table<T>,
        func: Result<AggFunc, BuildError>,
        field: Option<&str>,
    ) -> Self {
        let mut agg = Self {
            table,
            error: None,
            func: AggFunc::Count,
            field: None,
            filter: Vec::new(),
            where_: Vec::new(),
        };
        let resolved = func.and_then(|func| {
            let field = match field {
                Some(name) => Some(agg.table.schema().resolve_field(name)?),
                None if func == AggFunc::Count => None,
                None => {
                    return Err(BuildError::Incomplete(format!(
                        "{} needs a column",
                        func.sql_name()
                    )));
                }
            };
            Ok((func, field))
        });
        match resolved {
            Ok((func, field)) => {
                agg.func = func;
                agg.field = field;
            }
            Err(e) => agg.error = Some(e),
        }
        agg
    }

    impl_where_methods!();

    /// `FILTER (WHERE cond)` on the aggregate; repeated calls are ANDed.
    pub fn filter(self, cond: Condition) -> Self {
        self.step(|b| {
            let resolved = cond.resolve(b.table.schema())?;
            b.filter.extend(resolved);
            Ok(())
        })
    }

    pub fn render(&self) -> OrmResult<Rendered> {
        check(&self.error)?;
        let schema = self.table.schema();
        let value = ScalarExpr::Aggregate {
            func: self.func,
            arg: self.field.clone().map(|f| Box::new(ScalarExpr::Column(f))),
            filter: Cond::all(self.filter.clone()).map(Box::new),
            over: None,
        };
        let mut select = SelectAst::new(schema.table_ref());
        select.items = vec![SelectItem {
            expr: ScalarExpr::Cast {
                expr: Box::new(value),
                ty: CastType::DoublePrecision,
            },
            alias: Some(VALUE_COLUMN.to_string()),
        }];
        select.where_ = self.where_.clone();
        self.table.inner.renderer.render(&Ast::Select(select))
    }

    pub fn must_render(&self) -> Rendered {
        unwrap_rendered(self.render())
    }

    pub async fn fetch(&self, client: &impl GenericClient, params: &Params) -> OrmResult<f64> {
        let rendered = self.render()?;
        let args = params.bind(&rendered.params)?;
        let op = Op::new(&self.table.inner, OperationKind::Aggregate, &rendered);
        op.run(
            async {
                let rows = op.query(client, &rendered.sql, &args).await?;
                let row = exactly_one(rows, "aggregate returned no row")?;
                let value: Option<f64> = row.try_get_column(VALUE_COLUMN)?;
                Ok(value.unwrap_or(0.0))
            },
            |_| QueryResult::Rows(1),
        )
        .await
    }
}
