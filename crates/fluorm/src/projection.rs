//! Derived columns for SELECT lists and expression ordering.
//!
//! ```ignore
//! use fluorm::projection::*;
//!
//! users
//!     .select()
//!     .select_expr(lower(col("email")), "email_lc")
//!     .select_expr(count_all().filter(c("age", ">=", "adult")), "adults")
//!     .select_expr(row_number(window().order_by("age", "desc")), "rank");
//! ```

use crate::ast::{AggFunc, CastType, OrderItem, ScalarExpr, ScalarFunc, Window, WindowFunc};
use crate::condition::{Condition, lookup, resolve_direction, resolve_operator};
use crate::error::{BuildError, NameKind};
use crate::schema::Schema;

pub const CAST_TYPES: &[(&str, CastType)] = &[
    ("TEXT", CastType::Text),
    ("VARCHAR", CastType::Text),
    ("SMALLINT", CastType::SmallInt),
    ("INT2", CastType::SmallInt),
    ("INTEGER", CastType::Integer),
    ("INT", CastType::Integer),
    ("INT4", CastType::Integer),
    ("BIGINT", CastType::BigInt),
    ("INT8", CastType::BigInt),
    ("NUMERIC", CastType::Numeric),
    ("DECIMAL", CastType::Numeric),
    ("REAL", CastType::Real),
    ("FLOAT4", CastType::Real),
    ("DOUBLE PRECISION", CastType::DoublePrecision),
    ("FLOAT8", CastType::DoublePrecision),
    ("BOOLEAN", CastType::Boolean),
    ("BOOL", CastType::Boolean),
    ("DATE", CastType::Date),
    ("TIMESTAMP", CastType::Timestamp),
    ("TIMESTAMPTZ", CastType::TimestampTz),
    ("UUID", CastType::Uuid),
    ("JSONB", CastType::Jsonb),
];

pub fn resolve_cast_type(token: &str) -> Result<CastType, BuildError> {
    lookup(CAST_TYPES, NameKind::CastType, token)
}

/// An unvalidated scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Column(String),
    Param(String),
    Func {
        func: ScalarFunc,
        args: Vec<Projection>,
    },
    Cast {
        inner: Box<Projection>,
        ty: String,
    },
    Binary {
        left: Box<Projection>,
        op: String,
        right: Box<Projection>,
    },
    Aggregate(Agg),
    Case(CaseWhen),
    Window {
        func: WindowFunc,
        over: WindowSpec,
    },
}

/// An aggregate call, optionally filtered or windowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Agg {
    func: AggFunc,
    arg: Option<Box<Projection>>,
    filter: Option<Condition>,
    over: Option<WindowSpec>,
}

impl Agg {
    fn new(func: AggFunc, arg: Option<Projection>) -> Self {
        Self {
            func,
            arg: arg.map(Box::new),
            filter: None,
            over: None,
        }
    }

    /// `FILTER (WHERE cond)`
    pub fn filter(mut self, cond: Condition) -> Self {
        self.filter = Some(cond);
        self
    }

    /// `OVER (..)`
    pub fn over(mut self, window: WindowSpec) -> Self {
        self.over = Some(window);
        self
    }
}

impl From<Agg> for Projection {
    fn from(agg: Agg) -> Self {
        Projection::Aggregate(agg)
    }
}

/// `CASE WHEN .. THEN :param .. ELSE :param END`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaseWhen {
    whens: Vec<(Condition, Projection)>,
    otherwise: Option<Box<Projection>>,
}

impl CaseWhen {
    pub fn when(mut self, cond: Condition, param: impl Into<String>) -> Self {
        self.whens.push((cond, Projection::Param(param.into())));
        self
    }

    /// A branch yielding an arbitrary expression.
    pub fn when_expr(mut self, cond: Condition, then: impl Into<Projection>) -> Self {
        self.whens.push((cond, then.into()));
        self
    }

    pub fn otherwise(mut self, param: impl Into<String>) -> Self {
        self.otherwise = Some(Box::new(Projection::Param(param.into())));
        self
    }

    pub fn otherwise_expr(mut self, expr: impl Into<Projection>) -> Self {
        self.otherwise = Some(Box::new(expr.into()));
        self
    }
}

impl From<CaseWhen> for Projection {
    fn from(case: CaseWhen) -> Self {
        Projection::Case(case)
    }
}

/// `OVER (PARTITION BY .. ORDER BY ..)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowSpec {
    partition_by: Vec<String>,
    order_by: Vec<(String, String)>,
}

impl WindowSpec {
    pub fn partition_by(mut self, field: impl Into<String>) -> Self {
        self.partition_by.push(field.into());
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: impl Into<String>) -> Self {
        self.order_by.push((field.into(), direction.into()));
        self
    }

    fn resolve(&self, schema: &Schema) -> Result<Window, BuildError> {
        let partition_by = self
            .partition_by
            .iter()
            .map(|f| schema.resolve_field(f))
            .collect::<Result<_, _>>()?;
        let order_by = self
            .order_by
            .iter()
            .map(|(f, dir)| {
                Ok(OrderItem {
                    expr: ScalarExpr::Column(schema.resolve_field(f)?),
                    direction: resolve_direction(dir)?,
                    nulls: None,
                })
            })
            .collect::<Result<_, BuildError>>()?;
        Ok(Window {
            partition_by,
            order_by,
        })
    }
}

impl From<&str> for Projection {
    fn from(name: &str) -> Self {
        Projection::Column(name.to_string())
    }
}

impl Projection {
    pub(crate) fn resolve(&self, schema: &Schema) -> Result<ScalarExpr, BuildError> {
        Ok(match self {
            Projection::Column(name) => ScalarExpr::Column(schema.resolve_field(name)?),
            Projection::Param(name) => ScalarExpr::Param(schema.resolve_param(name)?),
            Projection::Func { func, args } => ScalarExpr::Func {
                func: *func,
                args: args
                    .iter()
                    .map(|a| a.resolve(schema))
                    .collect::<Result<_, _>>()?,
            },
            Projection::Cast { inner, ty } => ScalarExpr::Cast {
                expr: Box::new(inner.resolve(schema)?),
                ty: resolve_cast_type(ty)?,
            },
            Projection::Binary { left, op, right } => {
                let left = left.resolve(schema)?;
                let bin = resolve_operator(op)?;
                if bin.is_membership() {
                    return Err(BuildError::InvalidCondition(format!(
                        "operator '{}' cannot be used in an expression",
                        op.trim()
                    )));
                }
                ScalarExpr::Binary {
                    left: Box::new(left),
                    op: bin,
                    right: Box::new(right.resolve(schema)?),
                }
            }
            Projection::Aggregate(agg) => {
                let filter = match &agg.filter {
                    Some(cond) => cond.resolve(schema)?.map(Box::new),
                    None => None,
                };
                ScalarExpr::Aggregate {
                    func: agg.func,
                    arg: match &agg.arg {
                        Some(a) => Some(Box::new(a.resolve(schema)?)),
                        None => None,
                    },
                    filter,
                    over: agg.over.as_ref().map(|w| w.resolve(schema)).transpose()?,
                }
            }
            Projection::Case(case) => {
                let mut whens = Vec::with_capacity(case.whens.len());
                for (cond, then) in &case.whens {
                    let Some(cond) = cond.resolve(schema)? else {
                        let msg = "CASE branch with an empty condition";
                        return Err(BuildError::InvalidCondition(msg.into()));
                    };
                    whens.push((cond, then.resolve(schema)?));
                }
                if whens.is_empty() {
                    return Err(BuildError::InvalidCondition(
                        "CASE needs at least one WHEN branch".into(),
                    ));
                }
                ScalarExpr::Case {
                    whens,
                    otherwise: match &case.otherwise {
                        Some(e) => Some(Box::new(e.resolve(schema)?)),
                        None => None,
                    },
                }
            }
            Projection::Window { func, over } => ScalarExpr::Window {
                func: *func,
                over: over.resolve(schema)?,
            },
        })
    }
}

pub fn col(name: impl Into<String>) -> Projection {
    Projection::Column(name.into())
}

pub fn param(name: impl Into<String>) -> Projection {
    Projection::Param(name.into())
}

/// `left op right`, e.g. a vector distance for similarity ordering.
pub fn op(
    left: impl Into<Projection>,
    op: impl Into<String>,
    right: impl Into<Projection>,
) -> Projection {
    Projection::Binary {
        left: Box::new(left.into()),
        op: op.into(),
        right: Box::new(right.into()),
    }
}

fn func1(func: ScalarFunc, arg: impl Into<Projection>) -> Projection {
    Projection::Func {
        func,
        args: vec![arg.into()],
    }
}

pub fn upper(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Upper, arg)
}

pub fn lower(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Lower, arg)
}

pub fn trim(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Trim, arg)
}

pub fn length(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Length, arg)
}

pub fn abs(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Abs, arg)
}

pub fn ceil(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Ceil, arg)
}

pub fn floor(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Floor, arg)
}

/// `ROUND(arg, :digits)`
pub fn round(arg: impl Into<Projection>, digits_param: impl Into<String>) -> Projection {
    Projection::Func {
        func: ScalarFunc::Round,
        args: vec![arg.into(), Projection::Param(digits_param.into())],
    }
}

pub fn sqrt(arg: impl Into<Projection>) -> Projection {
    func1(ScalarFunc::Sqrt, arg)
}

/// `POWER(arg, :exponent)`
pub fn power(arg: impl Into<Projection>, exponent_param: impl Into<String>) -> Projection {
    Projection::Func {
        func: ScalarFunc::Power,
        args: vec![arg.into(), Projection::Param(exponent_param.into())],
    }
}

/// `CAST(arg AS ty)`; `ty` is a type name such as `"bigint"`.
pub fn cast(arg: impl Into<Projection>, ty: impl Into<String>) -> Projection {
    Projection::Cast {
        inner: Box::new(arg.into()),
        ty: ty.into(),
    }
}

/// `COUNT(*)`
pub fn count_all() -> Agg {
    Agg::new(AggFunc::Count, None)
}

pub fn count(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::Count, Some(arg.into()))
}

pub fn count_distinct(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::CountDistinct, Some(arg.into()))
}

pub fn sum(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::Sum, Some(arg.into()))
}

pub fn avg(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::Avg, Some(arg.into()))
}

pub fn min(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::Min, Some(arg.into()))
}

pub fn max(arg: impl Into<Projection>) -> Agg {
    Agg::new(AggFunc::Max, Some(arg.into()))
}

pub fn case_when() -> CaseWhen {
    CaseWhen::default()
}

pub fn window() -> WindowSpec {
    WindowSpec::default()
}

pub fn row_number(over: WindowSpec) -> Projection {
    Projection::Window {
        func: WindowFunc::RowNumber,
        over,
    }
}

pub fn rank(over: WindowSpec) -> Projection {
    Projection::Window {
        func: WindowFunc::Rank,
        over,
    }
}

pub fn dense_rank(over: WindowSpec) -> Projection {
    Projection::Window {
        func: WindowFunc::DenseRank,
        over,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::c;
    use crate::schema::{ColumnMeta, TableSchema};

    fn schema() -> Schema {
        Schema::new(
            TableSchema::new("scores")
                .column(ColumnMeta::new("id").primary_key())
                .column(ColumnMeta::new("team"))
                .column(ColumnMeta::new("points")),
        )
        .unwrap()
    }

    #[test]
    fn cast_type_names() {
        assert_eq!(
            resolve_cast_type("double  precision").unwrap(),
            CastType::DoublePrecision
        );
        assert_eq!(resolve_cast_type("int8").unwrap(), CastType::BigInt);
        let err = cast(col("points"), "money").resolve(&schema()).unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::CastType));
        assert_eq!(err.name(), Some("money"));
    }

    #[test]
    fn nested_functions_resolve() {
        let e = upper(trim("team")).resolve(&schema()).unwrap();
        match e {
            ScalarExpr::Func { func, args } => {
                assert_eq!(func, ScalarFunc::Upper);
                let ScalarExpr::Func { func: inner, .. } = &args[0] else {
                    panic!("expected a nested function, got {:?}", args[0]);
                };
                assert_eq!(*inner, ScalarFunc::Trim);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_column_inside_aggregate_filter() {
        let err = Projection::from(sum("points").filter(c("teem", "=", "team")))
            .resolve(&schema())
            .unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::Field));
        assert_eq!(err.name(), Some("teem"));
    }

    #[test]
    fn window_direction_is_validated() {
        let err = rank(window().partition_by("team").order_by("points", "down"))
            .resolve(&schema())
            .unwrap_err();
        assert_eq!(err.kind(), Some(NameKind::Direction));
    }

    #[test]
    fn case_needs_a_branch() {
        let err = Projection::from(case_when().otherwise("none"))
            .resolve(&schema())
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidCondition(_)));
    }

    #[test]
    fn membership_is_not_an_expression_operator() {
        let err = op("points", "in", param("xs"))
            .resolve(&schema())
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidCondition(_)));
    }
}
