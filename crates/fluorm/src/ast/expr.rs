//! Resolved conditions and scalar expressions.

use super::{Field, ParamRef};

/// Binary operators understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    ILike,
    NotILike,
    In,
    NotIn,
    Match,
    IMatch,
    NotMatch,
    NotIMatch,
    Contains,
    ContainedBy,
    Overlaps,
    L2Distance,
    InnerProduct,
    CosineDistance,
    L1Distance,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// SQL spelling of the operator.
    pub fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Like => "LIKE",
            BinaryOp::NotLike => "NOT LIKE",
            BinaryOp::ILike => "ILIKE",
            BinaryOp::NotILike => "NOT ILIKE",
            BinaryOp::In => "IN",
            BinaryOp::NotIn => "NOT IN",
            BinaryOp::Match => "~",
            BinaryOp::IMatch => "~*",
            BinaryOp::NotMatch => "!~",
            BinaryOp::NotIMatch => "!~*",
            BinaryOp::Contains => "@>",
            BinaryOp::ContainedBy => "<@",
            BinaryOp::Overlaps => "&&",
            BinaryOp::L2Distance => "<->",
            BinaryOp::InnerProduct => "<#>",
            BinaryOp::CosineDistance => "<=>",
            BinaryOp::L1Distance => "<+>",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    /// Whether `a op b` is a boolean predicate usable in WHERE/HAVING.
    pub fn is_predicate(self) -> bool {
        !self.is_vector() && !self.is_arithmetic()
    }

    /// pgvector distance operators.
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            BinaryOp::L2Distance
                | BinaryOp::InnerProduct
                | BinaryOp::CosineDistance
                | BinaryOp::L1Distance
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    /// `IN` / `NOT IN`, which bind a single array parameter.
    pub fn is_membership(self) -> bool {
        matches!(self, BinaryOp::In | BinaryOp::NotIn)
    }
}

/// Boolean connective for condition groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub fn as_sql(self) -> &'static str {
        match self {
            Logic::And => " AND ",
            Logic::Or => " OR ",
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    CountDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggFunc::Count | AggFunc::CountDistinct => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

/// A resolved predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// `field op :param`
    Compare {
        field: Field,
        op: BinaryOp,
        param: ParamRef,
    },
    /// `left op right`, both columns
    FieldCompare {
        left: Field,
        op: BinaryOp,
        right: Field,
    },
    /// `field IS [NOT] NULL`
    Null { field: Field, negated: bool },
    /// `field = :param`, where NULL also matches NULL
    NullSafeEq { field: Field, param: ParamRef },
    /// `field [NOT] BETWEEN :low AND :high`
    Between {
        field: Field,
        low: ParamRef,
        high: ParamRef,
        negated: bool,
    },
    /// `AGG(field) op :param`, used by HAVING
    Aggregate {
        func: AggFunc,
        field: Option<Field>,
        op: BinaryOp,
        param: ParamRef,
    },
    /// AND/OR group
    Group { logic: Logic, conds: Vec<Cond> },
}

impl Cond {
    /// Combine conditions with AND: `None` for an empty list, the condition
    /// itself for a single one.
    pub fn all(mut conds: Vec<Cond>) -> Option<Cond> {
        match conds.len() {
            0 => None,
            1 => conds.pop(),
            _ => Some(Cond::Group {
                logic: Logic::And,
                conds,
            }),
        }
    }
}

/// Scalar functions for derived columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarFunc {
    Upper,
    Lower,
    Trim,
    Length,
    Abs,
    Ceil,
    Floor,
    Round,
    Sqrt,
    Power,
}

impl ScalarFunc {
    pub fn sql_name(self) -> &'static str {
        match self {
            ScalarFunc::Upper => "UPPER",
            ScalarFunc::Lower => "LOWER",
            ScalarFunc::Trim => "TRIM",
            ScalarFunc::Length => "LENGTH",
            ScalarFunc::Abs => "ABS",
            ScalarFunc::Ceil => "CEIL",
            ScalarFunc::Floor => "FLOOR",
            ScalarFunc::Round => "ROUND",
            ScalarFunc::Sqrt => "SQRT",
            ScalarFunc::Power => "POWER",
        }
    }
}

/// Target types for `CAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    Text,
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    DoublePrecision,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Uuid,
    Jsonb,
}

impl CastType {
    pub fn as_sql(self) -> &'static str {
        match self {
            CastType::Text => "TEXT",
            CastType::SmallInt => "SMALLINT",
            CastType::Integer => "INTEGER",
            CastType::BigInt => "BIGINT",
            CastType::Numeric => "NUMERIC",
            CastType::Real => "REAL",
            CastType::DoublePrecision => "DOUBLE PRECISION",
            CastType::Boolean => "BOOLEAN",
            CastType::Date => "DATE",
            CastType::Timestamp => "TIMESTAMP",
            CastType::TimestampTz => "TIMESTAMPTZ",
            CastType::Uuid => "UUID",
            CastType::Jsonb => "JSONB",
        }
    }
}

/// Ranking window functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunc {
    RowNumber,
    Rank,
    DenseRank,
}

impl WindowFunc {
    pub fn sql_name(self) -> &'static str {
        match self {
            WindowFunc::RowNumber => "ROW_NUMBER",
            WindowFunc::Rank => "RANK",
            WindowFunc::DenseRank => "DENSE_RANK",
        }
    }
}

/// `OVER (PARTITION BY .. ORDER BY ..)`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Window {
    pub partition_by: Vec<Field>,
    pub order_by: Vec<OrderItem>,
}

/// A resolved scalar expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Column(Field),
    Param(ParamRef),
    Func {
        func: ScalarFunc,
        args: Vec<ScalarExpr>,
    },
    Cast {
        expr: Box<ScalarExpr>,
        ty: CastType,
    },
    Binary {
        left: Box<ScalarExpr>,
        op: BinaryOp,
        right: Box<ScalarExpr>,
    },
    Aggregate {
        func: AggFunc,
        arg: Option<Box<ScalarExpr>>,
        filter: Option<Box<Cond>>,
        over: Option<Window>,
    },
    Case {
        whens: Vec<(Cond, ScalarExpr)>,
        otherwise: Option<Box<ScalarExpr>>,
    },
    Window {
        func: WindowFunc,
        over: Window,
    },
}

/// One projected column.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn column(field: Field) -> Self {
        Self {
            expr: ScalarExpr::Column(field),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: ScalarExpr,
    pub direction: Direction,
    pub nulls: Option<NullsOrder>,
}
