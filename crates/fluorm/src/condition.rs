//! String-keyed predicates and boolean grouping.
//!
//! A [`Condition`] is an unvalidated description of one predicate. Builders
//! resolve it against their [`Schema`] when it is attached, so a typo in a
//! column, operator or parameter name is reported with the offending name.
//!
//! ```ignore
//! use fluorm::condition::{c, or, null};
//!
//! let q = users
//!     .select()
//!     .where_("age", ">=", "min_age")
//!     .where_cond(or([c("status", "=", "status"), null("deleted_at")]));
//! ```

use crate::ast::{AggFunc, BinaryOp, Cond, Direction, Logic, NullsOrder};
use crate::error::{BuildError, NameKind};
use crate::schema::Schema;

/// Operator vocabulary, matched case-insensitively after trimming.
pub const OPERATORS: &[(&str, BinaryOp)] = &[
    ("=", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    ("<>", BinaryOp::Ne),
    (">", BinaryOp::Gt),
    (">=", BinaryOp::Ge),
    ("<", BinaryOp::Lt),
    ("<=", BinaryOp::Le),
    ("LIKE", BinaryOp::Like),
    ("NOT LIKE", BinaryOp::NotLike),
    ("ILIKE", BinaryOp::ILike),
    ("NOT ILIKE", BinaryOp::NotILike),
    ("IN", BinaryOp::In),
    ("NOT IN", BinaryOp::NotIn),
    ("~", BinaryOp::Match),
    ("~*", BinaryOp::IMatch),
    ("!~", BinaryOp::NotMatch),
    ("!~*", BinaryOp::NotIMatch),
    ("@>", BinaryOp::Contains),
    ("<@", BinaryOp::ContainedBy),
    ("&&", BinaryOp::Overlaps),
    ("<->", BinaryOp::L2Distance),
    ("<#>", BinaryOp::InnerProduct),
    ("<=>", BinaryOp::CosineDistance),
    ("<+>", BinaryOp::L1Distance),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
];

pub const DIRECTIONS: &[(&str, Direction)] = &[("ASC", Direction::Asc), ("DESC", Direction::Desc)];

pub const NULLS_ORDERINGS: &[(&str, NullsOrder)] = &[
    ("FIRST", NullsOrder::First),
    ("LAST", NullsOrder::Last),
    ("NULLS FIRST", NullsOrder::First),
    ("NULLS LAST", NullsOrder::Last),
];

pub const AGGREGATES: &[(&str, AggFunc)] = &[
    ("COUNT", AggFunc::Count),
    ("COUNT DISTINCT", AggFunc::CountDistinct),
    ("SUM", AggFunc::Sum),
    ("AVG", AggFunc::Avg),
    ("MIN", AggFunc::Min),
    ("MAX", AggFunc::Max),
];

/// Uppercase and collapse runs of whitespace.
fn normalize(token: &str) -> String {
    token
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

pub(crate) fn lookup<T: Copy>(
    table: &[(&str, T)],
    kind: NameKind,
    token: &str,
) -> Result<T, BuildError> {
    let key = normalize(token);
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, v)| *v)
        .ok_or_else(|| BuildError::unresolved(kind, token))
}

pub fn resolve_operator(token: &str) -> Result<BinaryOp, BuildError> {
    lookup(OPERATORS, NameKind::Operator, token)
}

/// An operator usable in WHERE/HAVING.
pub(crate) fn resolve_predicate(token: &str) -> Result<BinaryOp, BuildError> {
    let op = resolve_operator(token)?;
    if !op.is_predicate() {
        let msg = format!("operator '{}' is not a predicate", token.trim());
        return Err(BuildError::InvalidCondition(msg));
    }
    Ok(op)
}

pub fn resolve_direction(token: &str) -> Result<Direction, BuildError> {
    lookup(DIRECTIONS, NameKind::Direction, token)
}

pub fn resolve_nulls(token: &str) -> Result<NullsOrder, BuildError> {
    lookup(NULLS_ORDERINGS, NameKind::NullsOrdering, token)
}

pub fn resolve_aggregate(token: &str) -> Result<AggFunc, BuildError> {
    lookup(AGGREGATES, NameKind::AggregateFunction, token)
}

/// An unvalidated predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Compare {
        field: String,
        op: String,
        param: String,
    },
    FieldCompare {
        left: String,
        op: String,
        right: String,
    },
    Null {
        field: String,
        negated: bool,
    },
    Between {
        field: String,
        low: String,
        high: String,
        negated: bool,
    },
    Group {
        logic: Logic,
        members: Vec<Condition>,
    },
}

/// `field op :param`
pub fn c(field: impl Into<String>, op: impl Into<String>, param: impl Into<String>) -> Condition {
    Condition::Compare {
        field: field.into(),
        op: op.into(),
        param: param.into(),
    }
}

/// `left op right`, comparing two columns.
pub fn cf(left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Condition {
    Condition::FieldCompare {
        left: left.into(),
        op: op.into(),
        right: right.into(),
    }
}

pub fn null(field: impl Into<String>) -> Condition {
    Condition::Null {
        field: field.into(),
        negated: false,
    }
}

pub fn not_null(field: impl Into<String>) -> Condition {
    Condition::Null {
        field: field.into(),
        negated: true,
    }
}

pub fn between(
    field: impl Into<String>,
    low: impl Into<String>,
    high: impl Into<String>,
) -> Condition {
    Condition::Between {
        field: field.into(),
        low: low.into(),
        high: high.into(),
        negated: false,
    }
}

pub fn not_between(
    field: impl Into<String>,
    low: impl Into<String>,
    high: impl Into<String>,
) -> Condition {
    Condition::Between {
        field: field.into(),
        low: low.into(),
        high: high.into(),
        negated: true,
    }
}

/// AND group. An empty group resolves to nothing.
pub fn and(members: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Group {
        logic: Logic::And,
        members: members.into_iter().collect(),
    }
}

/// OR group. An empty group resolves to nothing.
pub fn or(members: impl IntoIterator<Item = Condition>) -> Condition {
    Condition::Group {
        logic: Logic::Or,
        members: members.into_iter().collect(),
    }
}

impl Condition {
    /// Resolve against `schema`.
    ///
    /// Returns `Ok(None)` for a group with no effective members. A group
    /// with one member resolves to that member. Any failing member fails
    /// the whole group.
    pub fn resolve(&self, schema: &Schema) -> Result<Option<Cond>, BuildError> {
        let cond = match self {
            Condition::Compare { field, op, param } => Cond::Compare {
                field: schema.resolve_field(field)?,
                op: resolve_predicate(op)?,
                param: schema.resolve_param(param)?,
            },
            Condition::FieldCompare { left, op, right } => {
                let left = schema.resolve_field(left)?;
                let op = resolve_predicate(op)?;
                if op.is_membership() {
                    return Err(BuildError::InvalidCondition(format!(
                        "'{}' needs a parameter on the right-hand side",
                        op.as_sql()
                    )));
                }
                Cond::FieldCompare {
                    left,
                    op,
                    right: schema.resolve_field(right)?,
                }
            }
            Condition::Null { field, negated } => Cond::Null {
                field: schema.resolve_field(field)?,
                negated: *negated,
            },
            Condition::Between {
                field,
                low,
                high,
                negated,
            } => Cond::Between {
                field: schema.resolve_field(field)?,
                low: schema.resolve_param(low)?,
                high: schema.resolve_param(high)?,
                negated: *negated,
            },
            Condition::Group { logic, members } => {
                let mut conds = Vec::with_capacity(members.len());
                for m in members {
                    if let Some(cond) = m.resolve(schema)? {
                        conds.push(cond);
                    }
                }
                return Ok(match conds.len() {
                    0 => None,
                    1 => conds.pop(),
                    _ => Some(Cond::Group {
                        logic: *logic,
                        conds,
                    }),
                });
            }
        };
        Ok(Some(cond))
    }
}
