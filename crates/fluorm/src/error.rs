//! Error types for fluorm

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fluorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// The kind of symbolic name that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Table,
    Field,
    Param,
    Operator,
    Direction,
    NullsOrdering,
    AggregateFunction,
    CastType,
    Alias,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameKind::Table => "table",
            NameKind::Field => "field",
            NameKind::Param => "param",
            NameKind::Operator => "operator",
            NameKind::Direction => "direction",
            NameKind::NullsOrdering => "nulls ordering",
            NameKind::AggregateFunction => "aggregate function",
            NameKind::CastType => "cast type",
            NameKind::Alias => "alias",
        };
        f.write_str(s)
    }
}

/// Errors recorded by a builder chain.
///
/// A builder keeps the first one it sees and reports it from `render`/`exec`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A field/param/operator/... name that is not known.
    #[error("unknown {kind} '{name}'")]
    Unresolved { kind: NameKind, name: String },

    /// A condition or expression that cannot be built from its parts.
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// The builder is missing a required clause.
    #[error("incomplete query: {0}")]
    Incomplete(String),

    /// Table metadata that cannot back a schema (bad or duplicate names).
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl BuildError {
    pub(crate) fn unresolved(kind: NameKind, name: impl Into<String>) -> Self {
        Self::Unresolved {
            kind,
            name: name.into(),
        }
    }

    /// The offending name, for `Unresolved` errors.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Unresolved { name, .. } => Some(name),
            _ => None,
        }
    }

    /// The kind of name that failed, for `Unresolved` errors.
    pub fn kind(&self) -> Option<NameKind> {
        match self {
            Self::Unresolved { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Error types for query building and execution
#[derive(Debug, Error)]
pub enum OrmError {
    /// Validation or condition-construction error captured by a builder
    #[error(transparent)]
    Build(#[from] BuildError),

    /// UPDATE/DELETE attempted without any WHERE condition
    #[error("refusing to {operation} without a WHERE clause")]
    MissingWhere { operation: &'static str },

    /// A rendered statement needs a parameter the caller did not supply
    #[error("missing value for parameter '{0}'")]
    MissingParam(String),

    /// The target dialect cannot express the requested construct
    #[error("render error: {0}")]
    Render(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Execution error wrapped with the logical operation that issued it
    #[error("{operation}: {source}")]
    Exec {
        operation: String,
        #[source]
        source: Box<OrmError>,
    },

    /// Zero rows where exactly one was required
    #[error("Not found: {0}")]
    NotFound(String),

    /// More rows than expected
    #[error("expected exactly {expected} row, found {got}")]
    TooManyRows { expected: usize, got: usize },

    /// A batch stopped at `index`; `affected` rows were applied before it
    #[error("batch item {index} failed after {affected} rows affected: {source}")]
    Batch {
        index: usize,
        affected: u64,
        #[source]
        source: Box<OrmError>,
    },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a too-many-rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Create a rendering error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render(message.into())
    }

    /// Wrap an error with the logical operation that produced it.
    pub fn exec(operation: impl Into<String>, source: OrmError) -> Self {
        Self::Exec {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through `Exec` and `Batch` wrappers.
    pub fn root(&self) -> &OrmError {
        match self {
            Self::Exec { source, .. } | Self::Batch { source, .. } => source.root(),
            other => other,
        }
    }

    /// The builder error, if this is one.
    pub fn as_build_error(&self) -> Option<&BuildError> {
        match self.root() {
            Self::Build(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self.root(), Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound(_))
    }

    /// Check if this is a too-many-rows error
    pub fn is_too_many_rows(&self) -> bool {
        matches!(self.root(), Self::TooManyRows { .. })
    }

    /// Check if this is the mutation-without-WHERE error
    pub fn is_missing_where(&self) -> bool {
        matches!(self.root(), Self::MissingWhere { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}
