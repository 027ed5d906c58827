use std::fmt;
use std::time::Duration;

/// The logical operation a builder executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    SelectOne,
    SelectMany,
    Insert,
    InsertBatch,
    Update,
    UpdateBatch,
    Delete,
    DeleteBatch,
    Aggregate,
    Compound,
}

impl OperationKind {
    pub const COUNT: usize = 10;

    pub const ALL: [OperationKind; Self::COUNT] = [
        OperationKind::SelectOne,
        OperationKind::SelectMany,
        OperationKind::Insert,
        OperationKind::InsertBatch,
        OperationKind::Update,
        OperationKind::UpdateBatch,
        OperationKind::Delete,
        OperationKind::DeleteBatch,
        OperationKind::Aggregate,
        OperationKind::Compound,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::SelectOne => "select_one",
            OperationKind::SelectMany => "select_many",
            OperationKind::Insert => "insert",
            OperationKind::InsertBatch => "insert_batch",
            OperationKind::Update => "update",
            OperationKind::UpdateBatch => "update_batch",
            OperationKind::Delete => "delete",
            OperationKind::DeleteBatch => "delete_batch",
            OperationKind::Aggregate => "aggregate",
            OperationKind::Compound => "compound",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// The verb used by the mutation-safety error.
    pub(crate) fn verb(self) -> &'static str {
        match self {
            OperationKind::Update | OperationKind::UpdateBatch => "update",
            OperationKind::Delete | OperationKind::DeleteBatch => "delete",
            OperationKind::Insert | OperationKind::InsertBatch => "insert",
            _ => "select",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What is being executed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub table: String,
    pub operation: OperationKind,
    /// The primary statement of the operation.
    pub sql: String,
    pub param_count: usize,
}

impl QueryContext {
    pub fn new(
        table: impl Into<String>,
        operation: OperationKind,
        sql: impl Into<String>,
        param_count: usize,
    ) -> Self {
        Self {
            table: table.into(),
            operation,
            sql: sql.into(),
            param_count,
        }
    }

    /// `"<operation> <table>"`, used to wrap execution errors.
    pub fn label(&self) -> String {
        format!("{} {}", self.operation, self.table)
    }
}

/// Maximum length for error messages in `QueryResult::Error`.
const MAX_ERROR_LEN: usize = 512;

/// Outcome of one logical operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    /// Rows returned.
    Rows(usize),
    /// Rows affected by a mutation.
    Affected(u64),
    /// Failure text, truncated to 512 bytes.
    Error(String),
}

impl QueryResult {
    /// Create an error result, truncating the message to avoid monitoring data explosion.
    pub fn error(msg: String) -> Self {
        if msg.len() > MAX_ERROR_LEN {
            Self::Error(format!("{}...", super::truncate_bytes(&msg, MAX_ERROR_LEN)))
        } else {
            Self::Error(msg)
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryResult::Error(_))
    }
}

impl fmt::Display for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryResult::Rows(n) => write!(f, "{n} rows"),
            QueryResult::Affected(n) => write!(f, "{n} affected"),
            QueryResult::Error(e) => write!(f, "error: {e}"),
        }
    }
}

/// Receives start/completion events for every logical operation.
///
/// Monitors are advisory: they cannot fail and cannot change the outcome of
/// the operation they observe.
pub trait QueryMonitor: Send + Sync {
    /// Called before the first statement of an operation is sent.
    fn on_query_start(&self, _ctx: &QueryContext) {}

    /// Called once the operation finished, successfully or not.
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult);

    /// Called when an operation exceeded the configured slow threshold.
    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {}
}
