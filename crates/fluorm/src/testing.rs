//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::render::SqlRenderer;
use crate::row::{FromRow, RowExt};
use crate::schema::{ColumnMeta, Model, TableSchema};
use crate::table::Table;

#[derive(Default)]
struct Script {
    affected: VecDeque<u64>,
    statements: Vec<(String, usize)>,
}

/// A client that records statements instead of running them.
///
/// `query` yields no rows; `execute` pops scripted affected counts and
/// returns 0 once they run out.
#[derive(Default)]
pub(crate) struct DummyClient {
    script: Mutex<Script>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl DummyClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn affected(self, counts: impl IntoIterator<Item = u64>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .affected
            .extend(counts);
        self
    }

    /// Every call fails with `OrmError::Other(message)`.
    pub(crate) fn fail_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub(crate) fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(sql, bound argument count)` for every call, in order.
    pub(crate) fn statements(&self) -> Vec<(String, usize)> {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .statements
            .clone()
    }

    fn record(&self, sql: &str, args: usize) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .statements
            .push((sql.to_string(), args));
    }

    fn next_affected(&self) -> u64 {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .affected
            .pop_front()
            .unwrap_or(0)
    }

    async fn pause(&self) -> OrmResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(OrmError::Other(message.clone())),
            None => Ok(()),
        }
    }
}

impl GenericClient for DummyClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.record(sql, params.len());
        self.pause().await?;
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        self.record(sql, params.len());
        self.pause().await?;
        Ok(self.next_affected())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) age: Option<i32>,
}

impl FromRow for User {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(Self {
            id: row.try_get_column("id")?,
            email: row.try_get_column("email")?,
            age: row.try_get_column("age")?,
        })
    }
}

impl Model for User {
    fn table_schema() -> TableSchema {
        TableSchema::new("users")
            .column(ColumnMeta::new("id").primary_key())
            .column(ColumnMeta::new("email"))
            .column(ColumnMeta::new("age").nullable())
    }
}

pub(crate) fn users_table() -> Table<User> {
    Table::for_model(SqlRenderer::postgres()).expect("users schema is valid")
}

pub(crate) fn redshift_users_table() -> Table<User> {
    Table::for_model(SqlRenderer::redshift()).expect("users schema is valid")
}
