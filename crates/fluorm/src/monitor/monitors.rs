use super::truncate_bytes;
use super::types::{OperationKind, QueryContext, QueryMonitor, QueryResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::Level;

/// A monitor that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMonitor;

impl QueryMonitor for NoopMonitor {
    fn on_query_complete(&self, _ctx: &QueryContext, _duration: Duration, _result: &QueryResult) {}
}

/// Emits `tracing` events with target `fluorm.query`.
///
/// Completions are logged at `level` (default `DEBUG`), failures at `WARN`
/// and slow operations at `WARN`.
#[derive(Debug, Clone)]
pub struct TracingMonitor {
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for TracingMonitor {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl TracingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn truncate_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }
}

impl QueryMonitor for TracingMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        tracing::trace!(
            target: "fluorm.query",
            table = %ctx.table,
            operation = %ctx.operation,
            param_count = ctx.param_count,
            "start"
        );
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let sql = self.truncate_sql(&ctx.sql);
        let level = if result.is_error() {
            Level::WARN
        } else {
            self.level
        };
        emit_at_level!(
            level,
            target: "fluorm.query",
            table = %ctx.table,
            operation = %ctx.operation,
            elapsed = ?duration,
            outcome = %result,
            sql = %sql,
        );
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        tracing::warn!(
            target: "fluorm.query",
            table = %ctx.table,
            operation = %ctx.operation,
            elapsed = ?duration,
            sql = %self.truncate_sql(&ctx.sql),
            "slow query"
        );
    }
}

/// Counts operations and their outcomes.
#[derive(Debug)]
pub struct StatsMonitor {
    total: AtomicU64,
    failed: AtomicU64,
    slow: AtomicU64,
    rows_returned: AtomicU64,
    rows_affected: AtomicU64,
    total_duration_nanos: AtomicU64,
    max_duration_nanos: AtomicU64,
    by_operation: [AtomicU64; OperationKind::COUNT],
    slowest: Mutex<Option<String>>,
}

/// Snapshot of [`StatsMonitor`] counters.
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub slow_queries: u64,
    pub rows_returned: u64,
    pub rows_affected: u64,
    pub total_duration: Duration,
    pub max_duration: Duration,
    /// Label of the slowest operation.
    pub slowest_query: Option<String>,
    /// Count per operation kind, only kinds that ran.
    pub by_operation: Vec<(OperationKind, u64)>,
}

impl QueryStats {
    pub fn count(&self, kind: OperationKind) -> u64 {
        self.by_operation
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}

impl StatsMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total.load(Ordering::Relaxed),
            failed_queries: self.failed.load(Ordering::Relaxed),
            slow_queries: self.slow.load(Ordering::Relaxed),
            rows_returned: self.rows_returned.load(Ordering::Relaxed),
            rows_affected: self.rows_affected.load(Ordering::Relaxed),
            total_duration: Duration::from_nanos(self.total_duration_nanos.load(Ordering::Relaxed)),
            max_duration: Duration::from_nanos(self.max_duration_nanos.load(Ordering::Relaxed)),
            slowest_query: self
                .slowest
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
            by_operation: OperationKind::ALL
                .iter()
                .filter_map(|k| {
                    let n = self.by_operation[k.index()].load(Ordering::Relaxed);
                    (n > 0).then_some((*k, n))
                })
                .collect(),
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.slow.store(0, Ordering::Relaxed);
        self.rows_returned.store(0, Ordering::Relaxed);
        self.rows_affected.store(0, Ordering::Relaxed);
        self.total_duration_nanos.store(0, Ordering::Relaxed);
        self.max_duration_nanos.store(0, Ordering::Relaxed);
        for counter in &self.by_operation {
            counter.store(0, Ordering::Relaxed);
        }
        *self.slowest.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Default for StatsMonitor {
    fn default() -> Self {
        Self {
            total: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            slow: AtomicU64::new(0),
            rows_returned: AtomicU64::new(0),
            rows_affected: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
            max_duration_nanos: AtomicU64::new(0),
            by_operation: std::array::from_fn(|_| AtomicU64::new(0)),
            slowest: Mutex::new(None),
        }
    }
}

impl QueryMonitor for StatsMonitor {
    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        let nanos = saturating_nanos(duration);

        self.total.fetch_add(1, Ordering::Relaxed);
        self.by_operation[ctx.operation.index()].fetch_add(1, Ordering::Relaxed);
        let prev = self
            .total_duration_nanos
            .fetch_add(nanos, Ordering::Relaxed);
        if prev.checked_add(nanos).is_none() {
            self.total_duration_nanos.store(u64::MAX, Ordering::Relaxed);
        }

        match result {
            QueryResult::Rows(n) => {
                self.rows_returned.fetch_add(*n as u64, Ordering::Relaxed);
            }
            QueryResult::Affected(n) => {
                self.rows_affected.fetch_add(*n, Ordering::Relaxed);
            }
            QueryResult::Error(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let mut current_max = self.max_duration_nanos.load(Ordering::Relaxed);
        while nanos > current_max {
            match self.max_duration_nanos.compare_exchange_weak(
                current_max,
                nanos,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    *self.slowest.lock().unwrap_or_else(|e| e.into_inner()) = Some(ctx.label());
                    break;
                }
                Err(updated) => current_max = updated,
            }
        }
    }

    fn on_slow_query(&self, _ctx: &QueryContext, _duration: Duration) {
        self.slow.fetch_add(1, Ordering::Relaxed);
    }
}

impl<M: QueryMonitor + ?Sized> QueryMonitor for Arc<M> {
    fn on_query_start(&self, ctx: &QueryContext) {
        (**self).on_query_start(ctx);
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        (**self).on_query_complete(ctx, duration, result);
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        (**self).on_slow_query(ctx, duration);
    }
}

/// Fans events out to several monitors, in insertion order.
#[derive(Default)]
pub struct CompositeMonitor {
    monitors: Vec<Arc<dyn QueryMonitor>>,
}

impl CompositeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add<M: QueryMonitor + 'static>(mut self, monitor: M) -> Self {
        self.monitors.push(Arc::new(monitor));
        self
    }

    pub fn add_arc(mut self, monitor: Arc<dyn QueryMonitor>) -> Self {
        self.monitors.push(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl QueryMonitor for CompositeMonitor {
    fn on_query_start(&self, ctx: &QueryContext) {
        for monitor in &self.monitors {
            monitor.on_query_start(ctx);
        }
    }

    fn on_query_complete(&self, ctx: &QueryContext, duration: Duration, result: &QueryResult) {
        for monitor in &self.monitors {
            monitor.on_query_complete(ctx, duration, result);
        }
    }

    fn on_slow_query(&self, ctx: &QueryContext, duration: Duration) {
        for monitor in &self.monitors {
            monitor.on_slow_query(ctx, duration);
        }
    }
}
