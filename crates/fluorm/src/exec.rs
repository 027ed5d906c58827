//! Statement execution shared by all builders.
//!
//! An [`Op`] covers one logical operation. It reports the operation to the
//! table's monitor, applies the configured timeout to each round-trip and
//! wraps driver failures with the operation label (`"update users: ..."`).

use std::future::Future;
use std::time::Instant;

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::monitor::{OperationKind, QueryContext, QueryResult};
use crate::params::Params;
use crate::render::Rendered;
use crate::table::TableInner;

pub(crate) struct Op<'a> {
    env: &'a TableInner,
    ctx: QueryContext,
    label: String,
}

impl<'a> Op<'a> {
    pub(crate) fn new(env: &'a TableInner, operation: OperationKind, primary: &Rendered) -> Self {
        let ctx = QueryContext::new(
            env.schema.table_name(),
            operation,
            primary.sql.as_str(),
            primary.params.len(),
        );
        let label = ctx.label();
        Self { env, ctx, label }
    }

    /// Drive `fut` as this operation, notifying the monitor around it.
    pub(crate) async fn run<T, F>(
        &self,
        fut: F,
        summarize: impl FnOnce(&T) -> QueryResult,
    ) -> OrmResult<T>
    where
        F: Future<Output = OrmResult<T>>,
    {
        let config = &self.env.config;
        let monitor = &self.env.monitor;

        if config.monitoring_enabled {
            monitor.on_query_start(&self.ctx);
        }

        let start = Instant::now();
        let result = fut.await;
        let duration = start.elapsed();

        if config.monitoring_enabled {
            let outcome = match &result {
                Ok(v) => summarize(v),
                Err(e) => QueryResult::error(e.to_string()),
            };
            monitor.on_query_complete(&self.ctx, duration, &outcome);
            if let Some(threshold) = config.slow_query_threshold {
                if duration > threshold {
                    monitor.on_slow_query(&self.ctx, duration);
                }
            }
        }
        result
    }

    pub(crate) async fn query<C: GenericClient>(
        &self,
        client: &C,
        sql: &str,
        args: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<Vec<Row>> {
        self.with_timeout(client, client.query(sql, args))
            .await
            .map_err(|e| OrmError::exec(self.label.as_str(), e))
    }

    pub(crate) async fn execute<C: GenericClient>(
        &self,
        client: &C,
        sql: &str,
        args: &[&(dyn ToSql + Sync)],
    ) -> OrmResult<u64> {
        self.with_timeout(client, client.execute(sql, args))
            .await
            .map_err(|e| OrmError::exec(self.label.as_str(), e))
    }

    async fn with_timeout<C, T, F>(&self, client: &C, future: F) -> OrmResult<T>
    where
        C: GenericClient,
        F: Future<Output = OrmResult<T>>,
    {
        match self.env.config.query_timeout {
            Some(timeout) => {
                tokio::pin!(future);
                tokio::select! {
                    result = &mut future => result,
                    _ = tokio::time::sleep(timeout) => {
                        if let Some(cancel_token) = client.cancel_token() {
                            tokio::spawn(async move {
                                let _ = cancel_token.cancel_query(tokio_postgres::NoTls).await;
                            });
                        }
                        Err(OrmError::Timeout(timeout))
                    }
                }
            }
            None => future.await,
        }
    }

    /// Run `sql` once per parameter set, in order, summing affected rows.
    ///
    /// Stops at the first failure and reports its index together with the
    /// rows affected before it. Nothing is rolled back here.
    pub(crate) async fn batch<C: GenericClient>(
        &self,
        client: &C,
        rendered: &Rendered,
        sets: &[Params],
    ) -> OrmResult<u64> {
        let mut affected = 0u64;
        for (index, set) in sets.iter().enumerate() {
            let step = async {
                let args = set.bind(&rendered.params)?;
                self.execute(client, &rendered.sql, &args).await
            };
            match step.await {
                Ok(n) => affected += n,
                Err(source) => {
                    return Err(OrmError::Batch {
                        index,
                        affected,
                        source: Box::new(source),
                    });
                }
            }
        }
        Ok(affected)
    }
}

/// Require exactly one item; `missing` describes the zero case.
pub(crate) fn exactly_one<T>(items: Vec<T>, missing: &str) -> OrmResult<T> {
    let got = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), got) {
        (Some(item), 1) => Ok(item),
        (None, _) => Err(OrmError::not_found(missing)),
        _ => Err(OrmError::too_many_rows(1, got)),
    }
}

/// Require a rows-affected count of exactly one.
pub(crate) fn exactly_one_affected(n: u64, missing: &str) -> OrmResult<()> {
    match n {
        0 => Err(OrmError::not_found(missing)),
        1 => Ok(()),
        n => Err(OrmError::too_many_rows(1, usize::try_from(n).unwrap_or(usize::MAX))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{ExecConfig, StatsMonitor};
    use crate::testing::{DummyClient, users_table};
    use std::sync::Arc;
    use std::time::Duration;

    fn rendered(sql: &str, params: &[&str]) -> Rendered {
        Rendered {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn cardinality() {
        assert_eq!(exactly_one(vec![7], "none").unwrap(), 7);

        let err = exactly_one(Vec::<i32>::new(), "no rows found").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: no rows found");

        let err = exactly_one(vec![1, 2, 3], "none").unwrap_err();
        assert!(matches!(err, OrmError::TooManyRows { got: 3, .. }));

        assert!(exactly_one_affected(1, "x").is_ok());
        assert!(exactly_one_affected(0, "x").unwrap_err().is_not_found());
        assert!(exactly_one_affected(4, "x").unwrap_err().is_too_many_rows());
    }

    #[tokio::test]
    async fn batch_sums_in_order() {
        let table = users_table();
        let client = DummyClient::new().affected([2, 0, 3]);
        let r = rendered("UPDATE x SET a = $1 WHERE id = $2", &["a", "id"]);
        let op = Op::new(&table.inner, OperationKind::UpdateBatch, &r);

        let sets: Vec<Params> = (0..3i64)
            .map(|i| Params::new().set("a", i).set("id", i))
            .collect();
        assert_eq!(op.batch(&client, &r, &sets).await.unwrap(), 5);
        assert_eq!(client.statements().len(), 3);
    }

    #[tokio::test]
    async fn batch_stops_at_first_failure() {
        let table = users_table();
        let client = DummyClient::new().affected([2, 1]);
        let r = rendered("DELETE FROM x WHERE id = $1", &["id"]);
        let op = Op::new(&table.inner, OperationKind::DeleteBatch, &r);

        let sets = vec![
            Params::new().set("id", 1i64),
            Params::new().set("id", 2i64),
            Params::new().set("other", 3i64),
            Params::new().set("id", 4i64),
        ];
        match op.batch(&client, &r, &sets).await.unwrap_err() {
            OrmError::Batch {
                index,
                affected,
                source,
            } => {
                assert_eq!(index, 2);
                assert_eq!(affected, 3);
                assert!(matches!(*source, OrmError::MissingParam(ref n) if n == "id"));
            }
            other => panic!("expected batch error, got {other:?}"),
        }
        // the fourth set never ran
        assert_eq!(client.statements().len(), 2);
    }

    #[tokio::test]
    async fn driver_errors_are_wrapped_with_the_operation() {
        let table = users_table();
        let client = DummyClient::new().fail_with("connection reset");
        let r = rendered("SELECT 1", &[]);
        let op = Op::new(&table.inner, OperationKind::SelectMany, &r);

        let err = op.query(&client, &r.sql, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "select_many users: connection reset");
    }

    #[tokio::test]
    async fn timeout_fires() {
        let table = users_table()
            .with_config(ExecConfig::new().with_query_timeout(Duration::from_millis(10)));
        let client = DummyClient::new().delay(Duration::from_secs(5));
        let r = rendered("SELECT 1", &[]);
        let op = Op::new(&table.inner, OperationKind::SelectMany, &r);

        let err = op.query(&client, &r.sql, &[]).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn monitor_sees_one_event_per_operation() {
        let stats = Arc::new(StatsMonitor::new());
        let table = users_table()
            .with_monitor_arc(stats.clone())
            .with_config(ExecConfig::new().with_slow_query_threshold(Duration::ZERO));
        let client = DummyClient::new().affected([1, 1]);
        let r = rendered("DELETE FROM x WHERE id = $1", &["id"]);
        let op = Op::new(&table.inner, OperationKind::DeleteBatch, &r);

        let sets = vec![Params::new().set("id", 1i64), Params::new().set("id", 2i64)];
        let n = op
            .run(op.batch(&client, &r, &sets), |n| QueryResult::Affected(*n))
            .await
            .unwrap();
        assert_eq!(n, 2);

        let s = stats.stats();
        assert_eq!(s.total_queries, 1);
        assert_eq!(s.rows_affected, 2);
        assert_eq!(s.count(OperationKind::DeleteBatch), 1);
        assert_eq!(s.slowest_query.as_deref(), Some("delete_batch users"));
    }

    #[tokio::test]
    async fn disabled_monitoring_is_silent() {
        let stats = Arc::new(StatsMonitor::new());
        let table = users_table()
            .with_monitor_arc(stats.clone())
            .with_config(ExecConfig::new().disable_monitoring());
        let client = DummyClient::new();
        let r = rendered("SELECT 1", &[]);
        let op = Op::new(&table.inner, OperationKind::SelectMany, &r);

        let query = op.query(&client, &r.sql, &[]);
        op.run(query, |rows| QueryResult::Rows(rows.len()))
            .await
            .unwrap();
        assert_eq!(stats.stats().total_queries, 0);
    }
}
