//! Observability for builder executions.
//!
//! Every logical operation (one `fetch_one`, one `exec`, one whole batch)
//! reports a [`QueryContext`] to the configured [`QueryMonitor`] when it
//! starts and a [`QueryResult`] when it completes.
//!
//! ```rust,ignore
//! use fluorm::monitor::{CompositeMonitor, ExecConfig, StatsMonitor, TracingMonitor};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let stats = Arc::new(StatsMonitor::new());
//! let users = Table::<User>::for_model(SqlRenderer::postgres())?
//!     .with_monitor(CompositeMonitor::new().add(TracingMonitor::new()).add_arc(stats.clone()))
//!     .with_config(
//!         ExecConfig::new()
//!             .with_query_timeout(Duration::from_secs(30))
//!             .with_slow_query_threshold(Duration::from_millis(200)),
//!     );
//! ```

mod config;
mod monitors;
mod types;


pub use config::ExecConfig;
pub use monitors::{CompositeMonitor, NoopMonitor, QueryStats, StatsMonitor, TracingMonitor};
pub use types::{OperationKind, QueryContext, QueryMonitor, QueryResult};

pub(crate) fn truncate_bytes(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
