use std::time::Duration;

/// Execution settings shared by every builder created from a
/// [`Table`](crate::Table).
///
/// Monitoring is on by default; with the default [`NoopMonitor`](super::NoopMonitor)
/// that costs nothing.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    /// Per-statement timeout. `None` means no timeout (default).
    pub query_timeout: Option<Duration>,
    /// Operations slower than this trigger `on_slow_query`.
    pub slow_query_threshold: Option<Duration>,
    /// Whether monitors receive events.
    pub monitoring_enabled: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            query_timeout: None,
            slow_query_threshold: None,
            monitoring_enabled: true,
        }
    }
}

impl ExecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements exceeding this duration are cancelled and fail with
    /// [`OrmError::Timeout`](crate::OrmError::Timeout).
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = Some(threshold);
        self
    }

    pub fn enable_monitoring(mut self) -> Self {
        self.monitoring_enabled = true;
        self
    }

    pub fn disable_monitoring(mut self) -> Self {
        self.monitoring_enabled = false;
        self
    }
}
