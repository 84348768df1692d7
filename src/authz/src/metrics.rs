//! Engine observability counters and latency percentiles

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Engine performance metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Total number of access decisions
    pub total_decisions: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Committed apply batches
    pub commits_total: u64,

    /// Rejected stale-base applies
    pub conflicts_total: u64,

    /// Latency percentiles
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl EngineMetrics {
    /// Fraction of decisions that were allowed
    pub fn allow_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / self.total_decisions as f64
        }
    }
}

/// Metrics collector shared across request handlers
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,

    /// Latency samples for percentile calculation (ring buffer)
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    pub async fn record_decision(&self, allowed: bool) {
        let mut metrics = self.metrics.write().await;
        metrics.total_decisions += 1;
        if allowed {
            metrics.allowed_decisions += 1;
        } else {
            metrics.denied_decisions += 1;
        }
    }

    pub async fn record_commit(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.commits_total += 1;
    }

    pub async fn record_conflict(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.conflicts_total += 1;
    }

    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let mut metrics = self.metrics.write().await;
        let sum: f64 = samples.iter().sum();
        metrics.avg_latency_ms = sum / samples.len() as f64;
        metrics.latency_p50_ms = percentile(&sorted, 0.50);
        metrics.latency_p95_ms = percentile(&sorted, 0.95);
        metrics.latency_p99_ms = percentile(&sorted, 0.99);
    }

    pub async fn snapshot(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.metrics.read().await;

        format!(
            r#"# HELP authz_decisions_total Total number of access decisions
# TYPE authz_decisions_total counter
authz_decisions_total {}

# HELP authz_allowed_total Number of allowed decisions
# TYPE authz_allowed_total counter
authz_allowed_total {}

# HELP authz_denied_total Number of denied decisions
# TYPE authz_denied_total counter
authz_denied_total {}

# HELP authz_commits_total Committed apply batches
# TYPE authz_commits_total counter
authz_commits_total {}

# HELP authz_conflicts_total Rejected stale-base applies
# TYPE authz_conflicts_total counter
authz_conflicts_total {}

# HELP authz_decision_latency_seconds Decision latency percentiles
# TYPE authz_decision_latency_seconds summary
authz_decision_latency_seconds{{quantile="0.5"}} {}
authz_decision_latency_seconds{{quantile="0.95"}} {}
authz_decision_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.total_decisions,
            metrics.allowed_decisions,
            metrics.denied_decisions,
            metrics.commits_total,
            metrics.conflicts_total,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p95_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        )
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64) * p) as usize;
    sorted[idx.min(sorted.len() - 1)]
}
