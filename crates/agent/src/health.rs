//! Parallel backend health aggregation
//!
//! Every backend is probed in its own spawned task with its own deadline.
//! A failing, hanging or panicking probe is folded into an `unreachable`
//! result; aggregation itself never fails.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assistant_core::{AggregateHealth, HealthCheck, HealthResult};

/// A health probe tagged with the name it is reported under
#[derive(Clone)]
pub struct NamedHealthCheck {
    pub name: String,
    pub check: Arc<dyn HealthCheck>,
}

impl NamedHealthCheck {
    pub fn new(name: impl Into<String>, check: Arc<dyn HealthCheck>) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl std::fmt::Debug for NamedHealthCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedHealthCheck")
            .field("name", &self.name)
            .finish()
    }
}

/// Probe all `backends` concurrently and classify the results.
///
/// Results come back in the order of `backends`. Wall time is bounded by
/// `per_backend_timeout` plus scheduling overhead.
pub async fn check_all(
    backends: &[NamedHealthCheck],
    per_backend_timeout: Duration,
) -> AggregateHealth {
    let handles: Vec<_> = backends
        .iter()
        .cloned()
        .map(|backend| tokio::spawn(probe(backend, per_backend_timeout)))
        .collect();

    let joined = futures::future::join_all(handles).await;

    let results = joined
        .into_iter()
        .zip(backends)
        .map(|(joined, backend)| match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(backend = %backend.name, error = %e, "Health probe task failed");
                HealthResult::unreachable(&backend.name)
            }
        })
        .collect();

    let health = AggregateHealth::from_results(results);
    tracing::debug!(
        status = %health.status,
        ok = health.ok_count(),
        total = health.backends.len(),
        "Health aggregated"
    );
    health
}

async fn probe(backend: NamedHealthCheck, timeout: Duration) -> HealthResult {
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, backend.check.check_health()).await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(Ok(reported)) => {
            metrics::histogram!(
                "assistant_backend_health_latency_seconds",
                "backend" => backend.name.clone()
            )
            .record(elapsed.as_secs_f64());
            tracing::debug!(
                backend = %backend.name,
                latency_ms = elapsed.as_millis() as u64,
                reported_ms = reported.as_millis() as u64,
                "Backend healthy"
            );
            HealthResult::ok(backend.name, elapsed)
        }
        Ok(Err(e)) => {
            tracing::warn!(backend = %backend.name, error = %e, "Backend health check failed");
            HealthResult::unreachable(backend.name)
        }
        Err(_) => {
            tracing::warn!(
                backend = %backend.name,
                timeout_ms = timeout.as_millis() as u64,
                "Backend health check timed out"
            );
            HealthResult::unreachable(backend.name)
        }
    }
}

/// Fixed set of backends probed with one per-backend timeout
#[derive(Debug, Clone)]
pub struct HealthAggregator {
    backends: Vec<NamedHealthCheck>,
    per_backend_timeout: Duration,
}

impl HealthAggregator {
    pub fn new(backends: Vec<NamedHealthCheck>, per_backend_timeout: Duration) -> Self {
        Self {
            backends,
            per_backend_timeout,
        }
    }

    pub async fn check(&self) -> AggregateHealth {
        check_all(&self.backends, self.per_backend_timeout).await
    }

    pub fn backend_names(&self) -> impl Iterator<Item = &str> {
        self.backends.iter().map(|b| b.name.as_str())
    }
}
