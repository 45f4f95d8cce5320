//! Backend health types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reachability of a single backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStatus {
    Ok,
    Unreachable,
}

/// Outcome of one backend health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResult {
    pub backend_name: String,
    pub status: BackendStatus,
    /// Wall-clock time of the check; `None` unless the backend answered
    pub latency: Option<Duration>,
}

impl HealthResult {
    pub fn ok(backend_name: impl Into<String>, latency: Duration) -> Self {
        Self {
            backend_name: backend_name.into(),
            status: BackendStatus::Ok,
            latency: Some(latency),
        }
    }

    pub fn unreachable(backend_name: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            status: BackendStatus::Unreachable,
            latency: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == BackendStatus::Ok
    }
}

/// Classification across all backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Ok,
    Degraded,
    Error,
}

impl OverallStatus {
    /// Classify `ok` successes out of `total` checks.
    ///
    /// Backends are not weighted: any mix of successes and failures is
    /// `Degraded`. With nothing to check the result is `Error`.
    pub fn classify(ok: usize, total: usize) -> Self {
        if total == 0 || ok == 0 {
            OverallStatus::Error
        } else if ok >= total {
            OverallStatus::Ok
        } else {
            OverallStatus::Degraded
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Degraded => "degraded",
            OverallStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a full fan-out health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateHealth {
    pub status: OverallStatus,
    /// One entry per backend, in the order the backends were given
    pub backends: Vec<HealthResult>,
}

impl AggregateHealth {
    pub fn from_results(backends: Vec<HealthResult>) -> Self {
        let ok = backends.iter().filter(|r| r.is_ok()).count();
        Self {
            status: OverallStatus::classify(ok, backends.len()),
            backends,
        }
    }

    pub fn ok_count(&self) -> usize {
        self.backends.iter().filter(|r| r.is_ok()).count()
    }

    pub fn get(&self, backend_name: &str) -> Option<&HealthResult> {
        self.backends.iter().find(|r| r.backend_name == backend_name)
    }
}
