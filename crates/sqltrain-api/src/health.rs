//! Health source abstraction for the API layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqltrain_readiness::ReadinessSnapshot;

/// Outcome of a live database round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatabaseHealth {
    /// The database handle has not been wired yet.
    Unavailable,
    /// The round-trip succeeded.
    Ok {
        /// Round-trip latency in milliseconds.
        latency_ms: u64,
    },
    /// The round-trip failed.
    Error {
        /// Redacted failure message.
        error: String,
    },
}

/// Lifecycle view the API reports on; implemented by the application bootstrap.
#[async_trait]
pub trait HealthSource: Send + Sync {
    /// Current lifecycle phase label.
    fn phase(&self) -> &'static str;
    /// Whether the service accepts traffic.
    fn is_ready(&self) -> bool;
    /// Latest readiness snapshot per hard dependency.
    fn dependencies(&self) -> Vec<ReadinessSnapshot>;
    /// Run a live database round-trip.
    async fn database(&self) -> DatabaseHealth;
}

/// Shared reference to the health source.
pub type SharedHealth = Arc<dyn HealthSource>;
