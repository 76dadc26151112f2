//! Shared state handed to every handler.

use std::time::{Duration, Instant};

use sqltrain_telemetry::Metrics;

use crate::health::SharedHealth;

/// Application state for the HTTP surface.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) health: SharedHealth,
    pub(crate) metrics: Metrics,
    pub(crate) app_name: String,
    pub(crate) version: String,
    started_at: Instant,
}

impl ApiState {
    /// Build state; uptime is measured from this call.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        version: impl Into<String>,
        health: SharedHealth,
        metrics: Metrics,
    ) -> Self {
        Self {
            health,
            metrics,
            app_name: app_name.into(),
            version: version.into(),
            started_at: Instant::now(),
        }
    }

    /// Metrics registry shared with the bootstrap.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Time since the state was created.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
