//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Each handle owns its own registry; clones share collectors.

use std::convert::TryFrom;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the service.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    readiness_probe_attempts_total: IntCounterVec,
    service_constructions_total: IntCounterVec,
    bootstrap_phase: IntGauge,
    startup_duration_ms: IntGauge,
    totals: Totals,
}

#[derive(Default)]
struct Totals {
    http_requests: AtomicU64,
    probe_attempts: AtomicU64,
    constructions: AtomicU64,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Numeric code of the current bootstrap phase.
    pub bootstrap_phase: i64,
    /// Time from process start to `Ready` (ms), zero until ready.
    pub startup_duration_ms: i64,
    /// Readiness attempts across all targets and outcomes.
    pub readiness_probe_attempts_total: u64,
    /// Singletons constructed by the container.
    pub service_constructions_total: u64,
    /// HTTP requests served.
    pub http_requests_total: u64,
}

impl Metrics {
    /// Construct a registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let readiness_probe_attempts_total = counter_vec(
            "readiness_probe_attempts_total",
            "Readiness attempts per dependency and outcome",
            &["target", "outcome"],
        )?;
        let service_constructions_total = counter_vec(
            "service_constructions_total",
            "Singletons constructed by the dependency container",
            &["key"],
        )?;
        let bootstrap_phase = gauge("bootstrap_phase", "Current bootstrap phase code")?;
        let startup_duration_ms = gauge(
            "startup_duration_ms",
            "Time from process start until the service was ready (ms)",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(
            &registry,
            "readiness_probe_attempts_total",
            &readiness_probe_attempts_total,
        )?;
        register(
            &registry,
            "service_constructions_total",
            &service_constructions_total,
        )?;
        register(&registry, "bootstrap_phase", &bootstrap_phase)?;
        register(&registry, "startup_duration_ms", &startup_duration_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                readiness_probe_attempts_total,
                service_constructions_total,
                bootstrap_phase,
                startup_duration_ms,
                totals: Totals::default(),
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        let code = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[route, code.as_str()])
            .inc();
        self.inner
            .totals
            .http_requests
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Count readiness attempts for `target` by outcome (`ready`, `timeout` or `cancelled`).
    pub fn inc_probe_attempts(&self, target: &str, outcome: &str, attempts: u64) {
        self.inner
            .readiness_probe_attempts_total
            .with_label_values(&[target, outcome])
            .inc_by(attempts);
        self.inner
            .totals
            .probe_attempts
            .fetch_add(attempts, Ordering::Relaxed);
    }

    /// Count one singleton construction.
    pub fn inc_service_construction(&self, key: &str) {
        self.inner
            .service_constructions_total
            .with_label_values(&[key])
            .inc();
        self.inner
            .totals
            .constructions
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the current bootstrap phase code.
    pub fn set_bootstrap_phase(&self, code: i64) {
        self.inner.bootstrap_phase.set(code);
    }

    /// Record how long startup took.
    pub fn observe_startup(&self, duration: Duration) {
        self.inner
            .startup_duration_ms
            .set(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX));
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Point-in-time snapshot for health reporting.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bootstrap_phase: self.inner.bootstrap_phase.get(),
            startup_duration_ms: self.inner.startup_duration_ms.get(),
            readiness_probe_attempts_total: self
                .inner
                .totals
                .probe_attempts
                .load(Ordering::Relaxed),
            service_constructions_total: self.inner.totals.constructions.load(Ordering::Relaxed),
            http_requests_total: self.inner.totals.http_requests.load(Ordering::Relaxed),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}
