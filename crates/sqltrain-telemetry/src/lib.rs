#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives for the SQL training service.
//!
//! Layout: `init.rs` (subscriber setup), `metrics.rs` (Prometheus registry),
//! `redact.rs` (credential scrubbing).

pub mod error;
pub mod init;
pub mod metrics;
pub mod redact;

pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use metrics::{Metrics, MetricsSnapshot};
pub use redact::redact_credentials;
