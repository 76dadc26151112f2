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

//! HTTP surface for the SQL training service.
//!
//! Exposes liveness, readiness, full health, and Prometheus metrics over axum.
//! Lifecycle state arrives through the [`HealthSource`] seam so the router never
//! depends on the bootstrap crate.

pub mod error;
pub mod health;
pub mod http;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use health::{DatabaseHealth, HealthSource, SharedHealth};
pub use http::router::{ApiOptions, ApiServer};
pub use state::ApiState;
