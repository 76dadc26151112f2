//! HTTP surface: routing, handlers, and middleware.

pub(crate) mod errors;
pub(crate) mod health;
pub mod router;
pub(crate) mod telemetry;
