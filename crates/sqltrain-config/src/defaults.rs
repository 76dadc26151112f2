//! Default values and naming conventions for settings.
//!
//! # Design
//! - Centralize defaults so the loader, docs, and tests agree.
//! - Keep time-based defaults explicit in milliseconds.

/// Environment variable naming the YAML configuration file.
pub const APPLICATION_CONFIG_ENV: &str = "APPLICATION_CONFIG";
/// Environment prefixes owned by this service; unknown names under them are rejected.
pub const OWNED_ENV_PREFIXES: &[&str] = &["APP_", "DB_", "READINESS_"];

pub(crate) const APP_NAME: &str = "sql-training";
pub(crate) const APP_HOST: &str = "0.0.0.0";
pub(crate) const APP_PORT: u16 = 8000;
pub(crate) const DB_PORT: u16 = 5432;
pub(crate) const DB_USER: &str = "postgres";
pub(crate) const DB_NAME: &str = "postgres";
pub(crate) const DB_POOL_SIZE: u32 = 5;
pub(crate) const DB_MAX_OVERFLOW: u32 = 10;
pub(crate) const DB_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub(crate) const READINESS_TIMEOUT_MS: u64 = 15_000;
pub(crate) const READINESS_POLL_INTERVAL_MS: u64 = 500;
pub(crate) const SHUTDOWN_TIMEOUT_MS: u64 = 10_000;
