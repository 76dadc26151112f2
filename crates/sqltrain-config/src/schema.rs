//! Static field table shared by sources and the loader.

use crate::error::ValueKind;

/// Declared shape of one settings field.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSpec {
    /// Canonical key (YAML and CLI spelling).
    pub key: &'static str,
    /// Environment variable name.
    pub env: &'static str,
    /// Expected value kind.
    pub kind: ValueKind,
    /// Whether the field has no default.
    pub required: bool,
}

const fn field(key: &'static str, env: &'static str, kind: ValueKind) -> FieldSpec {
    FieldSpec {
        key,
        env,
        kind,
        required: false,
    }
}

/// Every field the loader understands.
pub const FIELDS: &[FieldSpec] = &[
    field("app_name", "APP_NAME", ValueKind::String),
    field("app_host", "APP_HOST", ValueKind::String),
    field("app_port", "APP_PORT", ValueKind::Integer),
    field("log_level", "LOG_LEVEL", ValueKind::String),
    field("log_format", "LOG_FORMAT", ValueKind::String),
    FieldSpec {
        key: "db_host",
        env: "DB_HOST",
        kind: ValueKind::String,
        required: true,
    },
    field("db_port", "DB_PORT", ValueKind::Integer),
    field("db_user", "DB_USER", ValueKind::String),
    field("db_password", "DB_PASSWORD", ValueKind::String),
    field("db_name", "DB_NAME", ValueKind::String),
    field("db_pool_size", "DB_POOL_SIZE", ValueKind::Integer),
    field("db_max_overflow", "DB_MAX_OVERFLOW", ValueKind::Integer),
    field(
        "db_connect_timeout_ms",
        "DB_CONNECT_TIMEOUT_MS",
        ValueKind::Integer,
    ),
    field(
        "readiness_timeout_ms",
        "READINESS_TIMEOUT_MS",
        ValueKind::Integer,
    ),
    field(
        "readiness_poll_interval_ms",
        "READINESS_POLL_INTERVAL_MS",
        ValueKind::Integer,
    ),
    field(
        "readiness_dependencies",
        "READINESS_DEPENDENCIES",
        ValueKind::List,
    ),
    field("shutdown_timeout_ms", "SHUTDOWN_TIMEOUT_MS", ValueKind::Integer),
    field(
        "cors_allow_any_origin",
        "CORS_ALLOW_ANY_ORIGIN",
        ValueKind::Boolean,
    ),
    field("request_timing", "REQUEST_TIMING", ValueKind::Boolean),
];

/// Look up a field by canonical key.
#[must_use]
pub fn by_key(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.key == key)
}

/// Look up a field by environment variable name.
#[must_use]
pub fn by_env(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.env == name)
}
