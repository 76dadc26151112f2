//! Typed, validated settings produced by the loader.
//!
//! # Design
//! - Pure data carriers; only the loader constructs them from sources.
//! - Shared as `Arc<Settings>` after load. A reload builds a new value.
//! - Secrets never appear in `Debug` or serialized output.

use std::fmt::{self, Debug, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

/// Validated configuration snapshot for one process run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    /// HTTP listener and identity settings.
    pub app: AppSettings,
    /// Log output settings.
    pub logging: LoggingSettings,
    /// Database connection settings.
    pub database: DatabaseSettings,
    /// Startup readiness gate settings.
    pub readiness: ReadinessSettings,
    /// Serving-layer feature toggles.
    pub http: HttpSettings,
    /// Upper bound for draining the server on shutdown.
    #[serde(serialize_with = "serialize_millis")]
    pub shutdown_timeout: Duration,
}

impl Settings {
    /// `host:port` the HTTP listener binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }

    /// Host and port the database readiness probe targets.
    #[must_use]
    pub fn database_target(&self) -> (&str, u16) {
        (self.database.host.as_str(), self.database.port)
    }

    /// Overall budget for each readiness probe.
    #[must_use]
    pub const fn readiness_timeout(&self) -> Duration {
        self.readiness.timeout
    }

    /// Delay between readiness attempts.
    #[must_use]
    pub const fn readiness_poll_interval(&self) -> Duration {
        self.readiness.poll_interval
    }

    /// Database URL without the password, safe for logs.
    #[must_use]
    pub fn database_url_redacted(&self) -> String {
        self.database.redacted_url()
    }

    /// Upper bound for startup work after configuration has loaded.
    #[must_use]
    pub fn startup_deadline(&self) -> Duration {
        self.readiness.timeout + self.database.connect_timeout + Duration::from_secs(1)
    }
}

/// Application identity and listener address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    /// Service name recorded in logs and database sessions.
    pub name: String,
    /// Interface the HTTP listener binds to.
    pub host: String,
    /// Port the HTTP listener binds to.
    pub port: u16,
}

/// Logging verbosity and output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    pub level: LogLevel,
    /// Explicit output format; `None` lets the build profile decide.
    pub format: Option<LogOutput>,
}

/// Filter level accepted in `log_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug diagnostics.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Render the level as its lowercase string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(()),
        }
    }
}

/// Output format accepted in `log_format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// Structured JSON lines.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl FromStr for LogOutput {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    /// Database server host.
    pub host: String,
    /// Database server port.
    pub port: u16,
    /// Login role.
    pub user: String,
    /// Login password, if any.
    pub password: Option<Secret>,
    /// Database name.
    pub name: String,
    /// Steady-state pool size.
    pub pool_size: u32,
    /// Extra connections allowed above `pool_size` under load.
    pub max_overflow: u32,
    /// Timeout for acquiring a pooled connection.
    #[serde(serialize_with = "serialize_millis")]
    pub connect_timeout: Duration,
}

impl DatabaseSettings {
    /// Upper bound on simultaneously open connections.
    #[must_use]
    pub const fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow)
    }

    /// Connection URL with the password left out, for logs.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.user, self.host, self.port, self.name
        )
    }
}

/// Startup readiness gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessSettings {
    /// Overall budget for waiting on each hard dependency.
    #[serde(serialize_with = "serialize_millis")]
    pub timeout: Duration,
    /// Delay between probe attempts.
    #[serde(serialize_with = "serialize_millis")]
    pub poll_interval: Duration,
    /// Dependencies that must accept connections before the service is ready.
    pub dependencies: Vec<HardDependency>,
}

/// External dependency the readiness gate knows how to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HardDependency {
    /// The `PostgreSQL` server addressed by the `db_*` fields.
    Database,
}

impl HardDependency {
    /// Render the dependency as its lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
        }
    }
}

impl FromStr for HardDependency {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "database" => Ok(Self::Database),
            _ => Err(()),
        }
    }
}

/// Serving-layer toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpSettings {
    /// Allow cross-origin requests from any origin.
    pub cors_allow_any_origin: bool,
    /// Log the duration of every request.
    pub request_timing: bool,
}

/// Secret string that never prints its contents.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw secret for handing to a client library.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for Secret {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("Secret(***)")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_millis<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}
