//! # Design
//!
//! - Centralize startup and shutdown failures for the bootstrap.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Map every failure class to a distinct process exit code.

use std::time::Duration;

use sqltrain_api::ApiServerError;
use sqltrain_config::ConfigErrors;
use sqltrain_readiness::ProbeError;
use sqltrain_telemetry::TelemetryError;
use sqltrain_wiring::{ResolveError, ShutdownErrors, WiringError};
use thiserror::Error;

/// Result alias for bootstrap operations.
pub type StartupResult<T> = Result<T, StartupError>;

/// Exit code for a configuration error (`EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;
/// Exit code for an unreachable hard dependency (`EX_UNAVAILABLE`).
pub const EXIT_UNAVAILABLE: u8 = 69;
/// Exit code for a wiring failure (`EX_SOFTWARE`).
pub const EXIT_SOFTWARE: u8 = 70;
/// Exit code for an exceeded startup deadline (`EX_TEMPFAIL`).
pub const EXIT_TEMPFAIL: u8 = 75;
/// Exit code for any other failure.
pub const EXIT_FAILURE: u8 = 1;

/// Failures raised while starting, running, or stopping the service.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration could not be loaded.
    #[error("configuration invalid")]
    Config(#[source] ConfigErrors),
    /// A hard dependency probe failed.
    #[error("dependency readiness failed")]
    Readiness {
        /// Source probe error.
        #[source]
        source: ProbeError,
    },
    /// The service registry is inconsistent.
    #[error("service wiring failed")]
    Wiring {
        /// Source registry error.
        #[source]
        source: WiringError,
    },
    /// Constructing a singleton failed.
    #[error("service construction failed")]
    Resolve {
        /// Source resolution error.
        #[source]
        source: ResolveError,
    },
    /// Probing and wiring did not finish in time.
    #[error("startup deadline exceeded")]
    DeadlineExceeded {
        /// Configured deadline.
        deadline: Duration,
        /// Phase that was running when the deadline passed.
        phase: &'static str,
    },
    /// Telemetry setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The API server could not bind or stopped unexpectedly.
    #[error("api server operation failed")]
    Api {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        #[source]
        source: ApiServerError,
    },
    /// The server task panicked or was cancelled.
    #[error("api server task failed")]
    ServerTask {
        /// Join failure detail.
        detail: String,
    },
    /// One or more teardown hooks failed.
    #[error("service teardown failed")]
    Teardown {
        /// Source teardown report.
        #[source]
        source: ShutdownErrors,
    },
}

impl StartupError {
    /// Process exit code for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => EXIT_CONFIG,
            Self::Readiness { source } => match source {
                ProbeError::Timeout(_) => EXIT_UNAVAILABLE,
                ProbeError::InvalidOptions { .. } | ProbeError::Tracker { .. } => EXIT_FAILURE,
            },
            Self::Wiring { .. } | Self::Resolve { .. } => EXIT_SOFTWARE,
            Self::DeadlineExceeded { .. } => EXIT_TEMPFAIL,
            Self::Telemetry { .. }
            | Self::Api { .. }
            | Self::ServerTask { .. }
            | Self::Teardown { .. } => EXIT_FAILURE,
        }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn api(operation: &'static str, source: ApiServerError) -> Self {
        Self::Api { operation, source }
    }
}

impl From<ConfigErrors> for StartupError {
    fn from(errors: ConfigErrors) -> Self {
        Self::Config(errors)
    }
}
