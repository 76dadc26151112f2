//! Probe targets and timing options.

use std::fmt;
use std::time::Duration;

use crate::error::{ProbeError, ProbeResult};

/// Upper bound used for a single attempt when none is configured.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// A network dependency that must accept TCP connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Logical name used in logs and metrics.
    pub name: String,
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Target {
    /// Build a target.
    #[must_use]
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// `host:port` form.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.name, self.host, self.port)
    }
}

/// Timing knobs for a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    timeout: Duration,
    poll_interval: Duration,
    attempt_timeout: Duration,
}

impl ProbeOptions {
    /// Validate and build options.
    ///
    /// The per-attempt bound defaults to the larger of the poll interval and
    /// one second, capped at the overall timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::InvalidOptions` unless `timeout > 0` and
    /// `0 < poll_interval <= timeout`.
    pub fn new(timeout: Duration, poll_interval: Duration) -> ProbeResult<Self> {
        if timeout.is_zero() {
            return Err(ProbeError::InvalidOptions {
                field: "timeout",
                reason: "must be positive",
            });
        }
        if poll_interval.is_zero() {
            return Err(ProbeError::InvalidOptions {
                field: "poll_interval",
                reason: "must be positive",
            });
        }
        if poll_interval > timeout {
            return Err(ProbeError::InvalidOptions {
                field: "poll_interval",
                reason: "must not exceed timeout",
            });
        }
        Ok(Self {
            timeout,
            poll_interval,
            attempt_timeout: poll_interval.max(DEFAULT_ATTEMPT_TIMEOUT).min(timeout),
        })
    }

    /// Override the per-attempt bound.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::InvalidOptions` when the bound is zero.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> ProbeResult<Self> {
        if attempt_timeout.is_zero() {
            return Err(ProbeError::InvalidOptions {
                field: "attempt_timeout",
                reason: "must be positive",
            });
        }
        self.attempt_timeout = attempt_timeout;
        Ok(self)
    }

    /// Overall deadline measured from the first attempt.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delay between attempt starts.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Upper bound for one attempt.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}
