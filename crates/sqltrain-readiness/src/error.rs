//! # Design
//!
//! - Keep error messages constant; carry the target and attempt history as fields.
//! - `ReadinessTimeout` is the only failure a correctly configured prober reports.

use std::time::Duration;

use thiserror::Error;

use crate::state::ReadinessState;

/// Result alias for readiness operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// A dependency did not accept connections before the deadline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("dependency did not become ready before the deadline")]
pub struct ReadinessTimeout {
    /// Target description (`name (host:port)`).
    pub target: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Failure reported by the final attempt.
    pub last_error: Option<String>,
    /// Time spent probing.
    pub elapsed: Duration,
}

/// Rejected readiness state change.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("invalid readiness transition")]
pub struct TransitionError {
    /// State before the rejected change.
    pub from: ReadinessState,
    /// Requested state.
    pub to: ReadinessState,
}

/// Errors raised by the readiness prober.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Probe options broke their constraints.
    #[error("invalid probe options")]
    InvalidOptions {
        /// Option that failed validation.
        field: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// The deadline passed without a successful attempt.
    #[error(transparent)]
    Timeout(#[from] ReadinessTimeout),
    /// The tracker was reused or driven out of order.
    #[error("readiness tracker rejected a transition")]
    Tracker {
        /// Rejected transition.
        #[source]
        source: TransitionError,
    },
}

impl From<TransitionError> for ProbeError {
    fn from(source: TransitionError) -> Self {
        Self::Tracker { source }
    }
}

impl ProbeError {
    /// Timeout details when the failure was a timeout.
    #[must_use]
    pub const fn as_timeout(&self) -> Option<&ReadinessTimeout> {
        match self {
            Self::Timeout(timeout) => Some(timeout),
            Self::InvalidOptions { .. } | Self::Tracker { .. } => None,
        }
    }
}
