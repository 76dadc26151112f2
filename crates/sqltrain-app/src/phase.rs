//! Bootstrap lifecycle phases and the channel that publishes them.
//!
//! # Design
//! - Phases only move forward; `Failed` is reachable from any non-terminal phase.
//! - Subscribers observe the latest phase through a `watch` channel.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Lifecycle phase of one process run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Nothing has run yet.
    Init,
    /// Reading and validating configuration.
    LoadingConfig,
    /// Waiting for hard dependencies to accept connections.
    ProbingDependencies,
    /// Constructing singletons.
    Wiring,
    /// Serving traffic.
    Ready,
    /// Draining the server and tearing down services.
    ShuttingDown,
    /// Clean shutdown finished.
    Stopped,
    /// Startup or runtime failure; recovery is a restart.
    Failed,
}

impl Phase {
    /// Stable snake-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::LoadingConfig => "loading_config",
            Self::ProbingDependencies => "probing_dependencies",
            Self::Wiring => "wiring",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Numeric value exported on the `bootstrap_phase` gauge.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Init => 0,
            Self::LoadingConfig => 1,
            Self::ProbingDependencies => 2,
            Self::Wiring => 3,
            Self::Ready => 4,
            Self::ShuttingDown => 5,
            Self::Stopped => 6,
            Self::Failed => -1,
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }

    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Self::Failed)
                | (Self::Init, Self::LoadingConfig)
                | (Self::LoadingConfig, Self::ProbingDependencies)
                | (Self::ProbingDependencies, Self::Wiring)
                | (Self::Wiring, Self::Ready)
                | (Self::Ready, Self::ShuttingDown)
                | (Self::ShuttingDown, Self::Stopped)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared handle over the current phase.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    sender: Arc<watch::Sender<Phase>>,
}

impl StatusHandle {
    /// Handle starting in [`Phase::Init`].
    #[must_use]
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(Phase::Init);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.sender.borrow()
    }

    /// Receiver that observes every published phase.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.sender.subscribe()
    }

    /// Move to `next`; returns `false` and leaves the phase unchanged when illegal.
    pub fn advance(&self, next: Phase) -> bool {
        let mut previous = None;
        let changed = self.sender.send_if_modified(|current| {
            if current.can_advance_to(next) {
                previous = Some(*current);
                *current = next;
                true
            } else {
                false
            }
        });
        match previous {
            Some(from) => info!(from = %from, to = %next, "bootstrap phase changed"),
            None => warn!(from = %self.phase(), to = %next, "illegal bootstrap phase change ignored"),
        }
        changed
    }
}

impl Default for StatusHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAPPY_PATH: [Phase; 6] = [
        Phase::LoadingConfig,
        Phase::ProbingDependencies,
        Phase::Wiring,
        Phase::Ready,
        Phase::ShuttingDown,
        Phase::Stopped,
    ];

    #[test]
    fn happy_path_advances_in_order() {
        let status = StatusHandle::new();
        for phase in HAPPY_PATH {
            assert!(status.advance(phase), "expected move to {phase}");
        }
        assert_eq!(status.phase(), Phase::Stopped);
    }

    #[test]
    fn phases_cannot_be_skipped() {
        let status = StatusHandle::new();
        assert!(!status.advance(Phase::Ready));
        assert_eq!(status.phase(), Phase::Init);
    }

    #[test]
    fn failed_is_reachable_from_any_live_phase_and_terminal() {
        for phase in HAPPY_PATH.iter().take(5) {
            let status = StatusHandle::new();
            for step in HAPPY_PATH.iter().take_while(|step| *step != phase) {
                assert!(status.advance(*step));
            }
            assert!(status.advance(*phase));
            assert!(status.advance(Phase::Failed));
            assert!(!status.advance(Phase::LoadingConfig));
            assert!(!status.advance(Phase::Failed));
            assert_eq!(status.phase(), Phase::Failed);
        }
    }

    #[test]
    fn subscribers_see_latest_phase() {
        let status = StatusHandle::new();
        let receiver = status.subscribe();
        assert!(status.advance(Phase::LoadingConfig));
        assert_eq!(*receiver.borrow(), Phase::LoadingConfig);
        assert_eq!(Phase::LoadingConfig.code(), 1);
        assert_eq!(Phase::Failed.code(), -1);
    }
}
