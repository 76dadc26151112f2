//! Readiness state machine and its observable tracker.
//!
//! # Design
//! - `Unknown -> Probing -> Probing* -> Ready | Failed`; terminal states never change.
//! - Every change is validated before it is published on the watch channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::TransitionError;
use crate::target::Target;

/// Lifecycle state of a single dependency probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessState {
    /// No attempt has started yet.
    Unknown,
    /// Attempts are in progress.
    Probing,
    /// An attempt succeeded.
    Ready,
    /// The deadline passed without success.
    Failed,
}

impl ReadinessState {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Probing => "probing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Whether `from -> to` is an allowed readiness transition.
#[must_use]
pub const fn is_valid_transition(from: ReadinessState, to: ReadinessState) -> bool {
    matches!(
        (from, to),
        (ReadinessState::Unknown, ReadinessState::Probing)
            | (
                ReadinessState::Probing,
                ReadinessState::Probing | ReadinessState::Ready | ReadinessState::Failed
            )
    )
}

/// Point-in-time view of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessSnapshot {
    /// Dependency name.
    pub target: String,
    /// Current state.
    pub state: ReadinessState,
    /// Attempts made so far.
    pub attempts: u32,
    /// When the latest attempt finished.
    pub last_checked: Option<DateTime<Utc>>,
    /// Failure reported by the latest failed attempt.
    pub last_error: Option<String>,
}

/// Publishes probe progress for one target.
#[derive(Debug)]
pub struct ReadinessTracker {
    sender: watch::Sender<ReadinessSnapshot>,
}

impl ReadinessTracker {
    /// Fresh tracker in the `Unknown` state.
    #[must_use]
    pub fn new(target: &Target) -> Self {
        let (sender, _) = watch::channel(ReadinessSnapshot {
            target: target.name.clone(),
            state: ReadinessState::Unknown,
            attempts: 0,
            last_checked: None,
            last_error: None,
        });
        Self { sender }
    }

    /// Receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ReadinessSnapshot> {
        self.sender.subscribe()
    }

    /// Latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ReadinessSnapshot {
        self.sender.borrow().clone()
    }

    pub(crate) fn begin(&self) -> Result<(), TransitionError> {
        self.transition(ReadinessState::Probing, |_| {})
    }

    pub(crate) fn record_failure(&self, error: String) -> Result<(), TransitionError> {
        self.transition(ReadinessState::Probing, move |snapshot| {
            snapshot.attempts += 1;
            snapshot.last_checked = Some(Utc::now());
            snapshot.last_error = Some(error);
        })
    }

    pub(crate) fn record_success(&self) -> Result<(), TransitionError> {
        self.transition(ReadinessState::Ready, |snapshot| {
            snapshot.attempts += 1;
            snapshot.last_checked = Some(Utc::now());
        })
    }

    pub(crate) fn fail(&self) -> Result<(), TransitionError> {
        self.transition(ReadinessState::Failed, |_| {})
    }

    fn transition(
        &self,
        next: ReadinessState,
        update: impl FnOnce(&mut ReadinessSnapshot),
    ) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.sender.send_if_modified(|snapshot| {
            if !is_valid_transition(snapshot.state, next) {
                outcome = Err(TransitionError {
                    from: snapshot.state,
                    to: next,
                });
                return false;
            }
            snapshot.state = next;
            update(snapshot);
            true
        });
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> ReadinessTracker {
        ReadinessTracker::new(&Target::new("database", "localhost", 5432))
    }

    #[test]
    fn allowed_transitions_follow_the_lifecycle() {
        use ReadinessState::{Failed, Probing, Ready, Unknown};
        assert!(is_valid_transition(Unknown, Probing));
        assert!(is_valid_transition(Probing, Probing));
        assert!(is_valid_transition(Probing, Ready));
        assert!(is_valid_transition(Probing, Failed));
        assert!(!is_valid_transition(Unknown, Ready));
        assert!(!is_valid_transition(Ready, Probing));
        assert!(!is_valid_transition(Failed, Ready));
        assert!(!is_valid_transition(Ready, Ready));
    }

    #[test]
    fn tracker_counts_attempts_and_keeps_last_error() {
        let tracker = tracker();
        let receiver = tracker.subscribe();
        tracker.begin().expect("begin");
        tracker
            .record_failure("connection refused".to_string())
            .expect("failure");
        tracker.record_success().expect("success");

        let snapshot = receiver.borrow().clone();
        assert_eq!(snapshot.state, ReadinessState::Ready);
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.last_error.as_deref(), Some("connection refused"));
        assert!(snapshot.last_checked.is_some());
    }

    #[test]
    fn terminal_states_reject_further_changes() {
        let tracker = tracker();
        tracker.begin().expect("begin");
        tracker.fail().expect("fail");

        let err = tracker.record_success().expect_err("failed is terminal");
        assert_eq!(err.from, ReadinessState::Failed);
        assert_eq!(err.to, ReadinessState::Ready);
        assert_eq!(tracker.snapshot().state, ReadinessState::Failed);
        assert!(tracker.snapshot().state.is_terminal());
    }

    #[test]
    fn tracker_cannot_skip_probing() {
        let tracker = tracker();
        assert!(tracker.record_success().is_err());
        assert_eq!(tracker.snapshot().state, ReadinessState::Unknown);
        assert_eq!(tracker.snapshot().attempts, 0);
    }
}
