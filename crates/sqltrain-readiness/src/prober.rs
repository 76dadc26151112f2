//! Deadline-bounded readiness polling.
//!
//! # Design
//! - Attempts start on a fixed cadence measured from the previous attempt's start.
//! - Each attempt is bounded by `min(attempt_timeout, time remaining)`.
//! - The deadline is measured from the first attempt; a timed-out probe never blocks past it.

use std::time::Duration;

use futures_util::future::try_join_all;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::checker::{Checker, TcpChecker};
use crate::error::{ProbeResult, ReadinessTimeout};
use crate::state::ReadinessTracker;
use crate::target::{ProbeOptions, Target};

/// Outcome of a successful probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyReport {
    /// Target that became reachable.
    pub target: Target,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Time from the first attempt to success.
    pub elapsed: Duration,
}

/// Polls targets until they accept connections or the deadline passes.
#[derive(Debug, Clone)]
pub struct Prober<C = TcpChecker> {
    checker: C,
    options: ProbeOptions,
}

impl Prober<TcpChecker> {
    /// Prober that opens TCP connections.
    #[must_use]
    pub const fn tcp(options: ProbeOptions) -> Self {
        Self::new(TcpChecker, options)
    }
}

impl<C: Checker> Prober<C> {
    /// Prober with a custom checker.
    #[must_use]
    pub const fn new(checker: C, options: ProbeOptions) -> Self {
        Self { checker, options }
    }

    /// Configured timing.
    #[must_use]
    pub const fn options(&self) -> &ProbeOptions {
        &self.options
    }

    /// Wait until `target` accepts a connection.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Timeout` when no attempt succeeds before the deadline.
    pub async fn wait_until_ready(&self, target: &Target) -> ProbeResult<ReadyReport> {
        let tracker = ReadinessTracker::new(target);
        self.wait_tracked(target, &tracker).await
    }

    /// Wait until `target` is ready, publishing progress on `tracker`.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Timeout` when no attempt succeeds before the deadline
    /// and `ProbeError::Tracker` when the tracker was already used.
    pub async fn wait_tracked(
        &self,
        target: &Target,
        tracker: &ReadinessTracker,
    ) -> ProbeResult<ReadyReport> {
        tracker.begin()?;
        let started = Instant::now();
        let deadline = started + self.options.timeout();
        let mut attempts: u32 = 0;

        let last_error = loop {
            let attempt_started = Instant::now();
            let budget = self
                .options
                .attempt_timeout()
                .min(deadline.saturating_duration_since(attempt_started));
            attempts += 1;

            let outcome = match time::timeout(budget, self.checker.check(target)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!("attempt timed out after {}ms", budget.as_millis())),
            };

            match outcome {
                Ok(()) => {
                    tracker.record_success()?;
                    let elapsed = started.elapsed();
                    info!(
                        dependency = %target,
                        attempts,
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        "dependency ready"
                    );
                    return Ok(ReadyReport {
                        target: target.clone(),
                        attempts,
                        elapsed,
                    });
                }
                Err(reason) => {
                    debug!(
                        dependency = %target,
                        attempt = attempts,
                        error = %reason,
                        "readiness attempt failed"
                    );
                    tracker.record_failure(reason.clone())?;
                    if Instant::now() >= deadline {
                        break reason;
                    }
                }
            }

            let next_attempt = (attempt_started + self.options.poll_interval()).min(deadline);
            time::sleep_until(next_attempt).await;
        };

        tracker.fail()?;
        let elapsed = started.elapsed();
        warn!(
            dependency = %target,
            attempts,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            last_error = %last_error,
            "dependency not ready before deadline"
        );
        Err(ReadinessTimeout {
            target: target.to_string(),
            attempts,
            last_error: Some(last_error),
            elapsed,
        }
        .into())
    }

    /// Probe every target in parallel; fails with the first timeout.
    ///
    /// Remaining probes are cancelled once one of them fails.
    ///
    /// # Errors
    ///
    /// Returns the first probe failure.
    pub async fn wait_all(
        &self,
        targets: &[(Target, ReadinessTracker)],
    ) -> ProbeResult<Vec<ReadyReport>> {
        try_join_all(
            targets
                .iter()
                .map(|(target, tracker)| self.wait_tracked(target, tracker)),
        )
        .await
    }
}
