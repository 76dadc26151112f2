use std::time::{Duration, Instant};

use sqltrain_readiness::{
    ProbeError, ProbeOptions, Prober, ReadinessState, ReadinessTracker, Target,
};
use sqltrain_test_support::net::{listen_after, reserve_port};

fn options(timeout_ms: u64, poll_ms: u64) -> anyhow::Result<ProbeOptions> {
    Ok(ProbeOptions::new(
        Duration::from_millis(timeout_ms),
        Duration::from_millis(poll_ms),
    )?)
}

#[tokio::test]
async fn listener_opening_late_is_detected() -> anyhow::Result<()> {
    let listener = listen_after(Duration::from_millis(300))?;
    let target = Target::new("database", "127.0.0.1", listener.port());
    let tracker = ReadinessTracker::new(&target);
    let prober = Prober::tcp(options(5_000, 50)?);

    let started = Instant::now();
    let report = prober.wait_tracked(&target, &tracker).await?;

    assert!(report.attempts > 1);
    assert!(started.elapsed() >= Duration::from_millis(250));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(tracker.snapshot().state, ReadinessState::Ready);
    Ok(())
}

#[tokio::test]
async fn closed_port_times_out_without_overrunning() -> anyhow::Result<()> {
    let port = reserve_port()?;
    let target = Target::new("database", "127.0.0.1", port);
    let prober = Prober::tcp(options(300, 50)?);

    let started = Instant::now();
    let err = prober
        .wait_until_ready(&target)
        .await
        .expect_err("nothing listens");

    let ProbeError::Timeout(timeout) = err else {
        panic!("expected a readiness timeout, got {err:?}");
    };
    assert!(timeout.attempts >= 2);
    assert!(timeout.last_error.is_some());
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}
