use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqltrain_wiring::{BoxError, Key, Registry, ResolveError};

struct Pool {
    id: usize,
}

const POOL: Key<Pool> = Key::new("pool");
const A: Key<&'static str> = Key::new("a");
const B: Key<&'static str> = Key::new("b");
const C: Key<&'static str> = Key::new("c");

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_construct_once() -> anyhow::Result<()> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = Registry::new();
    registry.register(POOL, &[], move |_| {
        let counter = Arc::clone(&counter);
        async move {
            let id = counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(Pool { id })
        }
    });
    let container = registry.build()?;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let container = container.clone();
        handles.push(tokio::spawn(async move { container.get(POOL).await }));
    }
    let mut pools = Vec::new();
    for handle in handles {
        pools.push(handle.await??);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(pools.iter().all(|pool| Arc::ptr_eq(pool, &pools[0])));
    assert_eq!(pools[0].id, 0);
    Ok(())
}

fn recording_registry(log: &Arc<Mutex<Vec<&'static str>>>) -> Registry {
    let mut registry = Registry::new();
    for (key, deps) in [(A, vec![]), (B, vec![A.id()]), (C, vec![B.id()])] {
        let name = key.name();
        let log = Arc::clone(log);
        registry
            .register(key, &deps, move |_| async move { Ok(name) })
            .on_shutdown(move |value: Arc<&'static str>| {
                let log = Arc::clone(&log);
                async move {
                    if let Ok(mut entries) = log.lock() {
                        entries.push(*value);
                    }
                    if *value == "c" {
                        Err::<(), BoxError>("c refused to stop".into())
                    } else {
                        Ok(())
                    }
                }
            });
    }
    registry
}

#[tokio::test]
async fn teardown_runs_in_reverse_and_continues_past_failures() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = recording_registry(&log).build()?;
    container.initialize_all().await?;

    let errors = container
        .shutdown()
        .await
        .expect_err("c teardown fails");

    assert_eq!(*log.lock().expect("log lock"), vec!["c", "b", "a"]);
    assert_eq!(errors.keys(), vec![C.id()]);
    Ok(())
}

#[tokio::test]
async fn only_constructed_services_are_torn_down() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = recording_registry(&log).build()?;
    container.get(B).await?;

    container.shutdown().await?;
    assert_eq!(*log.lock().expect("log lock"), vec!["b", "a"]);
    Ok(())
}

#[tokio::test]
async fn requests_after_shutdown_fail() -> anyhow::Result<()> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let container = recording_registry(&log).build()?;
    container.get(A).await?;
    container.shutdown().await?;

    let err = container.get(A).await.expect_err("container is closed");
    assert!(matches!(err, ResolveError::ShutDown { key } if key == A.id()));
    container.shutdown().await?;
    assert_eq!(log.lock().expect("log lock").len(), 1);
    Ok(())
}
