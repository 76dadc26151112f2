//! Static service table for the process.
//!
//! # Design
//! - Every long-lived singleton is declared here with its dependencies.
//! - Instances are built lazily by the container; bootstrap initializes them eagerly.
//! - Teardown hooks release external resources in reverse construction order.

use std::sync::Arc;
use std::time::Duration;

use sqltrain_api::ApiState;
use sqltrain_config::Settings;
use sqltrain_telemetry::Metrics;
use sqltrain_wiring::{BoxError, Dependencies, Key, Registry, ServiceKey};
use sqlx::postgres::PgConnectOptions;
use tracing::debug;

use crate::database::{Database, connect_options};

/// Validated settings for this run.
pub const SETTINGS: Key<Settings> = Key::new("settings");
/// Connection options derived from the database settings.
pub const DATABASE_OPTIONS: Key<PgConnectOptions> = Key::new("database_options");
/// Lazily connecting Postgres pool.
pub const DATABASE: Key<Database> = Key::new("database");
/// Prometheus registry.
pub const METRICS: Key<Metrics> = Key::new("metrics");
/// State shared with the HTTP surface.
pub const API_STATE: Key<ApiState> = Key::new("api_state");

/// Build the registry for one process run.
#[must_use]
pub fn registry(settings: Settings, metrics: Metrics, api_state: ApiState) -> Registry {
    let mut registry = Registry::new();

    let observed = metrics.clone();
    registry.observe_constructions(Arc::new(move |key: ServiceKey, elapsed: Duration| {
        observed.inc_service_construction(key.name());
        debug!(
            service = %key,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "service constructed"
        );
    }));

    registry.register_instance(SETTINGS, settings);
    registry.register_instance(METRICS, metrics);
    registry.register_instance(API_STATE, api_state);

    registry.register(DATABASE_OPTIONS, &[SETTINGS.id()], |deps: Dependencies| async move {
        let settings = deps.get(SETTINGS).await?;
        Ok::<_, BoxError>(connect_options(&settings.database, &settings.app.name))
    });

    registry
        .register(
            DATABASE,
            &[SETTINGS.id(), DATABASE_OPTIONS.id()],
            |deps: Dependencies| async move {
                let settings = deps.get(SETTINGS).await?;
                let options = deps.get(DATABASE_OPTIONS).await?;
                Ok::<_, BoxError>(Database::connect_lazy(
                    options.as_ref().clone(),
                    &settings.database,
                ))
            },
        )
        .on_shutdown(|database: Arc<Database>| async move {
            database.close().await;
            Ok::<(), BoxError>(())
        });

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqltrain_api::{DatabaseHealth, HealthSource};
    use sqltrain_config::{ConfigSource, load};
    use sqltrain_readiness::ReadinessSnapshot;

    struct Idle;

    #[async_trait::async_trait]
    impl HealthSource for Idle {
        fn phase(&self) -> &'static str {
            "wiring"
        }

        fn is_ready(&self) -> bool {
            false
        }

        fn dependencies(&self) -> Vec<ReadinessSnapshot> {
            Vec::new()
        }

        async fn database(&self) -> DatabaseHealth {
            DatabaseHealth::Unavailable
        }
    }

    fn settings() -> anyhow::Result<Settings> {
        Ok(load(&[ConfigSource::environment([
            ("DB_HOST", "db.internal"),
            ("DB_POOL_SIZE", "2"),
            ("DB_MAX_OVERFLOW", "1"),
            ("APP_NAME", "trainer"),
        ])])?)
    }

    #[tokio::test]
    async fn registry_builds_and_initializes_without_connecting() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let state = ApiState::new("trainer", "0.1.0", Arc::new(Idle), metrics.clone());
        let container = registry(settings()?, metrics.clone(), state).build()?;

        container.initialize_all().await?;
        let options = container.get(DATABASE_OPTIONS).await?;
        assert_eq!(options.get_application_name(), Some("trainer"));
        assert_eq!(options.get_host(), "db.internal");

        let database = container.get(DATABASE).await?;
        assert_eq!(database.pool().size(), 0);
        assert_eq!(database.pool().options().get_max_connections(), 3);
        assert_eq!(metrics.snapshot().service_constructions_total, 2);

        container.shutdown().await?;
        assert!(database.is_closed());
        Ok(())
    }

    #[tokio::test]
    async fn settings_and_metrics_resolve_as_shared_instances() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let state = ApiState::new("trainer", "0.1.0", Arc::new(Idle), metrics.clone());
        let container = registry(settings()?, metrics, state).build()?;

        let first = container.get(SETTINGS).await?;
        let second = container.get(SETTINGS).await?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.app.name, "trainer");
        assert!(container.is_constructed(API_STATE.id()));
        Ok(())
    }
}
