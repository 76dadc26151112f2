//! Health view over the bootstrap state.

use std::sync::OnceLock;

use async_trait::async_trait;
use sqltrain_api::{DatabaseHealth, HealthSource};
use sqltrain_readiness::ReadinessSnapshot;
use sqltrain_telemetry::redact_credentials;
use sqltrain_wiring::{Container, WeakContainer};
use tokio::sync::watch;
use tracing::warn;

use crate::phase::{Phase, StatusHandle};
use crate::services::DATABASE;

/// Reports phase, probe progress, and database reachability to the HTTP surface.
pub(crate) struct AppHealth {
    status: StatusHandle,
    probes: Vec<watch::Receiver<ReadinessSnapshot>>,
    container: OnceLock<WeakContainer>,
}

impl AppHealth {
    pub(crate) const fn new(
        status: StatusHandle,
        probes: Vec<watch::Receiver<ReadinessSnapshot>>,
    ) -> Self {
        Self {
            status,
            probes,
            container: OnceLock::new(),
        }
    }

    /// Make the wired container available for live checks.
    ///
    /// Only a weak handle is kept: the container owns this source through `api_state`.
    pub(crate) fn attach(&self, container: &Container) {
        if self.container.set(container.downgrade()).is_err() {
            warn!("container already attached to health source");
        }
    }
}

#[async_trait]
impl HealthSource for AppHealth {
    fn phase(&self) -> &'static str {
        self.status.phase().as_str()
    }

    fn is_ready(&self) -> bool {
        self.status.phase() == Phase::Ready
    }

    fn dependencies(&self) -> Vec<ReadinessSnapshot> {
        self.probes
            .iter()
            .map(|probe| probe.borrow().clone())
            .collect()
    }

    async fn database(&self) -> DatabaseHealth {
        let Some(container) = self.container.get().and_then(WeakContainer::upgrade) else {
            return DatabaseHealth::Unavailable;
        };
        let database = match container.get(DATABASE).await {
            Ok(database) => database,
            Err(err) => {
                return DatabaseHealth::Error {
                    error: err.to_string(),
                };
            }
        };
        match database.ping().await {
            Ok(latency) => DatabaseHealth::Ok {
                latency_ms: u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
            },
            Err(err) => DatabaseHealth::Error {
                error: redact_credentials(&err.to_string()).into_owned(),
            },
        }
    }
}
