//! Startup sequence and process lifecycle.
//!
//! # Design
//! - Configuration is validated before anything else runs; failures stop there.
//! - The HTTP listener binds early so readiness is observable while probing.
//! - Probing and wiring share one deadline; partially built services are torn
//!   down when either fails.
//! - Shutdown drains the server, then tears the container down in reverse order.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use sqltrain_api::{ApiOptions, ApiServer, ApiServerError, ApiServerResult, ApiState};
use sqltrain_config::{ConfigErrors, ConfigSource, HardDependency, LogOutput, Settings};
use sqltrain_readiness::{ProbeOptions, Prober, ReadinessState, ReadinessTracker, Target};
use sqltrain_telemetry::{LogFormat, LoggingConfig, Metrics, init_logging, redact_credentials};
use sqltrain_wiring::{Container, Registry};
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::error::{StartupError, StartupResult};
use crate::health::AppHealth;
use crate::phase::{Phase, StatusHandle};
use crate::services;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const BUILD_SHA: &str = match option_env!("SQLTRAIN_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

/// Publishes phase changes to the status channel and the phase gauge.
struct Lifecycle {
    status: StatusHandle,
    metrics: Metrics,
}

impl Lifecycle {
    fn advance(&self, next: Phase) {
        if self.status.advance(next) {
            self.metrics.set_bootstrap_phase(next.code());
        }
    }

    fn fail(&self, err: StartupError) -> StartupError {
        let phase = self.status.phase();
        self.advance(Phase::Failed);
        error!(
            error = %err,
            phase = %phase,
            exit_code = err.exit_code(),
            detail = %error_chain(&err),
            "startup failed"
        );
        err
    }
}

/// Builds the service table once settings, metrics and serving state exist.
pub type RegistryFactory = Box<dyn FnOnce(Settings, Metrics, ApiState) -> Registry + Send>;

/// Entry point for one process run.
pub struct Bootstrap {
    sources: Vec<ConfigSource>,
    install_logging: bool,
    status: StatusHandle,
    registry: RegistryFactory,
}

impl Bootstrap {
    /// Bootstrap reading configuration from `sources` in order.
    #[must_use]
    pub fn new(sources: Vec<ConfigSource>) -> Self {
        Self {
            sources,
            install_logging: true,
            status: StatusHandle::new(),
            registry: Box::new(services::registry),
        }
    }

    /// Replace the service table built during `Wiring`.
    #[must_use]
    pub fn with_registry<F>(mut self, factory: F) -> Self
    where
        F: FnOnce(Settings, Metrics, ApiState) -> Registry + Send + 'static,
    {
        self.registry = Box::new(factory);
        self
    }

    /// Leave the global tracing subscriber alone (tests install their own or none).
    #[must_use]
    pub fn without_logging(mut self) -> Self {
        self.install_logging = false;
        self
    }

    /// Handle observing the lifecycle from the first phase change.
    #[must_use]
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Run the startup sequence until the service is ready.
    ///
    /// # Errors
    ///
    /// Returns the first failure; the phase is `Failed` afterwards and any
    /// services constructed so far have been torn down.
    pub async fn start(self) -> StartupResult<RunningApp> {
        let started = Instant::now();
        let Self {
            sources,
            install_logging,
            status,
            registry,
        } = self;

        let metrics = match Metrics::new() {
            Ok(metrics) => metrics,
            Err(source) => {
                status.advance(Phase::Failed);
                return Err(StartupError::telemetry("telemetry.metrics", source));
            }
        };
        let lifecycle = Lifecycle { status, metrics };
        lifecycle.advance(Phase::LoadingConfig);

        let settings = match sqltrain_config::load(&sources) {
            Ok(settings) => settings,
            Err(errors) => {
                if install_logging {
                    install_default_logging();
                }
                report_config_errors(&errors);
                return Err(lifecycle.fail(StartupError::Config(errors)));
            }
        };

        if install_logging {
            init_logging(&LoggingConfig {
                level: settings.logging.level.as_str(),
                format: log_format(settings.logging.format),
                build_sha: BUILD_SHA,
            })
            .map_err(|source| lifecycle.fail(StartupError::telemetry("telemetry.init", source)))?;
        }
        log_settings(&settings);

        let targets = probe_targets(&settings);
        let health = Arc::new(AppHealth::new(
            lifecycle.status.clone(),
            targets
                .iter()
                .map(|(_, tracker)| tracker.subscribe())
                .collect(),
        ));
        let api_state = ApiState::new(
            settings.app.name.clone(),
            VERSION,
            health.clone(),
            lifecycle.metrics.clone(),
        );

        let bind_address = settings.bind_address();
        let listener = ApiServer::bind(&bind_address)
            .await
            .map_err(|source| lifecycle.fail(StartupError::api("api.bind", source)))?;
        let local_addr = listener.local_addr().map_err(|source| {
            lifecycle.fail(StartupError::api(
                "api.local_addr",
                ApiServerError::Bind {
                    addr: bind_address.clone(),
                    source,
                },
            ))
        })?;
        let server = ApiServer::new(
            api_state.clone(),
            ApiOptions {
                cors_allow_any_origin: settings.http.cors_allow_any_origin,
                request_timing: settings.http.request_timing,
            },
        );
        let (stop, stopped) = oneshot::channel::<()>();
        let mut server_task = tokio::spawn(server.serve(listener, async move {
            stopped.await.ok();
        }));

        let deadline = settings.startup_deadline();
        let mut wired = None;
        let outcome = timeout(
            deadline,
            probe_and_wire(
                &lifecycle,
                &settings,
                &targets,
                registry(settings.clone(), lifecycle.metrics.clone(), api_state),
                &mut wired,
            ),
        )
        .await
        .unwrap_or_else(|_| {
            Err(StartupError::DeadlineExceeded {
                deadline,
                phase: lifecycle.status.phase().as_str(),
            })
        });

        match outcome {
            Ok(container) => {
                health.attach(&container);
                lifecycle.advance(Phase::Ready);
                let elapsed = started.elapsed();
                lifecycle.metrics.observe_startup(elapsed);
                info!(
                    addr = %local_addr,
                    startup_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "service ready"
                );
                Ok(RunningApp {
                    lifecycle,
                    settings,
                    container,
                    local_addr,
                    server: server_task,
                    stop,
                })
            }
            Err(err) => {
                let err = lifecycle.fail(err);
                if let Some(container) = wired {
                    teardown_best_effort(&container).await;
                }
                stop.send(()).ok();
                if timeout(settings.shutdown_timeout, &mut server_task)
                    .await
                    .is_err()
                {
                    server_task.abort();
                }
                Err(err)
            }
        }
    }
}

/// A started service; dropping it leaves the server running until the runtime ends.
pub struct RunningApp {
    lifecycle: Lifecycle,
    settings: Settings,
    container: Container,
    local_addr: SocketAddr,
    server: JoinHandle<ApiServerResult<()>>,
    stop: oneshot::Sender<()>,
}

impl RunningApp {
    /// Address the HTTP listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Lifecycle handle.
    #[must_use]
    pub fn status(&self) -> StatusHandle {
        self.lifecycle.status.clone()
    }

    /// Settings the service started with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Wired service container.
    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    /// Metrics registry shared with the HTTP surface.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.lifecycle.metrics
    }

    /// Serve until `signal` resolves, then shut down.
    ///
    /// # Errors
    ///
    /// Returns a server failure when the server stops on its own, or any
    /// shutdown failure.
    pub async fn run_until<F>(mut self, signal: F) -> StartupResult<()>
    where
        F: Future<Output = ()>,
    {
        let early_exit = tokio::select! {
            () = signal => None,
            joined = &mut self.server => Some(joined),
        };
        let Some(joined) = early_exit else {
            info!("shutdown signal received");
            return self.shutdown().await;
        };

        let err = server_outcome(joined).err().unwrap_or_else(|| StartupError::ServerTask {
            detail: "server stopped without a shutdown signal".to_string(),
        });
        let err = self.lifecycle.fail(err);
        teardown_best_effort(&self.container).await;
        Err(err)
    }

    /// Drain the server within `shutdown_timeout`, then tear down services.
    ///
    /// # Errors
    ///
    /// Returns a server failure or the aggregated teardown failures.
    pub async fn shutdown(self) -> StartupResult<()> {
        let Self {
            lifecycle,
            settings,
            container,
            mut server,
            stop,
            ..
        } = self;
        lifecycle.advance(Phase::ShuttingDown);
        stop.send(()).ok();

        let drained = match timeout(settings.shutdown_timeout, &mut server).await {
            Ok(joined) => server_outcome(joined),
            Err(_) => {
                warn!(
                    timeout_ms = u64::try_from(settings.shutdown_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "server drain timed out; aborting open connections"
                );
                server.abort();
                Ok(())
            }
        };
        let teardown = container
            .shutdown()
            .await
            .map_err(|source| StartupError::Teardown { source });
        if let Err(StartupError::Teardown { source }) = &teardown {
            warn!(failed = ?source.keys(), "service teardown incomplete");
        }

        lifecycle.advance(Phase::Stopped);
        info!("shutdown complete");
        drained.and(teardown)
    }
}

/// Start the service and run it until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns the startup, serving, or shutdown failure that ended the run.
pub async fn run(bootstrap: Bootstrap) -> StartupResult<()> {
    bootstrap.start().await?.run_until(shutdown_signal()).await
}

/// Resolve on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {}
        () = terminate => {}
    }
}

/// Install logging with default settings, for failures that happen before settings exist.
pub fn install_default_logging() {
    if let Err(err) = init_logging(&LoggingConfig {
        build_sha: BUILD_SHA,
        ..LoggingConfig::default()
    }) {
        warn!(error = %err, "tracing subscriber already installed");
    }
}

/// Log every configuration issue as its own event.
pub fn report_config_errors(errors: &ConfigErrors) {
    for issue in errors.issues() {
        error!(
            field = issue.field().unwrap_or_default(),
            issue = %redact_credentials(&issue.describe()),
            "configuration issue"
        );
    }
}

async fn probe_and_wire(
    lifecycle: &Lifecycle,
    settings: &Settings,
    targets: &[(Target, ReadinessTracker)],
    registry: Registry,
    wired: &mut Option<Container>,
) -> StartupResult<Container> {
    lifecycle.advance(Phase::ProbingDependencies);
    if targets.is_empty() {
        info!("no hard dependencies configured; skipping readiness probes");
    } else {
        let options = ProbeOptions::new(settings.readiness_timeout(), settings.readiness_poll_interval())
            .map_err(|source| StartupError::Readiness { source })?;
        let result = Prober::tcp(options).wait_all(targets).await;
        record_probe_attempts(&lifecycle.metrics, targets);
        for report in result.map_err(|source| StartupError::Readiness { source })? {
            info!(
                dependency = %report.target,
                attempts = report.attempts,
                elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
                "dependency ready"
            );
        }
    }

    lifecycle.advance(Phase::Wiring);
    let container = registry
        .build()
        .map_err(|source| StartupError::Wiring { source })?;
    *wired = Some(container.clone());
    container
        .initialize_all()
        .await
        .map_err(|source| StartupError::Resolve { source })?;
    Ok(container)
}

fn probe_targets(settings: &Settings) -> Vec<(Target, ReadinessTracker)> {
    settings
        .readiness
        .dependencies
        .iter()
        .map(|dependency| {
            let target = match dependency {
                HardDependency::Database => Target::new(
                    dependency.as_str(),
                    settings.database.host.as_str(),
                    settings.database.port,
                ),
            };
            let tracker = ReadinessTracker::new(&target);
            (target, tracker)
        })
        .collect()
}

fn record_probe_attempts(metrics: &Metrics, targets: &[(Target, ReadinessTracker)]) {
    for (target, tracker) in targets {
        let snapshot = tracker.snapshot();
        let outcome = match snapshot.state {
            ReadinessState::Ready => "ready",
            ReadinessState::Failed => "timeout",
            ReadinessState::Unknown | ReadinessState::Probing => "cancelled",
        };
        metrics.inc_probe_attempts(&target.name, outcome, u64::from(snapshot.attempts));
    }
}

async fn teardown_best_effort(container: &Container) {
    if let Err(errors) = container.shutdown().await {
        warn!(failed = ?errors.keys(), "teardown after failed startup incomplete");
    }
}

fn server_outcome(joined: Result<ApiServerResult<()>, JoinError>) -> StartupResult<()> {
    match joined {
        Ok(result) => result.map_err(|source| StartupError::api("api.serve", source)),
        Err(err) => Err(StartupError::ServerTask {
            detail: err.to_string(),
        }),
    }
}

fn log_settings(settings: &Settings) {
    let rendered = serde_json::to_string(settings).unwrap_or_default();
    info!(
        app = %settings.app.name,
        bind = %settings.bind_address(),
        database = %redact_credentials(&settings.database_url_redacted()),
        settings = %rendered,
        "configuration loaded"
    );
}

const fn log_format(format: Option<LogOutput>) -> LogFormat {
    match format {
        Some(LogOutput::Json) => LogFormat::Json,
        Some(LogOutput::Pretty) => LogFormat::Pretty,
        None => LogFormat::infer(),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = Vec::new();
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(redact_credentials(&source.to_string()).into_owned());
        current = source.source();
    }
    parts.join(": ")
}
