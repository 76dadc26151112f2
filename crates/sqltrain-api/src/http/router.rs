//! Router construction and server host for the API.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{Method, Request},
    routing::get,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::health::{health, health_full, metrics, ready};
use crate::http::telemetry::{
    HttpMetricsLayer, propagate_request_id, record_response, request_span, set_request_id,
};
use crate::state::ApiState;

/// Toggles for the cross-cutting HTTP layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiOptions {
    /// Allow any origin, method, and header.
    pub cors_allow_any_origin: bool,
    /// Log method, route, status, and latency for every request.
    pub request_timing: bool,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            cors_allow_any_origin: true,
            request_timing: true,
        }
    }
}

/// Axum router wrapper that hosts the health and metrics endpoints.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Build the router with state and middleware applied.
    #[must_use]
    pub fn new(state: ApiState, options: ApiOptions) -> Self {
        let metrics_layer = HttpMetricsLayer::new(state.metrics.clone());
        let timing = options.request_timing;
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(request_span)
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                move |response: &axum::response::Response, latency: Duration, span: &Span| {
                    record_response(span, response.status().as_u16(), latency, timing);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(propagate_request_id())
            .layer(set_request_id())
            .layer(trace_layer)
            .layer(metrics_layer);

        let router = Router::new()
            .route("/health", get(health))
            .route("/health/ready", get(ready))
            .route("/health/full", get(health_full))
            .route("/metrics", get(metrics))
            .route_layer(layered);
        let router = if options.cors_allow_any_origin {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::OPTIONS])
                    .allow_headers(Any),
            )
        } else {
            router
        };

        Self {
            router: router.with_state(Arc::new(state)),
        }
    }

    /// Bind a listener for `host:port`; host names are resolved.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Bind`] when the address cannot be bound.
    pub async fn bind(addr: &str) -> ApiServerResult<TcpListener> {
        TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind {
                addr: addr.to_string(),
                source,
            })
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError::Serve`] when the server terminates with an IO error.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(addr) = listener.local_addr() {
            info!(addr = %addr, "api listening");
        }
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }

    /// Consume the server and return the underlying router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}
