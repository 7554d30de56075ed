//! `RosterServer`: Axum HTTP + WebSocket surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use roster_gateway::LocalGateway;
use roster_registry::ConnectionRegistry;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::handler::DisconnectHandler;
use crate::health::{HealthResponse, health_check};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::ws_handler;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    /// Disconnect entry point.
    pub handler: Arc<DisconnectHandler>,
    /// Registry the handler works against.
    pub registry: Arc<dyn ConnectionRegistry>,
    /// In-process gateway, when the deployment uses one.
    pub local: Option<Arc<LocalGateway>>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Shutdown signal.
    pub shutdown: ShutdownCoordinator,
    /// Prometheus handle for `/metrics`.
    pub metrics: Option<PrometheusHandle>,
    /// When the server started.
    pub start_time: Instant,
}

/// The HTTP server.
pub struct RosterServer {
    state: AppState,
}

impl RosterServer {
    /// Create a server.
    pub fn new(
        config: ServerConfig,
        handler: Arc<DisconnectHandler>,
        local: Option<Arc<LocalGateway>>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let registry = Arc::clone(handler.coordinator().registry());
        Self {
            state: AppState {
                handler,
                registry,
                local,
                config: Arc::new(config),
                shutdown: ShutdownCoordinator::new(),
                metrics,
                start_time: Instant::now(),
            },
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/disconnect", post(disconnect_handler))
            .route("/ws", get(ws_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve in the background until shutdown.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.state.config.host, self.state.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        info!(%local_addr, "roster server listening");
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %err, "server error");
            }
        });
        Ok((local_addr, handle))
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.state.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }
}

/// `POST /disconnect`: status mirrors `statusCode`.
async fn disconnect_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let response = state.handler.handle_json(&body).await;
    let status = StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = match state.registry.count().await {
        Ok(n) => Some(n),
        Err(err) => {
            warn!(error = %err, "registry count failed");
            None
        }
    };
    Json(health_check(state.start_time, connections))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
