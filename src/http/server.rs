//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the config handlers
//! - Wire up middleware (tracing, request timeout)
//! - Serve on a listener until shutdown is signalled

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ClientConfig, ConfigService};

/// Path of the public client projection.
pub const CLIENT_CONFIG_PATH: &str = "/api/v1/config/client";
/// Path reporting which file the live config came from.
pub const CLIENT_CONFIG_STATUS_PATH: &str = "/api/v1/config/client/status";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConfigService>,
}

/// Source of the live config.
#[derive(Debug, Serialize)]
pub struct ConfigStatus {
    pub path: String,
    pub last_modified: i64,
}

/// HTTP server exposing the live configuration.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(service: Arc<ConfigService>) -> Self {
        Self::with_timeout(service, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(service: Arc<ConfigService>, request_timeout: Duration) -> Self {
        let router = Self::build_router(AppState { service }, request_timeout);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route(CLIENT_CONFIG_PATH, get(client_config_handler))
            .route(CLIENT_CONFIG_STATUS_PATH, get(status_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires or its sender is dropped.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn client_config_handler(State(state): State<AppState>) -> Json<ClientConfig> {
    let client = state.service.client_config();
    Json(ClientConfig::clone(&client))
}

async fn status_handler(State(state): State<AppState>) -> Json<ConfigStatus> {
    let snapshot = state.service.snapshot();
    Json(ConfigStatus {
        path: snapshot.path.display().to_string(),
        last_modified: snapshot.last_modified,
    })
}
