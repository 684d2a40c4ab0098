//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the config through the full pipeline
//! - Run the connectivity check
//! - Start reload triggers (file watcher, SIGHUP)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: config errors are fatal at startup
//! - Connectivity failures are reported, never fatal
//! - Listener binds last (traffic only when config is live)

use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{Config, ConfigError, ConfigService, ConfigWatcher};
use crate::health;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals;
use crate::oauth::ProviderRegistry;
use crate::observability::logging::LogBackend;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error("failed to start config watcher: {0}")]
    Watch(#[from] notify::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Load `file_name` and publish it, reconfiguring `log_backend` from the
/// file's logging section.
pub fn initialize(
    file_name: &str,
    log_backend: Arc<LogBackend>,
) -> Result<Arc<ConfigService>, ConfigError> {
    let registry = Arc::new(ProviderRegistry::new());
    let service = ConfigService::load(file_name, registry, Some(log_backend))?;

    let snapshot = service.snapshot();
    tracing::info!(
        path = %snapshot.path.display(),
        site_name = %snapshot.config.team.site_name,
        providers = service.registry().len(),
        "Configuration loaded"
    );

    Ok(Arc::new(service))
}

/// Turn a listen setting into a bindable address. A bare `:port` binds
/// every interface.
pub fn bind_address(listen: &str) -> String {
    if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    }
}

/// Address to bind: the command line override if given, else the
/// configured `service.listen_address`.
pub fn listen_address(listen: Option<&str>, config: &Config) -> String {
    bind_address(listen.unwrap_or(config.service.listen_address.as_str()))
}

/// Run the service until `shutdown` fires.
///
/// `listen` overrides `service.listen_address` from the config.
pub async fn serve(
    service: Arc<ConfigService>,
    listen: Option<&str>,
    shutdown: Arc<Shutdown>,
) -> Result<(), StartupError> {
    health::smoke_test(&service.current()).await;

    let (watcher, mut updates) = ConfigWatcher::new(Arc::clone(&service));
    let _watch_handle = watcher.run()?;
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Some(snapshot) => {
                        health::smoke_test(&snapshot.config).await;
                    }
                    None => break,
                },
                _ = stop.recv() => break,
            }
        }
    });

    if let Err(e) = signals::spawn_reload_on_hangup(Arc::clone(&service), &shutdown) {
        tracing::warn!(error = %e, "SIGHUP reload unavailable");
    }
    signals::spawn_ctrl_c(Arc::clone(&shutdown));

    let address = listen_address(listen, &service.current());
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(address = %address, "Listening for connections");

    HttpServer::new(service)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
