//! OS signal handling.
//!
//! # Responsibilities
//! - Ctrl-C (SIGINT) triggers graceful shutdown
//! - SIGHUP reloads the config and re-runs the connectivity check
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP never shuts down; a failed reload keeps the live config

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ConfigService;
use crate::health;
use crate::lifecycle::shutdown::Shutdown;

/// Trigger `shutdown` on the first Ctrl-C.
pub fn spawn_ctrl_c(shutdown: Arc<Shutdown>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut stop = shutdown.subscribe();
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => {
                    tracing::info!("Shutdown signal received");
                    shutdown.trigger();
                }
                Err(e) => tracing::error!(error = %e, "Failed to install Ctrl-C handler"),
            },
            _ = stop.recv() => {}
        }
    })
}

/// Reload `service` on every SIGHUP until `shutdown` fires.
#[cfg(unix)]
pub fn spawn_reload_on_hangup(
    service: Arc<ConfigService>,
    shutdown: &Shutdown,
) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup())?;
    let mut stop = shutdown.subscribe();

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                received = hangups.recv() => {
                    if received.is_none() {
                        break;
                    }
                    tracing::info!("SIGHUP received, reloading config");
                    if service.reload().is_ok() {
                        health::smoke_test(&service.current()).await;
                    }
                }
                _ = stop.recv() => break,
            }
        }
    }))
}

/// SIGHUP does not exist here; reloads come from the file watcher only.
#[cfg(not(unix))]
pub fn spawn_reload_on_hangup(
    _service: Arc<ConfigService>,
    _shutdown: &Shutdown,
) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async {}))
}
