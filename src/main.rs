//! Server configuration daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ paths ──▶ loader ──▶ oauth providers ──▶ logging ──▶ client projection
//!                                                                            │
//!                                                                            ▼
//!                              watcher / SIGHUP ──reload──▶ ConfigService (ArcSwap snapshot)
//!                                                                            │
//!   GET /api/v1/config/client ◀──────────── http server ◀────────────────────┘
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use server_config::config::LogSettings;
use server_config::lifecycle::{self, Shutdown};
use server_config::observability::LogBackend;

#[derive(Parser)]
#[command(name = "server-config")]
#[command(about = "Load, validate and serve the server configuration", long_about = None)]
struct Cli {
    /// Config file name, looked up in /tmp, ./config, ../config and ./
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Address to serve on; defaults to service.listen_address
    #[arg(short, long)]
    listen: Option<String>,

    /// Load and validate the config, print the result, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_backend = LogBackend::new();
    if let Err(e) = log_backend.configure(&LogSettings::command_line()) {
        eprintln!("{e}");
    }
    log_backend.install();

    let service = match lifecycle::initialize(&cli.config, Arc::clone(&log_backend)) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            eprintln!("{e}");
            log_backend.close();
            return ExitCode::FAILURE;
        }
    };

    if cli.check {
        println!("{}: configuration is valid", service.file_path().display());
        log_backend.close();
        return ExitCode::SUCCESS;
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "server-config starting");

    let shutdown = Arc::new(Shutdown::new());
    let result = lifecycle::serve(service, cli.listen.as_deref(), shutdown).await;

    let code = match result {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server stopped with error");
            ExitCode::FAILURE
        }
    };
    log_backend.close();
    code
}
