//! HTTP surface of the config service.
//!
//! # Data Flow
//! ```text
//! GET /api/v1/config/client
//!     → server.rs handler
//!     → ConfigService::client_config (lock-free snapshot read)
//!     → PascalCase JSON
//! ```

pub mod server;

pub use server::{AppState, ConfigStatus, HttpServer, CLIENT_CONFIG_PATH, CLIENT_CONFIG_STATUS_PATH};
