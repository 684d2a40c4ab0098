//! Server configuration: discovery, validation, identity providers,
//! logging activation and a public client projection, reloadable at
//! runtime.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod oauth;
pub mod observability;

pub use config::{ClientConfig, Config, ConfigError, ConfigService};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use oauth::ProviderRegistry;
