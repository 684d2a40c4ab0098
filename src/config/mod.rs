//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! logical file name
//!     → paths.rs (search tmp, ./config, ../config, ./)
//!     → loader.rs (decode TOML, record mtime, defaults, validate, normalize)
//!     → oauth::load_providers (merge provider settings, fill registry)
//!     → observability::logging (activate sinks from `log`)
//!     → client.rs (public projection)
//!     → service.rs (atomic swap of config + projection)
//!
//! On reload (watcher.rs or SIGHUP):
//!     same pipeline → swap on success, keep previous snapshot on failure
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; changes require a full reload
//! - Every optional field has a schema default so minimal files work
//! - Validation separates syntactic (serde) from semantic checks

pub mod client;
pub mod loader;
pub mod paths;
pub mod schema;
pub mod service;
pub mod validation;
pub mod watcher;

pub use client::{BuildInfo, ClientConfig};
pub use loader::{load_config, save_config, ConfigError, LoadedConfig};
pub use paths::{find_config_file, find_dir, PathResolver};
pub use schema::{
    Config, EmailSettings, FileSettings, LdapSettings, LogSettings, PrivacySettings,
    RateLimitSettings, ServiceSettings, SqlSettings, SsoSettings, SupportSettings,
    TeamSettings, FILE_DRIVER_LOCAL, FILE_DRIVER_S3, SQL_DRIVER_MYSQL, SQL_DRIVER_POSTGRES,
};
pub use service::{ConfigService, ConfigSnapshot};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
