//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! tracing event
//!     → EnvFilter (RUST_LOG)
//!     → logging.rs LogLayer
//!     → each active sink (console, rotating file) above its threshold
//! ```
//!
//! # Design Decisions
//! - Sinks are swapped in place on every config load, so the global
//!   subscriber is installed exactly once
//! - Console-only WARN logging is active before any config is read

pub mod logging;

pub use logging::{LogBackend, LogLayer, LoggingError, Severity};
