//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Activate logging → Connectivity check → Listen
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C → broadcast → server drains → Exit
//!
//! Signals (signals.rs):
//!     SIGINT → Trigger graceful shutdown
//!     SIGHUP → Trigger config reload
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{initialize, serve, StartupError};
