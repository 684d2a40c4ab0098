//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! validated Config
//!     → connectivity.rs (derive probe targets)
//!     → probe each with a bounded timeout
//!     → reports logged; startup continues regardless
//! ```
//!
//! # Design Decisions
//! - Runs after every successful load or reload
//! - Probes are sequential; each is bounded so the whole run is too

pub mod connectivity;

pub use connectivity::{smoke_test, smoke_test_with, ProbeOutcome, ProbeReport, ProbeTarget, SMOKE_TEST_TIMEOUT};
