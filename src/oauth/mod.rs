//! Pluggable identity providers.
//!
//! # Data Flow
//! ```text
//! oauth_config_dir/*.json
//!     → loader.rs (decode name, handle, settings)
//!     → enabled? register in registry.rs + merge into Config.oauth_settings
//!
//! Client projection / login handlers:
//!     → registry.rs lookup by name
//!     → provider.rs capability (display name, auth exchange)
//! ```

pub mod loader;
pub mod provider;
pub mod registry;

pub use loader::{load_provider_file, load_providers, LoadedProvider, ProviderError};
pub use provider::{IdentityProvider, OAuthProvider, TokenRequest};
pub use registry::ProviderRegistry;
