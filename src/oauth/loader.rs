//! Identity provider discovery from definition files.
//!
//! # Responsibilities
//! - List `*.json` files in the configured provider directory
//! - Decode each into a (name, handle, settings) triple
//! - Register enabled providers and merge their settings into the config
//!
//! # Design Decisions
//! - Files are visited in sorted order so registration order is stable
//! - The first failing file aborts the whole scan; the caller decides
//!   whether that is fatal (see [`ProviderError::is_internal`])
//! - A missing directory behaves like a directory with no matches

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::config::{Config, SsoSettings};
use crate::oauth::provider::{IdentityProvider, OAuthProvider};
use crate::oauth::registry::ProviderRegistry;

/// Extension of provider definition files.
pub const PROVIDER_FILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("error looking for provider files in {dir}: {source}")]
    Directory { dir: PathBuf, source: io::Error },

    #[error("error reading provider settings from {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("error decoding provider settings from {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("provider {name} from {path} is enabled but has no handle after load")]
    HandleMissing { name: String, path: PathBuf },
}

impl ProviderError {
    /// True for loader inconsistencies, as opposed to bad input files.
    pub fn is_internal(&self) -> bool {
        matches!(self, ProviderError::HandleMissing { .. })
    }
}

/// On-disk shape of a provider definition file.
#[derive(Debug, Deserialize)]
struct ProviderDefinition {
    name: String,
    #[serde(default)]
    display_name: String,
    settings: SsoSettings,
}

/// A decoded provider definition.
#[derive(Debug, Clone)]
pub struct LoadedProvider {
    pub name: String,
    /// Absent when the settings cannot back a working provider.
    pub handle: Option<Arc<dyn IdentityProvider>>,
    pub settings: SsoSettings,
}

/// Decode a single provider definition file.
pub fn load_provider_file(path: &Path) -> Result<LoadedProvider, ProviderError> {
    let content = fs::read_to_string(path).map_err(|source| ProviderError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let definition: ProviderDefinition =
        serde_json::from_str(&content).map_err(|source| ProviderError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let handle = OAuthProvider::from_settings(
        &definition.name,
        &definition.display_name,
        &definition.settings,
    )
    .map(|provider| Arc::new(provider) as Arc<dyn IdentityProvider>);

    Ok(LoadedProvider {
        name: definition.name,
        handle,
        settings: definition.settings,
    })
}

/// Load every provider definition under `config.oauth_config_dir`.
///
/// Enabled providers are registered in `registry` and their settings are
/// merged into `config.oauth_settings`. Returns how many were registered.
pub fn load_providers(
    config: &mut Config,
    registry: &ProviderRegistry,
) -> Result<usize, ProviderError> {
    if config.oauth_config_dir.is_empty() {
        return Ok(0);
    }

    let dir = PathBuf::from(&config.oauth_config_dir);
    let mut registered = 0;

    for path in provider_files(&dir)? {
        let loaded = load_provider_file(&path)?;

        if !loaded.settings.enable {
            tracing::debug!(provider = %loaded.name, path = %path.display(), "Skipping disabled provider");
            continue;
        }

        let handle = loaded.handle.ok_or_else(|| ProviderError::HandleMissing {
            name: loaded.name.clone(),
            path: path.clone(),
        })?;

        config
            .oauth_settings
            .get_or_insert_with(BTreeMap::new)
            .insert(loaded.name.clone(), loaded.settings);
        registry.register(&loaded.name, handle);
        registered += 1;
    }

    tracing::info!(dir = %dir.display(), registered, "Identity providers loaded");
    Ok(registered)
}

/// Sorted `*.json` files directly inside `dir`.
fn provider_files(dir: &Path) -> Result<Vec<PathBuf>, ProviderError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ProviderError::Directory {
                dir: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProviderError::Directory {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let is_definition = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(PROVIDER_FILE_EXTENSION);
        if is_definition {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
