//! Configuration loading from disk.
//!
//! # Pipeline
//! ```text
//! logical name → paths::find_config_file → read → toml decode
//!     → record mtime + resolved path → set_defaults → validate → normalize
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;

use crate::config::paths::PathResolver;
use crate::config::schema::Config;
use crate::config::validation::{validate_config, ValidationError};
use crate::oauth::ProviderError;

/// Error type for configuration loading and saving.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error opening config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error decoding config file {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("error getting config info for {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error validating config file {path}: {}", join_errors(.errors))]
    Validation {
        path: PathBuf,
        errors: Vec<ValidationError>,
    },

    #[error("error loading identity providers for {path}: {source}")]
    Provider {
        path: PathBuf,
        source: ProviderError,
    },

    #[error("error encoding config for {path}: {source}")]
    Encode {
        path: PathBuf,
        source: toml::ser::Error,
    },

    #[error("error saving config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A decoded, defaulted and validated config plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    /// Path the config was read from, as resolved by the search path.
    pub path: PathBuf,
    /// Source file modification time, seconds since the unix epoch.
    pub last_modified: i64,
}

/// Resolve `file_name` through the search path and load it.
pub fn load_config(file_name: &str) -> Result<LoadedConfig, ConfigError> {
    load_with_resolver(&PathResolver::from_env(), file_name)
}

/// Resolve `file_name` with an explicit resolver and load it.
pub fn load_with_resolver(
    resolver: &PathResolver,
    file_name: &str,
) -> Result<LoadedConfig, ConfigError> {
    load_from_path(&resolver.find_config_file(file_name))
}

/// Load, default and validate the config at `path`.
pub fn load_from_path(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Decode {
        path: path.to_path_buf(),
        source,
    })?;

    let last_modified = modified_unix_secs(path)?;

    config.set_defaults();

    validate_config(&config).map_err(|errors| ConfigError::Validation {
        path: path.to_path_buf(),
        errors,
    })?;

    config.normalize();

    tracing::debug!(path = %path.display(), last_modified, "Config file decoded");

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        last_modified,
    })
}

/// Write `config` to `path` as pretty TOML.
pub fn save_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config).map_err(|source| ConfigError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!(path = %path.display(), "Config saved");
    Ok(())
}

/// Modification time of `path` in whole seconds since the unix epoch.
pub fn modified_unix_secs(path: &Path) -> Result<i64, ConfigError> {
    let metadata_err = |source| ConfigError::Metadata {
        path: path.to_path_buf(),
        source,
    };

    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(metadata_err)?;

    let secs = match modified.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    };
    Ok(secs)
}
