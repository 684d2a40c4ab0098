//! Process-wide configuration state.
//!
//! # Responsibilities
//! - Run the full load pipeline (decode, providers, logging, projection)
//! - Publish config, provider registry and client projection together as
//!   one snapshot
//! - Reload on demand without disturbing concurrent readers
//!
//! # Design Decisions
//! - `ArcSwap` gives lock-free reads; a reload is a single pointer store
//! - Every cycle registers providers into its own registry, so a failed
//!   reload leaves nothing behind
//! - Reloads are serialized; the last one to start is the last to publish

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;

use crate::config::client::ClientConfig;
use crate::config::loader::{self, ConfigError, LoadedConfig};
use crate::config::paths::PathResolver;
use crate::config::schema::Config;
use crate::oauth::{self, ProviderRegistry};
use crate::observability::logging::LogBackend;

/// One published configuration cycle.
#[derive(Debug)]
pub struct ConfigSnapshot {
    pub config: Arc<Config>,
    pub client: Arc<ClientConfig>,
    /// Providers registered by this cycle.
    pub registry: Arc<ProviderRegistry>,
    pub path: PathBuf,
    /// Source file modification time, seconds since the unix epoch.
    pub last_modified: i64,
}

/// Owner of the live configuration.
pub struct ConfigService {
    file_name: String,
    resolver: PathResolver,
    log_backend: Option<Arc<LogBackend>>,
    current: ArcSwap<ConfigSnapshot>,
    reload_lock: Mutex<()>,
}

impl ConfigService {
    /// Load `file_name` through the default search path and publish it.
    ///
    /// The initial load registers into `registry`; every reload starts
    /// from an empty one.
    pub fn load(
        file_name: &str,
        registry: Arc<ProviderRegistry>,
        log_backend: Option<Arc<LogBackend>>,
    ) -> Result<Self, ConfigError> {
        Self::load_with(PathResolver::from_env(), file_name, registry, log_backend)
    }

    /// As [`load`](Self::load), with an explicit search path.
    pub fn load_with(
        resolver: PathResolver,
        file_name: &str,
        registry: Arc<ProviderRegistry>,
        log_backend: Option<Arc<LogBackend>>,
    ) -> Result<Self, ConfigError> {
        let snapshot = build_snapshot(&resolver, file_name, registry, log_backend.as_deref())?;

        Ok(Self {
            file_name: file_name.to_string(),
            resolver,
            log_backend,
            current: ArcSwap::from_pointee(snapshot),
            reload_lock: Mutex::new(()),
        })
    }

    /// The live config.
    pub fn current(&self) -> Arc<Config> {
        Arc::clone(&self.current.load().config)
    }

    /// The live config, projection, registry and source metadata as one unit.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.current.load_full()
    }

    pub fn client_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.current.load().client)
    }

    /// Providers registered by the live cycle.
    pub fn registry(&self) -> Arc<ProviderRegistry> {
        Arc::clone(&self.current.load().registry)
    }

    pub fn file_path(&self) -> PathBuf {
        self.current.load().path.clone()
    }

    pub fn last_modified(&self) -> i64 {
        self.current.load().last_modified
    }

    /// Re-run the pipeline for the file this service was loaded from.
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        self.reload_from(&self.file_name)
    }

    /// Re-run the pipeline for `file_name` and publish the result.
    ///
    /// Blocks while another reload is in flight.
    pub fn reload_from(&self, file_name: &str) -> Result<Arc<ConfigSnapshot>, ConfigError> {
        let _guard = self
            .reload_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match build_snapshot(
            &self.resolver,
            file_name,
            Arc::new(ProviderRegistry::new()),
            self.log_backend.as_deref(),
        ) {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.current.store(Arc::clone(&snapshot));
                tracing::info!(
                    path = %snapshot.path.display(),
                    last_modified = snapshot.last_modified,
                    providers = snapshot.registry.len(),
                    "Config reloaded"
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!(error = %e, "Config reload failed, keeping current configuration");
                Err(e)
            }
        }
    }

    /// Whether the source file's mtime differs from the published one.
    pub fn has_changed_on_disk(&self) -> Result<bool, ConfigError> {
        let snapshot = self.current.load();
        let modified = loader::modified_unix_secs(&snapshot.path)?;
        Ok(modified != snapshot.last_modified)
    }

    /// Write `config` to the path the live config was read from.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let path = self.file_path();
        loader::save_config(&path, config)
    }
}

fn build_snapshot(
    resolver: &PathResolver,
    file_name: &str,
    registry: Arc<ProviderRegistry>,
    log_backend: Option<&LogBackend>,
) -> Result<ConfigSnapshot, ConfigError> {
    let LoadedConfig {
        mut config,
        path,
        last_modified,
    } = loader::load_with_resolver(resolver, file_name)?;

    load_providers(&mut config, &registry, &path)?;

    if let Some(backend) = log_backend {
        if let Err(e) = backend.configure_with(&config.log, resolver) {
            tracing::error!(error = %e, "Failed to activate file logging");
        }
    }

    let client = ClientConfig::build(&config, &registry);

    Ok(ConfigSnapshot {
        config: Arc::new(config),
        client: Arc::new(client),
        registry,
        path,
        last_modified,
    })
}

fn load_providers(
    config: &mut Config,
    registry: &ProviderRegistry,
    path: &Path,
) -> Result<(), ConfigError> {
    match oauth::load_providers(config, registry) {
        Ok(_) => Ok(()),
        Err(source) if source.is_internal() => Err(ConfigError::Provider {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) => {
            tracing::info!(error = %e, "Identity providers not loaded");
            Ok(())
        }
    }
}
