//! Configuration file watcher for hot reload.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::service::{ConfigService, ConfigSnapshot};

/// Reloads a [`ConfigService`] whenever its source file changes.
pub struct ConfigWatcher {
    service: Arc<ConfigService>,
    update_tx: mpsc::UnboundedSender<Arc<ConfigSnapshot>>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for every snapshot it publishes.
    pub fn new(service: Arc<ConfigService>) -> (Self, mpsc::UnboundedReceiver<Arc<ConfigSnapshot>>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self { service, update_tx }, update_rx)
    }

    /// Start watching in a background thread. Dropping the returned
    /// handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.service.file_path();
        // Editors often replace the file, so watch its directory instead.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path.file_name().map(|name| name.to_os_string());

        let service = self.service;
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event
                            .paths
                            .iter()
                            .any(|changed| changed.file_name() == file_name.as_deref());
                    if !relevant {
                        return;
                    }

                    match service.has_changed_on_disk() {
                        Ok(false) => return,
                        Ok(true) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Cannot stat config file");
                            return;
                        }
                    }

                    tracing::info!("Config file change detected, reloading");
                    if let Ok(snapshot) = service.reload() {
                        let _ = tx.send(snapshot);
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::paths::PathResolver;
    use crate::oauth::ProviderRegistry;
    use std::fs::{self, File};
    use std::time::SystemTime;
    use tempfile::TempDir;

    const SALT: &str = "0123456789abcdef0123456789abcdef";

    fn body(site_name: &str) -> String {
        format!(
            "[team]\nsite_name = \"{site_name}\"\n\n[sql]\ndriver_name = \"postgres\"\n\
             data_source = \"postgres://u:p@db/chat\"\nat_rest_encrypt_key = \"{SALT}\"\n\n\
             [log]\nenable_console = false\nenable_file = false\n\n\
             [file]\npublic_link_salt = \"{SALT}\"\n\n\
             [email]\ninvite_salt = \"{SALT}\"\npassword_reset_salt = \"{SALT}\"\n"
        )
    }

    #[tokio::test]
    async fn test_file_change_triggers_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, body("Before")).unwrap();

        let resolver = PathResolver::new(dir.path(), dir.path().join("no-tmp"));
        let service = Arc::new(
            ConfigService::load_with(resolver, "config.toml", Arc::new(ProviderRegistry::new()), None)
                .unwrap(),
        );

        let (watcher, mut updates) = ConfigWatcher::new(Arc::clone(&service));
        let _handle = watcher.run().unwrap();

        fs::write(&path, body("After")).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();

        let snapshot = tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .expect("no reload within timeout")
            .expect("watcher channel closed");

        assert_eq!(snapshot.config.team.site_name, "After");
        assert_eq!(service.current().team.site_name, "After");
    }
}
