//! Name-keyed registry of identity providers.
//!
//! Each load cycle fills a fresh registry, published together with the
//! config it was built from. Entries are never removed. Reads from request
//! handlers may run concurrently with registration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::oauth::provider::IdentityProvider;

#[derive(Debug, Clone)]
struct Registered {
    seq: u64,
    provider: Arc<dyn IdentityProvider>,
}

/// A thread-safe provider registry. Re-registering a name replaces the
/// previous entry and moves it to the end of the registration order.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    inner: DashMap<String, Registered>,
    next_seq: AtomicU64,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`, replacing any previous entry.
    pub fn register(&self, name: &str, provider: Arc<dyn IdentityProvider>) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .inner
            .insert(name.to_string(), Registered { seq, provider })
            .is_some();
        tracing::debug!(provider = name, replaced, "Identity provider registered");
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn IdentityProvider>> {
        self.inner.get(name).map(|entry| entry.provider.clone())
    }

    /// All providers in registration order.
    pub fn providers(&self) -> Vec<(String, Arc<dyn IdentityProvider>)> {
        let mut entries: Vec<(u64, String, Arc<dyn IdentityProvider>)> = self
            .inner
            .iter()
            .map(|entry| (entry.seq, entry.key().clone(), entry.provider.clone()))
            .collect();
        entries.sort_by_key(|(seq, _, _)| *seq);
        entries
            .into_iter()
            .map(|(_, name, provider)| (name, provider))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SsoSettings;
    use crate::oauth::provider::OAuthProvider;

    fn provider(name: &str, display: &str) -> Arc<dyn IdentityProvider> {
        let settings = SsoSettings {
            enable: true,
            auth_endpoint: "https://idp.example.com/auth".to_string(),
            token_endpoint: "https://idp.example.com/token".to_string(),
            ..SsoSettings::default()
        };
        Arc::new(OAuthProvider::from_settings(name, display, &settings).unwrap())
    }

    #[test]
    fn test_registration_order() {
        let registry = ProviderRegistry::new();
        registry.register("zeta", provider("zeta", "Zeta"));
        registry.register("alpha", provider("alpha", "Alpha"));

        let names: Vec<String> = registry.providers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_last_write_wins() {
        let registry = ProviderRegistry::new();
        registry.register("corp", provider("corp", "Old"));
        registry.register("other", provider("other", "Other"));
        registry.register("corp", provider("corp", "New"));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("corp").unwrap().display_name(), "New");
        let names: Vec<String> = registry.providers().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["other", "corp"]);
    }

    #[test]
    fn test_unknown_name() {
        let registry = ProviderRegistry::new();
        assert!(registry.get("missing").is_none());
        assert!(registry.is_empty());
    }
}
