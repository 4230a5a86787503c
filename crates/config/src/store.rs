use std::sync::Arc;

use parking_lot::RwLock;

use crate::patch::ConfigPatch;
use crate::{AppConfig, ConfigError};

/// Process-wide configuration cache.
///
/// Created once at program start and shared behind an `Arc`. Reads are cheap
/// clones of the inner `Arc<AppConfig>`; the environment is only re-read on
/// an explicit [`ConfigStore::reload`].
pub struct ConfigStore {
    inner: RwLock<Arc<AppConfig>>,
}

impl ConfigStore {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(AppConfig::from_env()?))
    }

    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: RwLock::new(Arc::new(config)),
        }
    }

    /// Returns the cached configuration.
    pub fn get(&self) -> Arc<AppConfig> {
        self.inner.read().clone()
    }

    /// Re-resolves the configuration from the environment, replacing the
    /// cached copy (and discarding any applied patches).
    pub fn reload(&self) -> Result<Arc<AppConfig>, ConfigError> {
        let fresh = Arc::new(AppConfig::from_env()?);
        *self.inner.write() = fresh.clone();
        Ok(fresh)
    }

    /// Merges a partial update into the cached configuration.
    ///
    /// The store is env-sourced, so the merge lives for the process lifetime;
    /// a restart or reload returns to environment values.
    pub fn apply(&self, patch: ConfigPatch) -> Arc<AppConfig> {
        let mut guard = self.inner.write();
        let mut config = (**guard).clone();
        patch.apply_to(&mut config);
        let updated = Arc::new(config);
        *guard = updated.clone();
        updated
    }
}
