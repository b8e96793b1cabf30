//! Activation-time cleanup of superseded cache generations.

use std::sync::Arc;

use shellcache_core::{CacheStorage, Error};

/// Deletes every generation other than the current one.
pub struct GenerationManager {
    store: Arc<dyn CacheStorage>,
    current: String,
}

impl GenerationManager {
    pub fn new(store: Arc<dyn CacheStorage>, current: impl Into<String>) -> Self {
        Self { store, current: current.into() }
    }

    /// Delete all generations whose name differs from the current one.
    ///
    /// Returns the names actually deleted. A failed delete is logged and the
    /// remaining generations are still processed. Deletion is permanent.
    ///
    /// # Errors
    ///
    /// Returns an error if the generation names can't be listed.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let names = self.store.keys().await?;
        let mut deleted = Vec::new();

        for name in names.into_iter().filter(|name| *name != self.current) {
            match self.store.delete(&name).await {
                Ok(true) => {
                    tracing::info!(generation = %name, "cleaning cache");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(generation = %name, error = %e, "failed to delete cache generation"),
            }
        }

        Ok(deleted)
    }
}
