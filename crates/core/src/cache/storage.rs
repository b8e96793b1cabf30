//! The named cache store the worker components are written against.
//!
//! Each method is a single atomic store operation. No operation spans more
//! than one call, so callers never hold locks across awaits.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::entries::{CacheEntry, EntrySummary, StoredResponse};
use crate::Error;

/// A store of named cache generations.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation by name, creating it if absent.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Enumerate the names of all existing generations.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and its entries. Returns false if it didn't exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Find the response stored for `method url` in a generation.
    async fn match_entry(&self, name: &str, method: &str, url: &str) -> Result<Option<StoredResponse>, Error>;

    /// Store an entry, replacing any previous entry for the same request.
    async fn put(&self, name: &str, entry: &CacheEntry) -> Result<(), Error>;

    /// List the entries of a generation.
    async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        if self.open_generation(name).await? {
            tracing::info!(generation = name, "created cache generation");
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.generation_names().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.delete_generation(name).await
    }

    async fn match_entry(&self, name: &str, method: &str, url: &str) -> Result<Option<StoredResponse>, Error> {
        CacheDb::match_entry(self, name, method, url).await
    }

    async fn put(&self, name: &str, entry: &CacheEntry) -> Result<(), Error> {
        self.put_entry(name, entry).await
    }

    async fn entries(&self, name: &str) -> Result<Vec<EntrySummary>, Error> {
        self.list_entries(name).await
    }
}
