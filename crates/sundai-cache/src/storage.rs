//! Storage capability: named, versioned stores of request key → response.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`] keeps everything in process (tests, ephemeral hosts)
//! - [`DiskStorage`] persists one directory per store
//!
//! # Disk Layout
//!
//! ```text
//! {root}/{store}/
//!   store.json                 # store metadata (creation time)
//!   entries/{sha256(key)}/
//!     entry.json               # url, status, headers, body digest
//!     body.bin                 # response body
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetResponse, RequestKey};

mod disk;
mod io;
mod memory;

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

/// Summary of one named store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub entries: usize,
}

/// Persistent store operations used by the worker.
///
/// Per-key operations are atomic. Writing into a store that was never
/// opened creates it.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a store, creating it if absent.
    async fn open(&self, store: &str) -> CacheResult<()>;

    async fn has_store(&self, store: &str) -> CacheResult<bool>;

    /// Look up a stored response. `None` when the store or entry is absent.
    async fn match_entry(
        &self,
        store: &str,
        key: &RequestKey,
    ) -> CacheResult<Option<AssetResponse>>;

    /// Store a response, replacing any previous entry under `key`.
    async fn put(&self, store: &str, key: &RequestKey, response: &AssetResponse)
        -> CacheResult<()>;

    /// Store a batch of responses.
    async fn put_all(
        &self,
        store: &str,
        entries: &[(RequestKey, AssetResponse)],
    ) -> CacheResult<()> {
        for (key, response) in entries {
            self.put(store, key, response).await?;
        }
        Ok(())
    }

    /// Remove one entry. Returns whether it existed.
    async fn delete_entry(&self, store: &str, key: &RequestKey) -> CacheResult<bool>;

    /// Remove a whole store. Returns whether it existed.
    async fn delete_store(&self, store: &str) -> CacheResult<bool>;

    /// All stores, oldest first.
    async fn stores(&self) -> CacheResult<Vec<StoreInfo>>;

    /// Keys held by a store, sorted. Empty when the store is absent.
    async fn keys(&self, store: &str) -> CacheResult<Vec<RequestKey>>;
}

/// Reject store names that cannot be used as a single path segment.
pub(crate) fn validate_store_name(store: &str) -> CacheResult<()> {
    if store.is_empty() || store == "." || store == ".." || store.contains(['/', '\\']) {
        return Err(CacheError::Config {
            message: format!("invalid store name: '{}'", store),
        });
    }
    Ok(())
}

pub(crate) fn sort_stores(stores: &mut [StoreInfo]) {
    stores.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_store_name() {
        assert!(validate_store_name("sundai-v6").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(validate_store_name(bad).is_err(), "{:?} accepted", bad);
        }
    }
}
