use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::CacheResult;
use crate::types::{AssetResponse, RequestKey};

use super::{sort_stores, validate_store_name, CacheStorage, StoreInfo};

#[derive(Debug)]
struct MemoryStore {
    created_at: DateTime<Utc>,
    entries: BTreeMap<RequestKey, AssetResponse>,
}

impl MemoryStore {
    fn new() -> Self {
        Self {
            created_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }
}

/// In-process storage. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stores: RwLock<BTreeMap<String, MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, store: &str) -> CacheResult<()> {
        validate_store_name(store)?;
        self.stores
            .write()
            .await
            .entry(store.to_string())
            .or_insert_with(MemoryStore::new);
        Ok(())
    }

    async fn has_store(&self, store: &str) -> CacheResult<bool> {
        Ok(self.stores.read().await.contains_key(store))
    }

    async fn match_entry(
        &self,
        store: &str,
        key: &RequestKey,
    ) -> CacheResult<Option<AssetResponse>> {
        Ok(self
            .stores
            .read()
            .await
            .get(store)
            .and_then(|s| s.entries.get(key))
            .cloned())
    }

    async fn put(
        &self,
        store: &str,
        key: &RequestKey,
        response: &AssetResponse,
    ) -> CacheResult<()> {
        validate_store_name(store)?;
        self.stores
            .write()
            .await
            .entry(store.to_string())
            .or_insert_with(MemoryStore::new)
            .entries
            .insert(key.clone(), response.clone());
        Ok(())
    }

    async fn put_all(
        &self,
        store: &str,
        entries: &[(RequestKey, AssetResponse)],
    ) -> CacheResult<()> {
        validate_store_name(store)?;
        // Single lock so a batch is never observed half-written.
        let mut stores = self.stores.write().await;
        let target = stores
            .entry(store.to_string())
            .or_insert_with(MemoryStore::new);
        for (key, response) in entries {
            target.entries.insert(key.clone(), response.clone());
        }
        Ok(())
    }

    async fn delete_entry(&self, store: &str, key: &RequestKey) -> CacheResult<bool> {
        Ok(self
            .stores
            .write()
            .await
            .get_mut(store)
            .map(|s| s.entries.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn delete_store(&self, store: &str) -> CacheResult<bool> {
        Ok(self.stores.write().await.remove(store).is_some())
    }

    async fn stores(&self) -> CacheResult<Vec<StoreInfo>> {
        let mut infos: Vec<StoreInfo> = self
            .stores
            .read()
            .await
            .iter()
            .map(|(name, s)| StoreInfo {
                name: name.clone(),
                created_at: s.created_at,
                entries: s.entries.len(),
            })
            .collect();
        sort_stores(&mut infos);
        Ok(infos)
    }

    async fn keys(&self, store: &str) -> CacheResult<Vec<RequestKey>> {
        Ok(self
            .stores
            .read()
            .await
            .get(store)
            .map(|s| s.entries.keys().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn key(path: &str) -> RequestKey {
        RequestKey::from_url(&Url::parse("https://app.example/mint/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_memory_roundtrip() {
        let storage = MemoryStorage::new();
        let response = AssetResponse::new(200, "shell");

        storage.open("sundai-v6").await.unwrap();
        storage
            .put("sundai-v6", &key("index.html"), &response)
            .await
            .unwrap();

        let hit = storage
            .match_entry("sundai-v6", &key("index.html"))
            .await
            .unwrap();
        assert_eq!(hit, Some(response));
        assert!(storage
            .match_entry("sundai-v6", &key("a.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_stores_are_disjoint() {
        let storage = MemoryStorage::new();
        storage
            .put("sundai-v5", &key("a.json"), &AssetResponse::new(200, "old"))
            .await
            .unwrap();
        storage.open("sundai-v6").await.unwrap();

        assert!(storage
            .match_entry("sundai-v6", &key("a.json"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(storage.keys("sundai-v5").await.unwrap(), vec![key("a.json")]);
        assert!(storage.keys("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_entry_and_store() {
        let storage = MemoryStorage::new();
        storage
            .put("sundai-v6", &key("a.json"), &AssetResponse::new(200, "a"))
            .await
            .unwrap();

        assert!(storage.delete_entry("sundai-v6", &key("a.json")).await.unwrap());
        assert!(!storage.delete_entry("sundai-v6", &key("a.json")).await.unwrap());
        assert!(storage.delete_store("sundai-v6").await.unwrap());
        assert!(!storage.has_store("sundai-v6").await.unwrap());
        assert!(!storage.delete_store("sundai-v6").await.unwrap());
    }

    #[tokio::test]
    async fn test_stores_listed_oldest_first() {
        let storage = MemoryStorage::new();
        storage.open("sundai-v1").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        storage.open("sundai-v2").await.unwrap();
        storage
            .put("sundai-v2", &key("a.json"), &AssetResponse::new(200, "a"))
            .await
            .unwrap();

        let stores = storage.stores().await.unwrap();
        let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sundai-v1", "sundai-v2"]);
        assert_eq!(stores[1].entries, 1);
    }
}
