//! Disk backend with integrity verification on read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::digest::{body_digest, key_dir_name};
use crate::error::{CacheError, CacheResult};
use crate::types::{AssetResponse, RequestKey};

use super::io;
use super::{sort_stores, validate_store_name, CacheStorage, StoreInfo};

const STORE_META: &str = "store.json";
const ENTRIES_DIR: &str = "entries";
const ENTRY_META: &str = "entry.json";
const ENTRY_BODY: &str = "body.bin";

/// Store metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreMeta {
    name: String,
    created_at: DateTime<Utc>,
}

/// Entry metadata stored next to the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    /// Request key the entry was stored under.
    url: RequestKey,

    status: u16,

    #[serde(default)]
    headers: Vec<(String, String)>,

    /// Body digest (sha256:...).
    digest: String,

    stored_at: DateTime<Utc>,
}

/// Storage persisted under a root directory.
#[derive(Debug, Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    /// Storage at the default location.
    ///
    /// Default: `<user cache dir>/sundai/caches`
    pub fn new() -> CacheResult<Self> {
        Ok(Self {
            root: io::default_root_impl()?,
        })
    }

    /// Storage rooted at a custom directory.
    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage from `SUNDAI_CACHE_DIR`, falling back to the default location.
    pub fn from_env() -> CacheResult<Self> {
        match std::env::var("SUNDAI_CACHE_DIR") {
            Ok(dir) if !dir.is_empty() => Ok(Self::with_dir(dir)),
            _ => Self::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, store: &str) -> PathBuf {
        self.root.join(store)
    }

    fn entry_dir(&self, store: &str, key: &RequestKey) -> PathBuf {
        self.store_dir(store)
            .join(ENTRIES_DIR)
            .join(key_dir_name(key))
    }

    async fn read_store_meta(&self, store: &str) -> Option<StoreMeta> {
        let content = fs::read_to_string(self.store_dir(store).join(STORE_META))
            .await
            .ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn read_entry_meta(&self, dir: &Path) -> CacheResult<EntryMeta> {
        let content = fs::read_to_string(dir.join(ENTRY_META))
            .await
            .map_err(|e| CacheError::storage("failed to read entry metadata", e))?;
        serde_json::from_str(&content)
            .map_err(|e| CacheError::storage("failed to parse entry metadata", e))
    }
}

#[async_trait]
impl CacheStorage for DiskStorage {
    async fn open(&self, store: &str) -> CacheResult<()> {
        validate_store_name(store)?;
        let dir = self.store_dir(store);
        let meta_path = dir.join(STORE_META);

        if io::exists_impl(&meta_path).await? {
            return Ok(());
        }

        fs::create_dir_all(dir.join(ENTRIES_DIR))
            .await
            .map_err(|e| CacheError::storage("failed to create store directory", e))?;

        let meta = StoreMeta {
            name: store.to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| CacheError::storage("failed to serialize store metadata", e))?;
        io::write_atomic_impl(&meta_path, &json).await?;

        debug!(store, "created store");
        Ok(())
    }

    async fn has_store(&self, store: &str) -> CacheResult<bool> {
        validate_store_name(store)?;
        io::exists_impl(&self.store_dir(store).join(STORE_META)).await
    }

    async fn match_entry(
        &self,
        store: &str,
        key: &RequestKey,
    ) -> CacheResult<Option<AssetResponse>> {
        validate_store_name(store)?;
        let dir = self.entry_dir(store, key);
        let meta_path = dir.join(ENTRY_META);
        let body_path = dir.join(ENTRY_BODY);

        if !io::exists_impl(&meta_path).await? || !io::exists_impl(&body_path).await? {
            return Ok(None);
        }

        let meta = self.read_entry_meta(&dir).await?;
        let body = fs::read(&body_path)
            .await
            .map_err(|e| CacheError::storage("failed to read entry body", e))?;

        let actual = body_digest(&body);
        if actual != meta.digest {
            warn!(
                store,
                url = %key,
                expected = %meta.digest,
                actual = %actual,
                "entry integrity check failed"
            );
            return Err(CacheError::DigestMismatch {
                url: key.to_string(),
                expected: meta.digest,
                actual,
            });
        }

        Ok(Some(AssetResponse {
            status: meta.status,
            headers: meta.headers,
            body,
        }))
    }

    async fn put(
        &self,
        store: &str,
        key: &RequestKey,
        response: &AssetResponse,
    ) -> CacheResult<()> {
        self.open(store).await?;

        let dir = self.entry_dir(store, key);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::storage("failed to create entry directory", e))?;

        let meta = EntryMeta {
            url: key.clone(),
            status: response.status,
            headers: response.headers.clone(),
            digest: body_digest(&response.body),
            stored_at: Utc::now(),
        };

        // Body first: an entry only counts once its metadata exists.
        io::write_atomic_impl(&dir.join(ENTRY_BODY), &response.body).await?;

        let json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| CacheError::storage("failed to serialize entry metadata", e))?;
        io::write_atomic_impl(&dir.join(ENTRY_META), &json).await?;

        debug!(store, url = %key, bytes = response.body.len(), "stored entry");
        Ok(())
    }

    async fn delete_entry(&self, store: &str, key: &RequestKey) -> CacheResult<bool> {
        validate_store_name(store)?;
        let dir = self.entry_dir(store, key);

        if !io::exists_impl(&dir).await? {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| CacheError::storage("failed to delete entry", e))?;
        debug!(store, url = %key, "deleted entry");
        Ok(true)
    }

    async fn delete_store(&self, store: &str) -> CacheResult<bool> {
        validate_store_name(store)?;
        let dir = self.store_dir(store);

        if !io::exists_impl(&dir).await? {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| CacheError::storage("failed to delete store", e))?;
        debug!(store, "deleted store");
        Ok(true)
    }

    async fn stores(&self) -> CacheResult<Vec<StoreInfo>> {
        let mut infos = Vec::new();

        for name in io::list_dirs_impl(&self.root).await? {
            // Directories without store metadata are not stores.
            let Some(meta) = self.read_store_meta(&name).await else {
                continue;
            };
            let entries = io::list_dirs_impl(&self.store_dir(&name).join(ENTRIES_DIR))
                .await?
                .len();
            infos.push(StoreInfo {
                name,
                created_at: meta.created_at,
                entries,
            });
        }

        sort_stores(&mut infos);
        Ok(infos)
    }

    async fn keys(&self, store: &str) -> CacheResult<Vec<RequestKey>> {
        validate_store_name(store)?;
        let entries_dir = self.store_dir(store).join(ENTRIES_DIR);
        let mut keys = Vec::new();

        for name in io::list_dirs_impl(&entries_dir).await? {
            match self.read_entry_meta(&entries_dir.join(&name)).await {
                Ok(meta) => keys.push(meta.url),
                Err(e) => warn!(store, entry = %name, error = %e, "skipping unreadable entry"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use url::Url;

    fn create_test_storage() -> (DiskStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = DiskStorage::with_dir(temp_dir.path().join("caches"));
        (storage, temp_dir)
    }

    fn key(path: &str) -> RequestKey {
        RequestKey::from_url(&Url::parse("https://app.example/mint/").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_disk_roundtrip() {
        let (storage, _temp_dir) = create_test_storage();
        let response = AssetResponse::new(200, "<html>shell</html>")
            .with_header("content-type", "text/html");

        storage.open("sundai-v6").await.unwrap();
        storage
            .put("sundai-v6", &key("index.html"), &response)
            .await
            .unwrap();

        let entry = storage
            .match_entry("sundai-v6", &key("index.html"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry, response);
    }

    #[tokio::test]
    async fn test_disk_miss() {
        let (storage, _temp_dir) = create_test_storage();

        let result = storage
            .match_entry("sundai-v6", &key("nonexistent.json"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_disk_integrity_failure() {
        let (storage, _temp_dir) = create_test_storage();
        storage
            .put("sundai-v6", &key("a.json"), &AssetResponse::new(200, "{\"a\":1}"))
            .await
            .unwrap();

        // Corrupt the stored body
        let body_path = storage.entry_dir("sundai-v6", &key("a.json")).join(ENTRY_BODY);
        fs::write(&body_path, "corrupted").await.unwrap();

        let err = storage
            .match_entry("sundai-v6", &key("a.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::DigestMismatch { .. }));

        assert!(storage.delete_entry("sundai-v6", &key("a.json")).await.unwrap());
        assert!(storage
            .match_entry("sundai-v6", &key("a.json"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_entry_metadata_corrupt_handling() {
        let (storage, _temp_dir) = create_test_storage();
        storage
            .put("sundai-v6", &key("a.json"), &AssetResponse::new(200, "{}"))
            .await
            .unwrap();

        let meta_path = storage.entry_dir("sundai-v6", &key("a.json")).join(ENTRY_META);
        fs::write(&meta_path, "invalid json content").await.unwrap();

        let result = storage.match_entry("sundai-v6", &key("a.json")).await;
        assert!(
            matches!(result, Err(CacheError::Storage { .. })),
            "Should return storage error for corrupt metadata: {:?}",
            result
        );

        // Unreadable entries are skipped when listing keys.
        assert!(storage.keys("sundai-v6").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_leaves_no_temp_files() {
        let (storage, _temp_dir) = create_test_storage();
        storage
            .put("sundai-v6", &key("a.json"), &AssetResponse::new(200, "{}"))
            .await
            .unwrap();

        let mut entries = fs::read_dir(storage.entry_dir("sundai-v6", &key("a.json")))
            .await
            .unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            assert!(
                !name_str.ends_with(".tmp"),
                "Temp file should not remain: {}",
                name_str
            );
        }
    }

    #[tokio::test]
    async fn test_stores_and_keys_listing() {
        let (storage, _temp_dir) = create_test_storage();
        storage.open("sundai-v5").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        storage
            .put_all(
                "sundai-v6",
                &[
                    (key("index.html"), AssetResponse::new(200, "shell")),
                    (key("a.json"), AssetResponse::new(200, "{}")),
                ],
            )
            .await
            .unwrap();

        // Stray directories without metadata are ignored
        fs::create_dir_all(storage.root().join("not-a-store"))
            .await
            .unwrap();

        let stores = storage.stores().await.unwrap();
        let names: Vec<_> = stores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sundai-v5", "sundai-v6"]);
        assert_eq!(stores[0].entries, 0);
        assert_eq!(stores[1].entries, 2);

        let keys = storage.keys("sundai-v6").await.unwrap();
        assert_eq!(keys, vec![key("a.json"), key("index.html")]);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let (storage, _temp_dir) = create_test_storage();
        storage.open("sundai-v6").await.unwrap();
        let first = storage.read_store_meta("sundai-v6").await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        storage.open("sundai-v6").await.unwrap();
        let second = storage.read_store_meta("sundai-v6").await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(storage.has_store("sundai-v6").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_store() {
        let (storage, _temp_dir) = create_test_storage();
        storage
            .put("sundai-v5", &key("a.json"), &AssetResponse::new(200, "{}"))
            .await
            .unwrap();

        assert!(storage.delete_store("sundai-v5").await.unwrap());
        assert!(!storage.has_store("sundai-v5").await.unwrap());
        assert!(!storage.delete_store("sundai-v5").await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_store_name_rejected() {
        let (storage, _temp_dir) = create_test_storage();
        let err = storage.open("../escape").await.unwrap_err();
        assert!(matches!(err, CacheError::Config { .. }));
    }
}
