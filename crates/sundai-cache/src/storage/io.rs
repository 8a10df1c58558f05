//! Filesystem helpers for the disk backend.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::{CacheError, CacheResult};

pub(crate) fn default_root_impl() -> CacheResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| CacheError::Storage {
            message: "could not determine cache directory".to_string(),
        })?;

    Ok(base.join("sundai").join("caches"))
}

/// Write via a temp file and rename, so readers never see partial content.
///
/// Each call writes its own temp file; concurrent writers of the same path
/// race only on the final rename.
pub(crate) async fn write_atomic_impl(path: &Path, content: &[u8]) -> CacheResult<()> {
    let temp_path = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

    fs::write(&temp_path, content)
        .await
        .map_err(|e| CacheError::storage("failed to write temp file", e))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(CacheError::storage("failed to rename temp file", e));
    }

    Ok(())
}

pub(crate) async fn exists_impl(path: &Path) -> CacheResult<bool> {
    fs::try_exists(path)
        .await
        .map_err(|e| CacheError::storage("failed to stat path", e))
}

/// Names of the subdirectories of `dir`. Empty when `dir` does not exist.
pub(crate) async fn list_dirs_impl(dir: &Path) -> CacheResult<Vec<String>> {
    let mut names = Vec::new();

    if !exists_impl(dir).await? {
        return Ok(names);
    }

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| CacheError::storage("failed to read directory", e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| CacheError::storage("failed to read directory entry", e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| CacheError::storage("failed to read file type", e))?
            .is_dir();
        if is_dir {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_concurrent_atomic_writes_to_same_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("body.bin");

        let writes = (0..8).map(|i| {
            let path = path.clone();
            async move { write_atomic_impl(&path, format!("body-{}", i).as_bytes()).await }
        });
        futures::future::try_join_all(writes).await.unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.starts_with("body-"), "unexpected content: {}", content);

        let mut entries = fs::read_dir(temp_dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["body.bin".to_string()]);
    }

    #[tokio::test]
    async fn test_list_dirs_of_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let names = list_dirs_impl(&temp_dir.path().join("missing")).await.unwrap();
        assert!(names.is_empty());
        assert!(!exists_impl(&temp_dir.path().join("missing")).await.unwrap());
    }
}
