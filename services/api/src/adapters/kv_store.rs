//! services/api/src/adapters/kv_store.rs
//!
//! The file-backed implementation of the `KeyValueStore` port. The whole store
//! is one JSON object (key -> raw string value) kept in memory and rewritten
//! on every change through a temp file and rename.

use async_trait::async_trait;
use learnhub_core::ports::{KeyValueStore, Mutation, PortError, PortResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| PortError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_error(&path, e)),
        };
        info!(path = %path.display(), keys = entries.len(), "opened key-value store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the full map. Callers hold the lock, so writes never interleave.
    async fn persist(&self, entries: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let encoded = serde_json::to_vec_pretty(entries)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, encoded)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        debug!(path = %self.path.display(), "store flushed");
        Ok(())
    }
}

fn io_error(path: &Path, e: std::io::Error) -> PortError {
    PortError::Unexpected(format!("{}: {}", path.display(), e))
}

//=========================================================================================
// `KeyValueStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(key.to_string(), value);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    async fn modify(&self, key: &str, mutation: Mutation) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        match mutation(next.get(key).cloned())? {
            Some(value) => next.insert(key.to_string(), value),
            None => next.remove(key),
        };
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnhub_core::records::Records;
    use std::sync::Arc;

    #[tokio::test]
    async fn values_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("enrollments", "[]".to_string()).await.unwrap();
        store.set("other", "1".to_string()).await.unwrap();
        store.remove("other").await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("enrollments").await.unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(reopened.get("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_mutation_does_not_touch_memory_or_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.set("key", "before".to_string()).await.unwrap();

        let result = store
            .modify(
                "key",
                Box::new(|_| Err(PortError::InvalidInput("rejected".to_string()))),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("before"));

        let on_disk = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(on_disk.contains("before"));
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(PortError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn typed_records_work_over_the_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::open(dir.path().join("s.json")).await.unwrap());
        let records = Records::new(store);
        records.push("numbers", 1u32).await.unwrap();
        records.push("numbers", 2u32).await.unwrap();
        let numbers: Vec<u32> = records.load("numbers").await.unwrap();
        assert_eq!(numbers, vec![1, 2]);
    }
}
