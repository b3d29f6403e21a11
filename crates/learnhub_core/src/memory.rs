//! crates/learnhub_core/src/memory.rs
//!
//! An in-process `KeyValueStore`. Used by tests and by ephemeral deployments
//! that do not need anything to survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::ports::{KeyValueStore, Mutation, PortResult};

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with raw values, e.g. legacy records.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> PortResult<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn modify(&self, key: &str, mutation: Mutation) -> PortResult<()> {
        let mut entries = self.entries.lock().await;
        let current = entries.get(key).cloned();
        match mutation(current)? {
            Some(next) => entries.insert(key.to_string(), next),
            None => entries.remove(key),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PortError;

    #[tokio::test]
    async fn modify_sees_current_value_and_replaces_it() {
        let store = MemoryStore::with_entries([("counter", "1")]);
        store
            .modify(
                "counter",
                Box::new(|current| {
                    let n: u32 = current.as_deref().unwrap_or("0").parse().unwrap();
                    Ok(Some((n + 1).to_string()))
                }),
            )
            .await
            .unwrap();
        assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn failed_modify_leaves_value_untouched() {
        let store = MemoryStore::with_entries([("key", "before")]);
        let result = store
            .modify(
                "key",
                Box::new(|_| Err(PortError::Conflict("nope".to_string()))),
            )
            .await;
        assert!(matches!(result, Err(PortError::Conflict(_))));
        assert_eq!(store.get("key").await.unwrap().as_deref(), Some("before"));
    }

    #[tokio::test]
    async fn modify_returning_none_removes_key() {
        let store = MemoryStore::with_entries([("key", "value")]);
        store.modify("key", Box::new(|_| Ok(None))).await.unwrap();
        assert_eq!(store.get("key").await.unwrap(), None);
    }
}
