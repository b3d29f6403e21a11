//! crates/learnhub_core/src/records.rs
//!
//! Typed access to the JSON documents kept in a `KeyValueStore`.
//! Each feature owns one named blob; a missing blob reads as its default value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::ports::{KeyValueStore, PortError, PortResult};

/// Storage keys used across the application.
pub mod keys {
    use super::Uuid;

    pub const ENROLLMENTS: &str = "enrollments";
    pub const CERTIFICATES: &str = "certificates";
    pub const SESSIONS: &str = "video_sessions";
    pub const ASSIGNMENT_SUBMISSIONS: &str = "assignment_submissions";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const REGISTERED_USERS: &str = "registered_users";
    pub const AUTH_SESSIONS: &str = "auth_sessions";

    /// Per-user, per-course map of lesson id -> completed.
    pub fn course_progress(course_id: &str, user_id: Uuid) -> String {
        format!("course_progress_{course_id}_{user_id}")
    }
}

#[derive(Clone)]
pub struct Records {
    store: Arc<dyn KeyValueStore>,
}

impl Records {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Reads the document under `key`, or `T::default()` when nothing is stored.
    pub async fn load<T>(&self, key: &str) -> PortResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let raw = self.store.get(key).await?;
        decode(key, raw)
    }

    pub async fn save<T: Serialize>(&self, key: &str, value: &T) -> PortResult<()> {
        self.store.set(key, encode(key, value)?).await
    }

    /// Appends to the list under `key`. No uniqueness check is made.
    pub async fn push<T>(&self, key: &str, item: T) -> PortResult<()>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.update(key, move |items: &mut Vec<T>| {
            items.push(item);
            Ok(())
        })
        .await
    }

    /// Atomic read-modify-write of the document under `key`.
    ///
    /// `f` runs while the store is locked; when it fails, nothing is written.
    pub async fn update<T, R, F>(&self, key: &str, f: F) -> PortResult<R>
    where
        T: Serialize + DeserializeOwned + Default + 'static,
        R: Send + 'static,
        F: FnOnce(&mut T) -> PortResult<R> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let owned_key = key.to_string();
        self.store
            .modify(
                key,
                Box::new(move |raw| {
                    let mut value: T = decode(&owned_key, raw)?;
                    let outcome = f(&mut value)?;
                    let encoded = encode(&owned_key, &value)?;
                    let _ = tx.send(outcome);
                    Ok(Some(encoded))
                }),
            )
            .await?;
        rx.await
            .map_err(|_| PortError::Unexpected(format!("update of '{key}' produced no result")))
    }
}

fn decode<T>(key: &str, raw: Option<String>) -> PortResult<T>
where
    T: DeserializeOwned + Default,
{
    match raw {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(&raw).map_err(|e| PortError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
        }
        _ => Ok(T::default()),
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> PortResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PortError::Unexpected(format!("failed to encode '{key}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn missing_key_reads_as_empty_list() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        let items: Vec<u32> = records.load("nothing").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_is_reported_not_panicked() {
        let records = Records::new(Arc::new(MemoryStore::with_entries([(
            "enrollments",
            "{not json",
        )])));
        let result: PortResult<Vec<u32>> = records.load("enrollments").await;
        match result {
            Err(PortError::Corrupt { key, .. }) => assert_eq!(key, "enrollments"),
            other => panic!("expected corrupt error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn push_appends_without_deduplicating() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        records.push("list", 7u32).await.unwrap();
        records.push("list", 7u32).await.unwrap();
        let items: Vec<u32> = records.load("list").await.unwrap();
        assert_eq!(items, vec![7, 7]);
    }

    #[tokio::test]
    async fn update_returns_closure_result() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        let len = records
            .update("list", |items: &mut Vec<u32>| {
                items.extend([1, 2, 3]);
                Ok(items.len())
            })
            .await
            .unwrap();
        assert_eq!(len, 3);
    }

    #[tokio::test]
    async fn concurrent_updates_are_not_lost() {
        let records = Records::new(Arc::new(MemoryStore::new()));
        let mut handles = Vec::new();
        for i in 0..20u32 {
            let records = records.clone();
            handles.push(tokio::spawn(async move {
                records.push("list", i).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let items: Vec<u32> = records.load("list").await.unwrap();
        assert_eq!(items.len(), 20);
    }
}
