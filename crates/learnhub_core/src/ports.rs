//! crates/learnhub_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete key-value store, auth provider or database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{Role, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., file system, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Local Persisted Store
//=========================================================================================

/// Read-modify-write step passed to [`KeyValueStore::modify`].
///
/// Receives the current raw value (if any) and returns the value to store,
/// `None` removing the key.
pub type Mutation = Box<dyn FnOnce(Option<String>) -> PortResult<Option<String>> + Send>;

/// A string-keyed store of string values, the server-side stand-in for browser local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> PortResult<()>;

    async fn remove(&self, key: &str) -> PortResult<()>;

    /// Applies `mutation` to the value under `key` while no other writer can interleave.
    async fn modify(&self, key: &str, mutation: Mutation) -> PortResult<()>;
}

//=========================================================================================
// External Auth Provider
//=========================================================================================

/// A session opened against the external auth provider.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub role: Role,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<ProviderSession>;

    async fn sign_up(&self, request: &SignUpRequest) -> PortResult<ProviderSession>;

    /// Resolves the user behind an access token. `Unauthorized` when it has expired.
    async fn get_user(&self, access_token: &str) -> PortResult<User>;

    async fn sign_out(&self, access_token: &str) -> PortResult<()>;
}

//=========================================================================================
// External Row Database
//=========================================================================================

/// The tables exposed by the external database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Users,
    Sessions,
    Messages,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Sessions => "sessions",
            Table::Messages => "messages",
        }
    }
}

/// Generic row CRUD. Rows are JSON documents keyed by id.
#[async_trait]
pub trait RemoteDatabase: Send + Sync {
    async fn insert(&self, table: Table, id: Uuid, row: Value) -> PortResult<()>;

    async fn get(&self, table: Table, id: Uuid) -> PortResult<Value>;

    /// Rows whose top-level `field` equals `value`.
    async fn list(&self, table: Table, field: &str, value: &Value) -> PortResult<Vec<Value>>;

    /// Replaces an existing row. `NotFound` when the id is absent.
    async fn update(&self, table: Table, id: Uuid, row: Value) -> PortResult<()>;

    async fn delete(&self, table: Table, id: Uuid) -> PortResult<()>;
}

//=========================================================================================
// Chat Assistant
//=========================================================================================

#[async_trait]
pub trait ChatAssistant: Send + Sync {
    /// Produces the assistant's answer to one user message.
    async fn reply(&self, message: &str) -> PortResult<String>;
}
