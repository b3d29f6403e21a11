//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::{accounts::AccountService, config::Config};
use learnhub_core::{
    learning::LearningService,
    ports::{AuthProvider, ChatAssistant, PortError, RemoteDatabase, Table},
    records::Records,
    scheduling::SessionService,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub records: Records,
    pub accounts: AccountService,
    pub learning: LearningService,
    pub sessions: SessionService,
    pub assistant: Arc<dyn ChatAssistant>,
    pub remote_db: Option<Arc<dyn RemoteDatabase>>,
}

impl AppState {
    /// Wires the services over one record store.
    pub fn new(
        config: Arc<Config>,
        records: Records,
        assistant: Arc<dyn ChatAssistant>,
        auth_provider: Option<Arc<dyn AuthProvider>>,
        remote_db: Option<Arc<dyn RemoteDatabase>>,
    ) -> Self {
        let learning = LearningService::new(records.clone());
        let sessions = SessionService::new(records.clone());
        let accounts = AccountService::new(
            records.clone(),
            learning.clone(),
            auth_provider,
            remote_db.clone(),
            config.session_ttl_days,
        );
        Self {
            config,
            records,
            accounts,
            learning,
            sessions,
            assistant,
            remote_db,
        }
    }

    /// Best-effort upsert of a row into the remote database, if one is configured.
    /// Local state stays authoritative, so failures are only logged.
    pub async fn mirror<T: Serialize>(&self, table: Table, id: Uuid, row: &T) {
        let Some(db) = &self.remote_db else {
            return;
        };
        let row = match serde_json::to_value(row) {
            Ok(row) => row,
            Err(e) => {
                warn!("Failed to encode {} row {}: {:?}", table.as_str(), id, e);
                return;
            }
        };
        let result = match db.update(table, id, row.clone()).await {
            Err(PortError::NotFound(_)) => db.insert(table, id, row).await,
            other => other,
        };
        if let Err(e) = result {
            warn!("Failed to mirror {} row {}: {:?}", table.as_str(), id, e);
        }
    }
}
