//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! `RemoteDatabase` port from the `core` crate. Each table stores JSON documents
//! keyed by id in PostgreSQL, accessed through `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learnhub_core::ports::{PortError, PortResult, RemoteDatabase, Table};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `RemoteDatabase` port.
#[derive(Clone)]
pub struct PgRowStore {
    pool: PgPool,
}

impl PgRowStore {
    /// Creates a new `PgRowStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct RowRecord {
    #[allow(dead_code)]
    id: Uuid,
    data: Json<Value>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}
impl RowRecord {
    fn to_domain(self) -> Value {
        self.data.0
    }
}

fn query_error(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

// Table names come from the closed `Table` enum, never from user input.
fn select_sql(table: Table, filter: &str) -> String {
    format!(
        "SELECT id, data, updated_at FROM {} WHERE {}",
        table.as_str(),
        filter
    )
}

//=========================================================================================
// `RemoteDatabase` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteDatabase for PgRowStore {
    async fn insert(&self, table: Table, id: Uuid, row: Value) -> PortResult<()> {
        let sql = format!("INSERT INTO {} (id, data) VALUES ($1, $2)", table.as_str());
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(row))
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    PortError::Conflict(format!("{} row {} already exists", table.as_str(), id))
                }
                other => query_error(other),
            })?;
        Ok(())
    }

    async fn get(&self, table: Table, id: Uuid) -> PortResult<Value> {
        let record = sqlx::query_as::<_, RowRecord>(&select_sql(table, "id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("{} row {} not found", table.as_str(), id))
                }
                other => query_error(other),
            })?;
        Ok(record.to_domain())
    }

    async fn list(&self, table: Table, field: &str, value: &Value) -> PortResult<Vec<Value>> {
        let records = sqlx::query_as::<_, RowRecord>(&select_sql(
            table,
            "data -> ($1::text) = $2 ORDER BY created_at ASC",
        ))
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await
        .map_err(query_error)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn update(&self, table: Table, id: Uuid, row: Value) -> PortResult<()> {
        let sql = format!(
            "UPDATE {} SET data = $2, updated_at = now() WHERE id = $1",
            table.as_str()
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Json(row))
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "{} row {} not found",
                table.as_str(),
                id
            )));
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: Uuid) -> PortResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", table.as_str());
        sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sql_targets_the_enum_table() {
        assert_eq!(
            select_sql(Table::Messages, "id = $1"),
            "SELECT id, data, updated_at FROM messages WHERE id = $1"
        );
    }
}
