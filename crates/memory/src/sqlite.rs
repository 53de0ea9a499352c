//! SQLite backend for both storage shapes.
//!
//! Uses a single SQLite database file with two tables:
//! - `kv_store`: JSON values by key with an optional expiry (working memory)
//! - `documents`: one JSON document per (collection, user) (durable tiers)
//!
//! Document upserts run inside a transaction so a push and its timestamp
//! land together or not at all.

use async_trait::async_trait;
use chrono::Utc;
use kabot_core::error::MemoryError;
use kabot_core::memory::{
    apply_updates, Document, DocumentStore, FieldUpdate, KeyValueStore, USER_ID_FIELD,
};
use kabot_core::message::UserKey;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// A production SQLite backend for the memory tiers.
#[derive(Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
}

impl SqliteBackend {
    /// Create a new SQLite backend from a file path.
    ///
    /// The database and all tables are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Every connection to ":memory:" opens its own database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let backend = Self { pool };
        backend.run_migrations().await?;
        info!("SQLite memory backend initialized at {path}");
        Ok(backend)
    }

    /// Create both tables if missing.
    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key         TEXT PRIMARY KEY NOT NULL,
                value       TEXT NOT NULL,
                expires_at  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("kv_store table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection  TEXT NOT NULL,
                user_id     TEXT NOT NULL,
                body        TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                PRIMARY KEY (collection, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("documents table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn parse_json(raw: &str, what: &str) -> Result<Value, MemoryError> {
        serde_json::from_str(raw)
            .map_err(|e| MemoryError::InvalidData(format!("{what} is not valid JSON: {e}")))
    }

    fn parse_document(raw: &str) -> Result<Document, MemoryError> {
        match Self::parse_json(raw, "document body")? {
            Value::Object(map) => Ok(map),
            other => Err(MemoryError::InvalidData(format!(
                "document body is not an object: {other}"
            ))),
        }
    }
}

#[async_trait]
impl KeyValueStore for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        let row = sqlx::query("SELECT value, expires_at FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("GET {key}: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let expires_at: Option<String> = row
            .try_get("expires_at")
            .map_err(|e| MemoryError::QueryFailed(format!("expires_at column: {e}")))?;

        if let Some(expires_at) = expires_at {
            let expired = chrono::DateTime::parse_from_rfc3339(&expires_at)
                .map(|at| at.with_timezone(&Utc) <= Utc::now())
                .unwrap_or(true);
            if expired {
                KeyValueStore::delete(self, key).await?;
                return Ok(None);
            }
        }

        let raw: String = row
            .try_get("value")
            .map_err(|e| MemoryError::QueryFailed(format!("value column: {e}")))?;
        Self::parse_json(&raw, "stored value").map(Some)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), MemoryError> {
        let raw = serde_json::to_string(&value)
            .map_err(|e| MemoryError::Storage(format!("Value serialization: {e}")))?;
        let expires_at = ttl
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|t| (Utc::now() + t).to_rfc3339());

        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, expires_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(&raw)
        .bind(&expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::Storage(format!("SET {key} failed: {e}")))?;

        debug!(key, "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE {key} failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DocumentStore for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn find_one(&self, collection: &str, user: &UserKey) -> Result<Option<Document>, MemoryError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND user_id = ?2")
            .bind(collection)
            .bind(user.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("find_one {collection}: {e}")))?;

        match row {
            Some(row) => {
                let body: String = row
                    .try_get("body")
                    .map_err(|e| MemoryError::QueryFailed(format!("body column: {e}")))?;
                Self::parse_document(&body).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn upsert(
        &self,
        collection: &str,
        user: &UserKey,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), MemoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("BEGIN failed: {e}")))?;

        let row = sqlx::query("SELECT body FROM documents WHERE collection = ?1 AND user_id = ?2")
            .bind(collection)
            .bind(user.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("upsert read {collection}: {e}")))?;

        let mut doc = match row {
            Some(row) => {
                let body: String = row
                    .try_get("body")
                    .map_err(|e| MemoryError::QueryFailed(format!("body column: {e}")))?;
                Self::parse_document(&body)?
            }
            None => {
                let mut fresh = Document::new();
                fresh.insert(USER_ID_FIELD.into(), Value::String(user.to_string()));
                fresh
            }
        };

        apply_updates(&mut doc, &updates)?;

        let body = serde_json::to_string(&doc)
            .map_err(|e| MemoryError::Storage(format!("Document serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, user_id, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, user_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(user.as_str())
        .bind(&body)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| MemoryError::Storage(format!("upsert write {collection}: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(collection, user = %user, "Upserted document");
        Ok(())
    }

    async fn delete(&self, collection: &str, user: &UserKey) -> Result<bool, MemoryError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND user_id = ?2")
            .bind(collection)
            .bind(user.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| MemoryError::Storage(format!("DELETE {collection} failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
