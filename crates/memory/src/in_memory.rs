//! In-memory backend: useful for testing and ephemeral sessions.
//!
//! Implements both storage shapes: the key-value store behind working memory
//! and the document store behind the durable tiers.

use async_trait::async_trait;
use kabot_core::error::MemoryError;
use kabot_core::memory::{
    apply_updates, Document, DocumentStore, FieldUpdate, KeyValueStore, USER_ID_FIELD,
};
use kabot_core::message::UserKey;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct KvEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl KvEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// An in-memory backend that keeps everything in hash maps.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    values: Arc<RwLock<HashMap<String, KvEntry>>>,
    documents: Arc<RwLock<HashMap<(String, UserKey), Document>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in `collection`.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        let now = Instant::now();
        {
            let values = self.values.read().await;
            match values.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        // Expired: evict lazily
        self.values.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), MemoryError> {
        let expires_at = ttl.map(|t| Instant::now() + t);
        self.values
            .write()
            .await
            .insert(key.to_string(), KvEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, MemoryError> {
        Ok(self.values.write().await.remove(key).is_some())
    }
}

#[async_trait]
impl DocumentStore for InMemoryBackend {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn find_one(&self, collection: &str, user: &UserKey) -> Result<Option<Document>, MemoryError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&(collection.to_string(), user.clone())).cloned())
    }

    async fn upsert(
        &self,
        collection: &str,
        user: &UserKey,
        updates: Vec<FieldUpdate>,
    ) -> Result<(), MemoryError> {
        let mut documents = self.documents.write().await;
        let slot = (collection.to_string(), user.clone());

        // Apply to a copy so a rejected update leaves the stored document untouched
        let mut doc = documents.get(&slot).cloned().unwrap_or_else(|| {
            let mut fresh = Document::new();
            fresh.insert(USER_ID_FIELD.into(), Value::String(user.to_string()));
            fresh
        });
        apply_updates(&mut doc, &updates)?;
        documents.insert(slot, doc);
        Ok(())
    }

    async fn delete(&self, collection: &str, user: &UserKey) -> Result<bool, MemoryError> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&(collection.to_string(), user.clone())).is_some())
    }
}
