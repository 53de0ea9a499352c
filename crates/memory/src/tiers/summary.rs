use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kabot_core::error::MemoryError;
use kabot_core::memory::{DocumentStore, FieldUpdate, MemoryTier, LAST_UPDATED_FIELD};
use kabot_core::message::UserKey;
use serde_json::Value;

use super::{bounded, string_field, timestamp};

const COLLECTION: &str = "summary_memory";
const SUMMARY_FIELD: &str = "summary";

/// The compressed TL;DR of every closed conversation.
#[derive(Clone)]
pub struct SummaryMemory {
    backend: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl SummaryMemory {
    pub fn new(backend: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

#[async_trait]
impl MemoryTier for SummaryMemory {
    type Value = String;

    fn name(&self) -> &str {
        "summary"
    }

    async fn load(&self, user: &UserKey) -> Result<Option<String>, MemoryError> {
        let doc = bounded(
            self.timeout,
            "summary find",
            self.backend.find_one(COLLECTION, user),
        )
        .await?;
        Ok(doc.and_then(|d| string_field(&d, SUMMARY_FIELD)))
    }

    async fn store(&self, user: &UserKey, summary: String) -> Result<(), MemoryError> {
        let updates = vec![
            FieldUpdate::set(SUMMARY_FIELD, Value::String(summary)),
            FieldUpdate::set(LAST_UPDATED_FIELD, timestamp()),
        ];
        bounded(
            self.timeout,
            "summary upsert",
            self.backend.upsert(COLLECTION, user, updates),
        )
        .await
    }

    async fn delete(&self, user: &UserKey) -> Result<(), MemoryError> {
        bounded(
            self.timeout,
            "summary delete",
            self.backend.delete(COLLECTION, user),
        )
        .await?;
        Ok(())
    }
}
