use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kabot_core::error::MemoryError;
use kabot_core::memory::{DocumentStore, FactSet, FieldUpdate, MemoryTier, LAST_UPDATED_FIELD};
use kabot_core::message::UserKey;
use serde_json::Value;

use super::{bounded, timestamp};

const COLLECTION: &str = "fact_memory";
const FACTS_FIELD: &str = "facts";

/// Long-term user facts. `store` replaces the whole set; merging happens
/// before the write.
#[derive(Clone)]
pub struct FactMemory {
    backend: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl FactMemory {
    pub fn new(backend: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

fn decode_facts(value: Value) -> Result<FactSet, MemoryError> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(MemoryError::InvalidData(format!(
                "facts field is not an object: {other}"
            )));
        }
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect())
}

#[async_trait]
impl MemoryTier for FactMemory {
    type Value = FactSet;

    fn name(&self) -> &str {
        "fact"
    }

    async fn load(&self, user: &UserKey) -> Result<Option<FactSet>, MemoryError> {
        let doc = bounded(
            self.timeout,
            "fact find",
            self.backend.find_one(COLLECTION, user),
        )
        .await?;

        doc.and_then(|mut d| d.remove(FACTS_FIELD))
            .map(decode_facts)
            .transpose()
    }

    async fn store(&self, user: &UserKey, facts: FactSet) -> Result<(), MemoryError> {
        let facts = facts
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<serde_json::Map<_, _>>();
        let updates = vec![
            FieldUpdate::set(FACTS_FIELD, Value::Object(facts)),
            FieldUpdate::set(LAST_UPDATED_FIELD, timestamp()),
        ];
        bounded(
            self.timeout,
            "fact upsert",
            self.backend.upsert(COLLECTION, user, updates),
        )
        .await
    }

    async fn delete(&self, user: &UserKey) -> Result<(), MemoryError> {
        bounded(self.timeout, "fact delete", self.backend.delete(COLLECTION, user)).await?;
        Ok(())
    }
}
