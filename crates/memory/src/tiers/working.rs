use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kabot_core::error::MemoryError;
use kabot_core::memory::{KeyValueStore, MemoryTier};
use kabot_core::message::{Message, UserKey};
use serde_json::Value;
use tracing::debug;

use super::{bounded, decode_messages, encode_messages};

/// Ephemeral per-conversation message list, stored as a JSON array under
/// `"{namespace}:{user}"`.
///
/// `store` appends; the list only shrinks when closure deletes it.
#[derive(Clone)]
pub struct WorkingMemory {
    backend: Arc<dyn KeyValueStore>,
    namespace: String,
    ttl: Option<Duration>,
    timeout: Duration,
}

impl WorkingMemory {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        namespace: impl Into<String>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            namespace: namespace.into(),
            ttl,
            timeout,
        }
    }

    /// The backend key for `user`.
    pub fn key(&self, user: &UserKey) -> String {
        format!("{}:{}", self.namespace, user)
    }

    /// Overwrite the whole list.
    pub async fn replace(&self, user: &UserKey, messages: &[Message]) -> Result<(), MemoryError> {
        let key = self.key(user);
        let value = Value::Array(encode_messages(messages)?);
        bounded(self.timeout, "working set", self.backend.set(&key, value, self.ttl)).await
    }
}

#[async_trait]
impl MemoryTier for WorkingMemory {
    type Value = Vec<Message>;

    fn name(&self) -> &str {
        "working"
    }

    async fn load(&self, user: &UserKey) -> Result<Option<Vec<Message>>, MemoryError> {
        let key = self.key(user);
        let value = bounded(self.timeout, "working get", self.backend.get(&key)).await?;
        value
            .map(|v| decode_messages(v, "working memory"))
            .transpose()
    }

    async fn store(&self, user: &UserKey, messages: Vec<Message>) -> Result<(), MemoryError> {
        let mut current = self.load(user).await?.unwrap_or_default();
        current.extend(messages);
        debug!(user = %user, len = current.len(), "Appending to working memory");
        self.replace(user, &current).await
    }

    async fn delete(&self, user: &UserKey) -> Result<(), MemoryError> {
        let key = self.key(user);
        bounded(self.timeout, "working delete", self.backend.delete(&key)).await?;
        Ok(())
    }
}
