use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kabot_core::error::MemoryError;
use kabot_core::memory::{DocumentStore, FieldUpdate, MemoryTier, LAST_UPDATED_FIELD};
use kabot_core::message::{Message, UserKey};

use super::{bounded, decode_messages, encode_messages, timestamp};

const COLLECTION: &str = "episodic_memory";
const HISTORY_FIELD: &str = "history";

/// Durable, append-only conversation history.
#[derive(Clone)]
pub struct EpisodicMemory {
    backend: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl EpisodicMemory {
    pub fn new(backend: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

#[async_trait]
impl MemoryTier for EpisodicMemory {
    type Value = Vec<Message>;

    fn name(&self) -> &str {
        "episodic"
    }

    async fn load(&self, user: &UserKey) -> Result<Option<Vec<Message>>, MemoryError> {
        let doc = bounded(
            self.timeout,
            "episodic find",
            self.backend.find_one(COLLECTION, user),
        )
        .await?;

        match doc.and_then(|mut d| d.remove(HISTORY_FIELD)) {
            Some(history) => decode_messages(history, "episodic history").map(Some),
            None => Ok(None),
        }
    }

    /// Push `messages` onto the end of the history.
    async fn store(&self, user: &UserKey, messages: Vec<Message>) -> Result<(), MemoryError> {
        let updates = vec![
            FieldUpdate::push_each(HISTORY_FIELD, encode_messages(&messages)?),
            FieldUpdate::set(LAST_UPDATED_FIELD, timestamp()),
        ];
        bounded(
            self.timeout,
            "episodic upsert",
            self.backend.upsert(COLLECTION, user, updates),
        )
        .await
    }

    async fn delete(&self, user: &UserKey) -> Result<(), MemoryError> {
        bounded(
            self.timeout,
            "episodic delete",
            self.backend.delete(COLLECTION, user),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryBackend;
    use kabot_core::memory::USER_ID_FIELD;

    #[tokio::test]
    async fn push_preserves_order_across_closures() {
        let backend = Arc::new(InMemoryBackend::new());
        let tier = EpisodicMemory::new(backend.clone(), Duration::from_secs(1));
        let user = UserKey::from("u1");

        tier.store(&user, vec![Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();
        tier.store(&user, vec![Message::user("c")]).await.unwrap();

        let history = tier.load(&user).await.unwrap().unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b", "c"]);

        let doc = backend.find_one(COLLECTION, &user).await.unwrap().unwrap();
        assert_eq!(doc[USER_ID_FIELD], "u1");
        assert!(doc.contains_key(LAST_UPDATED_FIELD));
    }

    #[tokio::test]
    async fn missing_history_is_none() {
        let tier = EpisodicMemory::new(Arc::new(InMemoryBackend::new()), Duration::from_secs(1));
        assert!(tier.load(&UserKey::from("nobody")).await.unwrap().is_none());
    }
}
