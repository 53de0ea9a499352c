//! Closure pipeline: end-of-conversation consolidation.
//!
//! Steps run strictly in order:
//!
//! 1. read working memory (an error is surfaced; empty means nothing to do)
//! 2. drop messages without content
//! 3. merge the summary and the facts (reads and gateway calls only)
//! 4. push the messages onto episodic history
//! 5. store the summary, then the facts
//! 6. delete working memory
//!
//! Every gateway call happens before the first write, so a merge failure
//! leaves all four tiers untouched and the closure can simply be retried.
//! Working memory is deleted last.

use kabot_core::error::Result;
use kabot_core::memory::MemoryTier;
use kabot_core::message::UserKey;
use kabot_memory::Stores;
use tracing::{debug, info};

use crate::merge::{FactMerger, SummaryMerger};

/// What a closure did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosureOutcome {
    /// Working memory was absent or empty.
    NothingToClose,
    /// Working memory held only empty messages and was cleared.
    Cleared,
    /// `messages` were consolidated into the durable tiers.
    Consolidated { messages: usize },
}

#[derive(Clone)]
pub struct ClosurePipeline {
    stores: Stores,
    facts: FactMerger,
    summary: SummaryMerger,
}

impl ClosurePipeline {
    pub fn new(stores: Stores, facts: FactMerger, summary: SummaryMerger) -> Self {
        Self {
            stores,
            facts,
            summary,
        }
    }

    pub async fn close(&self, user: &UserKey) -> Result<ClosureOutcome> {
        let working = self.stores.working.load(user).await?.unwrap_or_default();
        if working.is_empty() {
            debug!(user = %user, "No working memory to close");
            return Ok(ClosureOutcome::NothingToClose);
        }

        let messages: Vec<_> = working.into_iter().filter(|m| m.has_content()).collect();
        if messages.is_empty() {
            self.stores.working.delete(user).await?;
            return Ok(ClosureOutcome::Cleared);
        }

        let previous = self.stores.summary.load(user).await?;
        let summary = self.summary.merge(previous.as_deref(), &messages).await?;
        let old_facts = self.stores.facts.load(user).await?.unwrap_or_default();
        let facts = self.facts.merge(&old_facts, &messages).await?;
        debug!(user = %user, facts = facts.len(), "Merges ready");

        self.stores.episodic.store(user, messages.clone()).await?;
        debug!(user = %user, messages = messages.len(), "Flushed to episodic memory");
        self.stores.summary.store(user, summary).await?;
        self.stores.facts.store(user, facts).await?;
        debug!(user = %user, "Summary and facts updated");

        self.stores.working.delete(user).await?;
        info!(user = %user, messages = messages.len(), "Conversation closed");
        Ok(ClosureOutcome::Consolidated {
            messages: messages.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmGateway;
    use crate::test_helpers::SequentialMockProvider;
    use kabot_config::MemoryConfig;
    use kabot_core::error::Error;
    use kabot_core::message::Message;
    use std::sync::Arc;
    use std::time::Duration;

    fn pipeline(replies: &[&str]) -> (ClosurePipeline, Stores, Arc<SequentialMockProvider>) {
        let provider = Arc::new(SequentialMockProvider::replies(replies.iter().copied()));
        let gateway = LlmGateway::new(provider.clone(), "m");
        let stores = Stores::in_memory(&MemoryConfig::default(), Duration::from_secs(1));
        let pipeline = ClosurePipeline::new(
            stores.clone(),
            FactMerger::new(gateway.clone()),
            SummaryMerger::new(gateway),
        );
        (pipeline, stores, provider)
    }

    #[tokio::test]
    async fn empty_working_memory_is_a_no_op() {
        let (pipeline, stores, provider) = pipeline(&[]);
        let user = UserKey::from("u1");
        assert_eq!(pipeline.close(&user).await.unwrap(), ClosureOutcome::NothingToClose);
        assert!(stores.episodic.load(&user).await.unwrap().is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn closure_consolidates_and_clears() {
        let (pipeline, stores, provider) =
            pipeline(&["Ana busca un Jetta.", r#"{"nombre": "Ana"}"#]);
        let user = UserKey::from("u1");
        stores
            .working
            .store(
                &user,
                vec![
                    Message::user("Soy Ana, busco un Jetta"),
                    Message::assistant(""),
                    Message::assistant("¡Claro, Ana!"),
                ],
            )
            .await
            .unwrap();

        let outcome = pipeline.close(&user).await.unwrap();
        assert_eq!(outcome, ClosureOutcome::Consolidated { messages: 2 });

        let history = stores.episodic.load(&user).await.unwrap().unwrap();
        assert_eq!(
            history,
            vec![Message::user("Soy Ana, busco un Jetta"), Message::assistant("¡Claro, Ana!")]
        );
        assert_eq!(
            stores.summary.load(&user).await.unwrap().as_deref(),
            Some("Ana busca un Jetta.")
        );
        assert_eq!(stores.facts.load(&user).await.unwrap().unwrap()["nombre"], "Ana");
        assert!(stores.working.load(&user).await.unwrap().is_none());
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn only_empty_messages_skip_to_delete() {
        let (pipeline, stores, provider) = pipeline(&[]);
        let user = UserKey::from("u1");
        stores.working.store(&user, vec![Message::user("")]).await.unwrap();

        assert_eq!(pipeline.close(&user).await.unwrap(), ClosureOutcome::Cleared);
        assert!(stores.working.load(&user).await.unwrap().is_none());
        assert!(stores.episodic.load(&user).await.unwrap().is_none());
        assert!(stores.summary.load(&user).await.unwrap().is_none());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn fact_parse_failure_keeps_working_memory() {
        let (pipeline, stores, _) = pipeline(&["resumen", "no es json"]);
        let user = UserKey::from("u1");
        let dialogue = vec![Message::user("Soy Ana"), Message::assistant("Hola Ana")];
        stores.working.store(&user, dialogue.clone()).await.unwrap();

        let err = pipeline.close(&user).await.unwrap_err();
        assert!(matches!(err, Error::FactMergeParse { .. }));
        assert_eq!(stores.working.load(&user).await.unwrap().unwrap(), dialogue);
        assert!(stores.episodic.load(&user).await.unwrap().is_none());
        assert!(stores.summary.load(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gateway_failure_keeps_working_memory() {
        let (pipeline, stores, _) = pipeline(&[]);
        let user = UserKey::from("u1");
        stores.working.store(&user, vec![Message::user("Hola")]).await.unwrap();

        assert!(pipeline.close(&user).await.is_err());
        assert_eq!(stores.working.load(&user).await.unwrap().unwrap().len(), 1);
        assert!(stores.episodic.load(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retry_after_failed_merge_flushes_history_once() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Err(kabot_core::error::ProviderError::Network("reset".into())),
            Ok("Ana saluda.".into()),
            Ok(r#"{"nombre": "Ana"}"#.into()),
        ]));
        let gateway = LlmGateway::new(provider, "m");
        let stores = Stores::in_memory(&MemoryConfig::default(), Duration::from_secs(1));
        let pipeline = ClosurePipeline::new(
            stores.clone(),
            FactMerger::new(gateway.clone()),
            SummaryMerger::new(gateway),
        );
        let user = UserKey::from("u1");
        let dialogue = vec![Message::user("Soy Ana"), Message::assistant("Hola Ana")];
        stores.working.store(&user, dialogue.clone()).await.unwrap();

        assert!(pipeline.close(&user).await.is_err());
        assert_eq!(
            pipeline.close(&user).await.unwrap(),
            ClosureOutcome::Consolidated { messages: 2 }
        );
        assert_eq!(stores.episodic.load(&user).await.unwrap().unwrap(), dialogue);
    }
}
