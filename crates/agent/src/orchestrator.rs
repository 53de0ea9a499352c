//! The conversation orchestrator.
//!
//! One turn:
//!
//! 1. **Lock** the user's key (turns and closures never interleave per user)
//! 2. **Assemble** facts, summary and working history
//! 3. **Classify** the message
//! 4. **Route** to the intent's handler
//! 5. **Append** the seed (first turn only) and the handler's messages to
//!    working memory
//! 6. **Close** the conversation if the intent was `exit`
//!
//! Nothing is written until step 5, so a turn that fails earlier leaves
//! memory exactly as it found it. A failed closure in step 6 does not fail
//! the turn: the farewell is returned and working memory stays for a later
//! [`Orchestrator::close`].

use std::path::Path;
use std::sync::Arc;

use kabot_config::{AppConfig, OrchestratorConfig};
use kabot_core::collaborator::VehicleSearch;
use kabot_core::error::{ProviderError, Result};
use kabot_core::memory::MemoryTier;
use kabot_core::message::{Message, UserKey};
use kabot_memory::Stores;
use tracing::{debug, error, info, warn};

use crate::classifier::IntentClassifier;
use crate::closure::{ClosureOutcome, ClosurePipeline};
use crate::collaborators::{CatalogSearch, Collaborators};
use crate::context::ContextAssembler;
use crate::llm::LlmGateway;
use crate::locks::KeyedLocks;
use crate::merge::{FactMerger, SummaryMerger};
use crate::router::IntentRouter;

pub struct Orchestrator {
    stores: Stores,
    assembler: ContextAssembler,
    classifier: IntentClassifier,
    router: IntentRouter,
    closure: ClosurePipeline,
    locks: KeyedLocks,
    error_reply: String,
}

impl Orchestrator {
    /// Wire an orchestrator from already-built parts.
    pub fn new(
        gateway: LlmGateway,
        stores: Stores,
        collaborators: Collaborators,
        config: &OrchestratorConfig,
    ) -> Self {
        Self {
            assembler: ContextAssembler::new(&stores),
            classifier: IntentClassifier::new(gateway.clone()),
            router: IntentRouter::new(
                gateway.clone(),
                collaborators,
                stores.episodic.clone(),
                config.search_k,
                config.collaborator_timeout(),
            ),
            closure: ClosurePipeline::new(
                stores.clone(),
                FactMerger::new(gateway.clone()),
                SummaryMerger::new(gateway),
            ),
            stores,
            locks: KeyedLocks::new(),
            error_reply: config.error_reply.clone(),
        }
    }

    /// Build everything from configuration: provider, stores, catalog and
    /// the prompt-backed collaborators.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let providers = kabot_providers::router::build_from_config(config);
        let provider = providers.default().ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "default provider '{}' is not registered",
                config.default_provider
            ))
        })?;
        let gateway = LlmGateway::from_config(provider, config);

        let stores = Stores::from_config(&config.memory, config.orchestrator.store_timeout()).await?;

        let search: Arc<dyn VehicleSearch> = match &config.search.catalog_path {
            Some(path) => Arc::new(CatalogSearch::from_path(Path::new(path)).await?),
            None => {
                warn!("No vehicle catalog configured; searches will find nothing");
                Arc::new(CatalogSearch::empty())
            }
        };

        info!(
            provider = gateway.provider_name(),
            model = gateway.model(),
            memory = %config.memory.backend,
            "Orchestrator ready"
        );
        Ok(Self::new(
            gateway.clone(),
            stores,
            Collaborators::prompt_backed(gateway, search),
            &config.orchestrator,
        ))
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Handle one incoming message and return the reply.
    pub async fn handle_message(&self, user: &UserKey, input: &str) -> Result<String> {
        let _guard = self.locks.acquire(user).await;
        debug!(user = %user, "Handling message");

        let ctx = self.assembler.assemble(user).await;
        let classification = self.classifier.classify(&ctx, input).await?;
        let intent = classification.intent.kind();
        let outcome = self.router.route(user, input, classification.intent, &ctx).await?;

        if !outcome.append.is_empty() {
            let mut append = ctx.seed;
            append.extend(outcome.append);
            self.stores.working.store(user, append).await?;
        }

        // The farewell is already stored, so the turn stands; `close` retries
        if outcome.closes {
            if let Err(e) = self.closure.close(user).await {
                error!(
                    user = %user,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Closure after farewell failed; working memory kept"
                );
            }
        }

        info!(user = %user, %intent, "Turn complete");
        Ok(outcome.reply)
    }

    /// Like [`handle_message`](Self::handle_message), but a failed turn
    /// yields the configured apology instead of an error.
    pub async fn reply(&self, user: &UserKey, input: &str) -> String {
        match self.handle_message(user, input).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user = %user, error = %e, retryable = e.is_retryable(), "Turn failed");
                self.error_reply.clone()
            }
        }
    }

    /// Open a conversation: seed working memory from facts and summary if
    /// it is empty, and return what it now holds.
    pub async fn start_conversation(&self, user: &UserKey) -> Result<Vec<Message>> {
        let _guard = self.locks.acquire(user).await;
        if let Some(existing) = self.stores.working.load(user).await? {
            return Ok(existing);
        }

        let ctx = self.assembler.assemble(user).await;
        if !ctx.seed.is_empty() {
            self.stores.working.replace(user, &ctx.seed).await?;
            info!(user = %user, messages = ctx.seed.len(), "Conversation started with memory");
        }
        Ok(ctx.seed)
    }

    /// The user's full episodic history.
    pub async fn expand_context(&self, user: &UserKey) -> Result<Vec<Message>> {
        Ok(self.stores.episodic.load(user).await?.unwrap_or_default())
    }

    /// Run the closure pipeline for `user`.
    pub async fn close(&self, user: &UserKey) -> Result<ClosureOutcome> {
        let _guard = self.locks.acquire(user).await;
        self.closure.close(user).await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_vehicles, SequentialMockProvider};
    use kabot_config::MemoryConfig;
    use kabot_core::memory::FactSet;
    use std::time::Duration;

    fn orchestrator(replies: &[&str]) -> (Orchestrator, Arc<SequentialMockProvider>) {
        let provider = Arc::new(SequentialMockProvider::replies(replies.iter().copied()));
        let gateway = LlmGateway::new(provider.clone(), "m");
        let stores = Stores::in_memory(&MemoryConfig::default(), Duration::from_secs(1));
        let collaborators =
            Collaborators::prompt_backed(gateway.clone(), Arc::new(CatalogSearch::new(sample_vehicles())));
        (
            Orchestrator::new(gateway, stores, collaborators, &OrchestratorConfig::default()),
            provider,
        )
    }

    #[tokio::test]
    async fn first_turn_on_fresh_user() {
        let (orch, provider) =
            orchestrator(&[r#"{"intention":"none","response":"¡Hola! ¿En qué te ayudo?"}"#]);
        let user = UserKey::from("u1");

        let reply = orch.handle_message(&user, "Hola").await.unwrap();
        assert_eq!(reply, "¡Hola! ¿En qué te ayudo?");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            orch.stores().working.load(&user).await.unwrap().unwrap(),
            vec![Message::user("Hola"), Message::assistant("¡Hola! ¿En qué te ayudo?")]
        );
    }

    #[tokio::test]
    async fn seed_is_written_with_first_turn() {
        let (orch, _) = orchestrator(&[r#"{"intention":"none","response":"¡Hola de nuevo, Ana!"}"#]);
        let user = UserKey::from("u1");
        let mut facts = FactSet::new();
        facts.insert("nombre".into(), "Ana".into());
        orch.stores().facts.store(&user, facts).await.unwrap();

        orch.handle_message(&user, "Hola").await.unwrap();
        let working = orch.stores().working.load(&user).await.unwrap().unwrap();
        assert_eq!(working.len(), 4);
        assert!(working[1].content.contains("nombre: Ana"));
        assert_eq!(working[3], Message::assistant("¡Hola de nuevo, Ana!"));
    }

    #[tokio::test]
    async fn failed_turn_writes_nothing_and_replies_with_apology() {
        let (orch, _) = orchestrator(&[]);
        let user = UserKey::from("u1");

        let reply = orch.reply(&user, "Hola").await;
        assert_eq!(reply, OrchestratorConfig::default().error_reply);
        assert!(orch.stores().working.load(&user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_conversation_seeds_once() {
        let (orch, _) = orchestrator(&[]);
        let user = UserKey::from("u1");
        assert!(orch.start_conversation(&user).await.unwrap().is_empty());

        orch.stores().summary.store(&user, "Busca un SUV.".into()).await.unwrap();
        let seeded = orch.start_conversation(&user).await.unwrap();
        assert_eq!(seeded.len(), 2);
        assert_eq!(orch.start_conversation(&user).await.unwrap(), seeded);
    }

    #[tokio::test]
    async fn expand_context_returns_episodic_history() {
        let (orch, _) = orchestrator(&[]);
        let user = UserKey::from("u1");
        assert!(orch.expand_context(&user).await.unwrap().is_empty());
        orch.stores()
            .episodic
            .store(&user, vec![Message::user("a")])
            .await
            .unwrap();
        assert_eq!(orch.expand_context(&user).await.unwrap().len(), 1);
    }
}
