//! Intent router: one handler per intent.
//!
//! Handlers never write memory themselves. Each returns a [`TurnOutcome`]
//! describing the reply and what to append, and the orchestrator applies it
//! once the whole turn has succeeded.
//!
//! | Intent | Handler | Appends |
//! |--------|---------|---------|
//! | none | classifier reply | user, assistant |
//! | search | search + summary call | user, assistant, `<search_results>` system |
//! | financing | financing collaborator | user, assistant |
//! | kavak_info | Kavak-info collaborator | user, assistant |
//! | episodic_memory | full-history recall | nothing |
//! | exit | farewell collaborator, then closure | user, assistant |

use std::time::Duration;

use kabot_core::collaborator::CollaboratorExtras;
use kabot_core::error::Result;
use kabot_core::intent::Intent;
use kabot_core::memory::MemoryTier;
use kabot_core::message::{render_tagged, Message, UserKey};
use kabot_memory::EpisodicMemory;
use tracing::{debug, info};

use crate::classifier::parse_intent;
use crate::collaborators::{bounded, Collaborators};
use crate::context::AssembledContext;
use crate::llm::LlmGateway;
use crate::prompts::collaborators::search_summary_messages;
use crate::prompts::conversation::episodic_messages;

/// What a handled turn produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text for the user.
    pub reply: String,
    /// Messages to append to working memory, in order.
    pub append: Vec<Message>,
    /// Whether the conversation closes after this turn.
    pub closes: bool,
}

impl TurnOutcome {
    fn dialogue(input: &str, reply: String) -> Self {
        Self {
            append: vec![Message::user(input), Message::assistant(reply.clone())],
            reply,
            closes: false,
        }
    }
}

#[derive(Clone)]
pub struct IntentRouter {
    gateway: LlmGateway,
    collaborators: Collaborators,
    episodic: EpisodicMemory,
    search_k: usize,
    collaborator_timeout: Duration,
}

impl IntentRouter {
    pub fn new(
        gateway: LlmGateway,
        collaborators: Collaborators,
        episodic: EpisodicMemory,
        search_k: usize,
        collaborator_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            collaborators,
            episodic,
            search_k,
            collaborator_timeout,
        }
    }

    /// Dispatch one classified turn.
    pub async fn route(
        &self,
        user: &UserKey,
        input: &str,
        intent: Intent,
        ctx: &AssembledContext,
    ) -> Result<TurnOutcome> {
        debug!(user = %user, intent = %intent.kind(), "Routing turn");
        match intent {
            Intent::None { reply } => Ok(TurnOutcome::dialogue(input, reply)),
            Intent::Search => self.search(input).await,
            Intent::Financing { vehicle } => {
                let extras = CollaboratorExtras {
                    vehicle: Some(vehicle.unwrap_or_default()),
                    ..Default::default()
                };
                let collaborator = &self.collaborators.financing;
                let reply = bounded(
                    collaborator.name(),
                    self.collaborator_timeout,
                    collaborator.respond(input, &extras),
                )
                .await?;
                Ok(TurnOutcome::dialogue(input, reply))
            }
            Intent::KavakInfo => {
                let collaborator = &self.collaborators.kavak_info;
                let reply = bounded(
                    collaborator.name(),
                    self.collaborator_timeout,
                    collaborator.respond(input, &CollaboratorExtras::default()),
                )
                .await?;
                Ok(TurnOutcome::dialogue(input, reply))
            }
            Intent::EpisodicMemory => self.recall(user, input, ctx).await,
            Intent::Exit => {
                let extras = CollaboratorExtras {
                    vehicle: None,
                    working_memory: ctx.history_text.clone(),
                    facts: ctx.facts_text.clone(),
                    summary: ctx.summary_text.clone(),
                };
                let collaborator = &self.collaborators.farewell;
                let reply = bounded(
                    collaborator.name(),
                    self.collaborator_timeout,
                    collaborator.respond(input, &extras),
                )
                .await?;
                info!(user = %user, "Conversation ending");
                Ok(TurnOutcome {
                    closes: true,
                    ..TurnOutcome::dialogue(input, reply)
                })
            }
        }
    }

    async fn search(&self, input: &str) -> Result<TurnOutcome> {
        let search = &self.collaborators.search;
        let vehicles = bounded(
            search.name(),
            self.collaborator_timeout,
            search.search(input, self.search_k),
        )
        .await?;
        debug!(hits = vehicles.len(), "Search returned");

        let summary = self
            .gateway
            .generate(search_summary_messages(input, &vehicles))
            .await?;
        let results = serde_json::to_string(&vehicles)?;

        Ok(TurnOutcome {
            append: vec![
                Message::user(input),
                Message::assistant(summary.clone()),
                Message::system(format!("<search_results>{results}</search_results>")),
            ],
            reply: summary,
            closes: false,
        })
    }

    /// Answer from the full episodic history. Nothing is appended.
    async fn recall(&self, user: &UserKey, input: &str, ctx: &AssembledContext) -> Result<TurnOutcome> {
        let history = self.episodic.load(user).await?.unwrap_or_default();
        debug!(user = %user, messages = history.len(), "Recalling episodic history");

        let messages = episodic_messages(
            &ctx.facts_text,
            &ctx.summary_text,
            &render_tagged(&history),
            input,
        );
        let raw = self.gateway.generate(messages).await?;

        // The reissued instruction asks for JSON; unwrap a `none` reply
        let reply = match parse_intent(&raw) {
            Ok(Intent::None { reply }) => reply,
            _ => raw,
        };

        Ok(TurnOutcome {
            reply,
            append: Vec::new(),
            closes: false,
        })
    }
}
