//! Context assembler.
//!
//! Reads the Fact, Summary and Working tiers for one user and renders them
//! as text for the prompt builders. Reads never fail the turn: a tier that
//! errors is treated as empty and logged.
//!
//! # Seeding
//!
//! When the Working tier holds nothing yet, the assembler builds the seed a
//! new conversation starts from (see [`seed_messages`]) and renders the
//! history from it. Persisting the seed is left to the caller so a failed
//! turn writes nothing.

use kabot_core::memory::{FactSet, MemoryTier};
use kabot_core::message::{render_tagged, Message, UserKey};
use kabot_memory::{FactMemory, Stores, SummaryMemory, WorkingMemory};
use tracing::{debug, warn};

use crate::prompts::conversation::seed_messages;
use crate::prompts::render_facts;

/// The memory views for one turn.
#[derive(Debug, Clone, Default)]
pub struct AssembledContext {
    /// Durable facts as stored.
    pub facts: FactSet,
    /// Facts rendered as `name: value` pairs ("" when none).
    pub facts_text: String,
    /// The stored summary ("" when none).
    pub summary_text: String,
    /// Working-memory messages, or the seed when the tier was empty.
    pub working: Vec<Message>,
    /// `working` rendered as `<role>content</role>` lines.
    pub history_text: String,
    /// Seed messages still to be written; empty once working memory exists.
    pub seed: Vec<Message>,
}

/// Builds [`AssembledContext`]s. Cheap to clone.
#[derive(Clone)]
pub struct ContextAssembler {
    facts: FactMemory,
    summary: SummaryMemory,
    working: WorkingMemory,
}

impl ContextAssembler {
    pub fn new(stores: &Stores) -> Self {
        Self {
            facts: stores.facts.clone(),
            summary: stores.summary.clone(),
            working: stores.working.clone(),
        }
    }

    /// Assemble the memory views for `user`. Never fails.
    pub async fn assemble(&self, user: &UserKey) -> AssembledContext {
        let facts = read_or_empty(&self.facts, user).await;
        let summary_text = read_or_empty(&self.summary, user).await;
        let facts_text = render_facts(&facts);

        let (working, seed) = match self.working.load(user).await {
            Ok(Some(list)) => (list, Vec::new()),
            Ok(None) => {
                let seed = seed_messages(&facts_text, &summary_text);
                debug!(user = %user, seed = seed.len(), "Working memory empty, seeding");
                (seed.clone(), seed)
            }
            Err(e) => {
                // Treat as empty but do not seed: the key may still exist
                warn!(user = %user, error = %e, "Working memory unavailable, continuing without it");
                (Vec::new(), Vec::new())
            }
        };

        AssembledContext {
            history_text: render_tagged(&working),
            facts,
            facts_text,
            summary_text,
            working,
            seed,
        }
    }
}

async fn read_or_empty<T>(tier: &T, user: &UserKey) -> T::Value
where
    T: MemoryTier,
    T::Value: Default,
{
    match tier.load(user).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            warn!(user = %user, tier = tier.name(), error = %e, "Tier read failed, treating as empty");
            T::Value::default()
        }
    }
}
