//! Fact and summary merges.
//!
//! The gateway does the actual merging; this module enforces the parts of
//! the contract that must hold regardless of what the model returns.

use kabot_core::error::{Error, Result};
use kabot_core::memory::FactSet;
use kabot_core::message::{Message, Role};
use tracing::{debug, warn};

use crate::llm::LlmGateway;
use crate::prompts::memory::{
    fact_merge_prompt, fresh_summary_prompt, fused_summary_prompt, SUMMARY_SENTINEL,
};
use crate::prompts::render_facts;
use crate::reply::{parse_object, value_to_text};

/// Whether any message can carry a fact about the user.
fn has_fact_bearing(messages: &[Message]) -> bool {
    messages
        .iter()
        .any(|m| matches!(m.role, Role::User | Role::Assistant) && !m.content.trim().is_empty())
}

/// Merges recent messages into the durable [`FactSet`].
#[derive(Clone)]
pub struct FactMerger {
    gateway: LlmGateway,
}

impl FactMerger {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Merge `recent` into `old`.
    ///
    /// - Without a fact-bearing message, returns `old` and skips the gateway.
    /// - The result is `old` overlaid with the model's set: keys are updated
    ///   or added, never dropped.
    /// - A reply that is not a JSON object fails with [`Error::FactMergeParse`].
    pub async fn merge(&self, old: &FactSet, recent: &[Message]) -> Result<FactSet> {
        if !has_fact_bearing(recent) {
            debug!("No fact-bearing messages, keeping facts as they are");
            return Ok(old.clone());
        }

        let prompt = fact_merge_prompt(&render_facts(old), recent);
        let raw = self.gateway.generate(vec![prompt]).await?;
        let fresh = parse_facts(&raw)?;

        let mut merged = old.clone();
        for (key, value) in fresh {
            merged.insert(key, value);
        }
        debug!(before = old.len(), after = merged.len(), "Merged facts");
        Ok(merged)
    }
}

/// Read a fact-merge reply as a flat `name → text` map.
pub fn parse_facts(raw: &str) -> Result<FactSet> {
    let obj = parse_object(raw).map_err(|reason| {
        warn!(%reason, "Fact merge reply is not a JSON object");
        Error::FactMergeParse {
            reason,
            raw: raw.to_string(),
        }
    })?;

    Ok(obj
        .into_iter()
        .map(|(key, value)| {
            let text = value_to_text(&value);
            (key, text)
        })
        .collect())
}

/// Merges recent messages into the rolling summary.
#[derive(Clone)]
pub struct SummaryMerger {
    gateway: LlmGateway,
}

impl SummaryMerger {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Produce the summary that replaces `previous`.
    ///
    /// | previous | recent | result |
    /// |----------|--------|--------|
    /// | none | none | [`SUMMARY_SENTINEL`], no gateway call |
    /// | some | none | `previous` unchanged |
    /// | none | some | fresh TL;DR |
    /// | some | some | TL;DR fused with `previous` |
    pub async fn merge(&self, previous: Option<&str>, recent: &[Message]) -> Result<String> {
        let previous = previous.map(str::trim).filter(|p| !p.is_empty());
        let recent: Vec<Message> = recent.iter().filter(|m| m.has_content()).cloned().collect();

        let prompt = match (previous, recent.is_empty()) {
            (None, true) => return Ok(SUMMARY_SENTINEL.to_string()),
            (Some(previous), true) => return Ok(previous.to_string()),
            (None, false) => fresh_summary_prompt(&recent),
            (Some(previous), false) => fused_summary_prompt(previous, &recent),
        };

        self.gateway.generate(vec![prompt]).await
    }
}
