//! Prompt builders.
//!
//! Every prompt the orchestrator sends is built here, so the wording lives
//! in one place and tests can assert on it.

pub mod collaborators;
pub mod conversation;
pub mod memory;

use kabot_core::memory::FactSet;

/// Render facts as `name: value` pairs on one line.
pub fn render_facts(facts: &FactSet) -> String {
    facts
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
