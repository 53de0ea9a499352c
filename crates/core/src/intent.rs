//! Intent: the classified purpose of a user's message.
//!
//! The six intents are mutually exclusive and checked in a fixed order.
//! [`IntentKind::PRECEDENCE`] is the single source of that order; the
//! classifier prompt is rendered from it.

use serde::{Deserialize, Serialize};

/// The intent discriminant, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Exit,
    KavakInfo,
    Search,
    Financing,
    EpisodicMemory,
    None,
}

impl IntentKind {
    /// Evaluation order, highest priority first.
    pub const PRECEDENCE: [IntentKind; 6] = [
        IntentKind::Exit,
        IntentKind::KavakInfo,
        IntentKind::Search,
        IntentKind::Financing,
        IntentKind::EpisodicMemory,
        IntentKind::None,
    ];

    /// The wire name used in the classifier's JSON reply.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Exit => "exit",
            IntentKind::KavakInfo => "kavak_info",
            IntentKind::Search => "search",
            IntentKind::Financing => "financing",
            IntentKind::EpisodicMemory => "episodic_memory",
            IntentKind::None => "none",
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IntentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IntentKind::PRECEDENCE
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown intention '{s}'"))
    }
}

/// A classified intent with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Small talk or anything else; the classifier already wrote the reply.
    None { reply: String },
    /// Vehicle search request.
    Search,
    /// Financing question, with the vehicle if the classifier identified one.
    Financing { vehicle: Option<String> },
    /// Question about Kavak itself.
    KavakInfo,
    /// Needs something said earlier that is no longer in working memory.
    EpisodicMemory,
    /// The user is saying goodbye.
    Exit,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::None { .. } => IntentKind::None,
            Intent::Search => IntentKind::Search,
            Intent::Financing { .. } => IntentKind::Financing,
            Intent::KavakInfo => IntentKind::KavakInfo,
            Intent::EpisodicMemory => IntentKind::EpisodicMemory,
            Intent::Exit => IntentKind::Exit,
        }
    }
}
