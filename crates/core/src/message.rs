//! Message and user-key domain types.
//!
//! These are the value objects that flow through the entire system:
//! a user sends a message → the orchestrator classifies it → a handler
//! replies → the exchange lands in the memory tiers.

use serde::{Deserialize, Serialize};

/// Opaque identifier for one user's conversation (a phone-number-derived id).
///
/// Every memory tier is keyed by it; nothing is shared across keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKey(pub String);

impl UserKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive a key from a WhatsApp sender such as `whatsapp:+5215512345678`.
    ///
    /// Keeps only the part after the last `:` and drops any `+`.
    pub fn from_whatsapp_sender(raw: &str) -> Self {
        let number = raw.rsplit(':').next().unwrap_or(raw);
        Self(number.replace('+', "").trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The role of a message sender in a conversation.
///
/// Deserialization rejects any other role, so malformed stored history fails
/// at the storage boundary instead of deep inside a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions and injected context
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Whether the content carries any text at all.
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    /// Render as an XML-style block: `<role>content</role>`.
    pub fn to_tagged(&self) -> String {
        let role = self.role.as_str();
        format!("<{role}>{}</{role}>", self.content)
    }
}

/// Render messages as `<role>content</role>` lines in chronological order.
pub fn render_tagged(messages: &[Message]) -> String {
    messages
        .iter()
        .map(Message::to_tagged)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render messages as a plain `role: content` transcript.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
