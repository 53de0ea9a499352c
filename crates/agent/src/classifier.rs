//! Intent classifier.
//!
//! One gateway call per turn. The reply is expected to be a JSON object with
//! an `intention` field; anything else falls back to [`Intent::None`] with
//! the raw reply as the answer, so a chatty model still produces a reply.

use kabot_core::error::Result;
use kabot_core::intent::{Intent, IntentKind};
use tracing::{debug, warn};

use crate::context::AssembledContext;
use crate::llm::LlmGateway;
use crate::prompts::conversation::intent_messages;
use crate::reply::{parse_object, value_to_text};

/// A classified turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    /// The gateway reply exactly as received, untrimmed.
    pub raw: String,
}

#[derive(Clone)]
pub struct IntentClassifier {
    gateway: LlmGateway,
}

impl IntentClassifier {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }

    /// Classify `input` against the assembled memory views.
    ///
    /// Only gateway failures are errors; unreadable replies fall back.
    pub async fn classify(&self, ctx: &AssembledContext, input: &str) -> Result<Classification> {
        let messages = intent_messages(&ctx.facts_text, &ctx.summary_text, &ctx.history_text, input);
        let raw = self.gateway.generate_raw(messages).await?;
        let intent = parse_or_fallback(&raw);
        debug!(intent = %intent.kind(), "Classified turn");
        Ok(Classification { intent, raw })
    }
}

/// Parse a classifier reply, falling back to `none` with `raw` as the reply.
pub fn parse_or_fallback(raw: &str) -> Intent {
    match parse_intent(raw) {
        Ok(intent) => intent,
        Err(reason) => {
            warn!(%reason, "Unreadable classification, answering with the raw reply");
            Intent::None {
                reply: raw.to_string(),
            }
        }
    }
}

/// Strictly parse a classifier reply.
pub fn parse_intent(raw: &str) -> std::result::Result<Intent, String> {
    let obj = parse_object(raw)?;

    let kind: IntentKind = match obj.get("intention") {
        Some(serde_json::Value::String(name)) => name.parse()?,
        Some(other) => return Err(format!("intention is not a string: {other}")),
        None => return Err("missing intention".into()),
    };

    Ok(match kind {
        IntentKind::None => match obj.get("response") {
            Some(serde_json::Value::String(reply)) => Intent::None {
                reply: reply.clone(),
            },
            _ => return Err("intention none without a response".into()),
        },
        IntentKind::Search => Intent::Search,
        IntentKind::Financing => Intent::Financing {
            vehicle: obj
                .get("vehicle")
                .filter(|v| !v.is_null())
                .map(value_to_text)
                .filter(|v| !v.is_empty()),
        },
        IntentKind::KavakInfo => Intent::KavakInfo,
        IntentKind::EpisodicMemory => Intent::EpisodicMemory,
        IntentKind::Exit => Intent::Exit,
    })
}
