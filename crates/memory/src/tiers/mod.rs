//! The four memory tiers.
//!
//! Each tier wraps a storage backend behind the [`MemoryTier`] contract and
//! bounds every backend call with a timeout.
//!
//! [`MemoryTier`]: kabot_core::MemoryTier

mod episodic;
mod fact;
mod summary;
mod working;

pub use episodic::EpisodicMemory;
pub use fact::FactMemory;
pub use summary::SummaryMemory;
pub use working::WorkingMemory;

use std::future::Future;
use std::time::Duration;

use kabot_core::error::MemoryError;
use kabot_core::memory::Document;
use kabot_core::message::Message;
use serde_json::Value;

/// Run a backend call, turning an elapsed timer into [`MemoryError::Timeout`].
pub(crate) async fn bounded<T, F>(timeout: Duration, op: &str, fut: F) -> Result<T, MemoryError>
where
    F: Future<Output = Result<T, MemoryError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(MemoryError::Timeout(format!(
            "{op} exceeded {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Decode a JSON array of `{role, content}` objects.
pub(crate) fn decode_messages(value: Value, what: &str) -> Result<Vec<Message>, MemoryError> {
    serde_json::from_value(value)
        .map_err(|e| MemoryError::InvalidData(format!("{what} is not a message list: {e}")))
}

pub(crate) fn encode_messages(messages: &[Message]) -> Result<Vec<Value>, MemoryError> {
    messages
        .iter()
        .map(|m| {
            serde_json::to_value(m)
                .map_err(|e| MemoryError::Storage(format!("Message serialization: {e}")))
        })
        .collect()
}

/// Pull a string field out of a stored document.
pub(crate) fn string_field(doc: &Document, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn timestamp() -> Value {
    Value::String(chrono::Utc::now().to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn bounded_call_times_out() {
        let result: Result<(), MemoryError> = bounded(Duration::from_secs(1), "get", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(MemoryError::Timeout(msg)) if msg.contains("get")));
    }

    #[test]
    fn unknown_role_is_invalid_data() {
        let value = serde_json::json!([{"role": "tool", "content": "x"}]);
        assert!(matches!(
            decode_messages(value, "history"),
            Err(MemoryError::InvalidData(_))
        ));
    }
}
