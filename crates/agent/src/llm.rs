//! The LLM gateway: one ordered message list in, one text out.

use std::sync::Arc;
use std::time::Duration;

use kabot_config::AppConfig;
use kabot_core::error::{ProviderError, Result};
use kabot_core::message::Message;
use kabot_core::provider::{Provider, ProviderRequest};
use tracing::debug;

/// A provider bound to a model, sampling settings and a call timeout.
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Bind `provider` with the model, sampling and timeout settings from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
            timeout: config.orchestrator.gateway_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `messages` and return the trimmed reply text.
    pub async fn generate(&self, messages: Vec<Message>) -> Result<String> {
        Ok(self.generate_raw(messages).await?.trim().to_string())
    }

    /// Send `messages` and return the reply text exactly as received.
    pub async fn generate_raw(&self, messages: Vec<Message>) -> Result<String> {
        let mut request = ProviderRequest::new(self.model.clone(), messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            "Calling LLM gateway"
        );

        let response = tokio::time::timeout(self.timeout, self.provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!("no reply within {}s", self.timeout.as_secs()))
            })??;

        if let Some(usage) = &response.usage {
            debug!(total_tokens = usage.total_tokens, "LLM gateway replied");
        }
        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;
    use kabot_core::Error;

    #[tokio::test]
    async fn generate_trims_and_forwards_settings() {
        let provider = Arc::new(SequentialMockProvider::replies(["  hola  "]));
        let gateway = LlmGateway::new(provider.clone(), "test-model").with_temperature(0.0);

        let reply = gateway.generate(vec![Message::user("Hola")]).await.unwrap();
        assert_eq!(reply, "hola");

        let request = provider.request(0).unwrap();
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.messages, vec![Message::user("Hola")]);
    }

    #[tokio::test]
    async fn generate_raw_keeps_whitespace() {
        let provider = Arc::new(SequentialMockProvider::replies(["  hola\n"]));
        let gateway = LlmGateway::new(provider, "m");
        let reply = gateway.generate_raw(vec![Message::user("Hola")]).await.unwrap();
        assert_eq!(reply, "  hola\n");
    }

    #[tokio::test]
    async fn provider_errors_surface() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::Network("connection refused".into()),
        )]));
        let gateway = LlmGateway::new(provider, "m");
        let err = gateway.generate(vec![Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out() {
        let provider = Arc::new(SequentialMockProvider::replies(["tarde"]).with_delay(Duration::from_secs(30)));
        let gateway = LlmGateway::new(provider, "m").with_timeout(Duration::from_secs(5));
        let err = gateway.generate(vec![Message::user("x")]).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Timeout(_))));
    }
}
