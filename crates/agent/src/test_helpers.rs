//! Scripted providers and fixtures shared by unit and integration tests.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kabot_core::collaborator::Vehicle;
use kabot_core::error::ProviderError;
use kabot_core::message::Message;
use kabot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

type Scripted = Result<String, ProviderError>;

/// A mock provider that returns a sequence of scripted replies.
///
/// Each call to `complete` pops the next reply and records the request.
/// Once the script runs out every call fails with `NotConfigured`.
pub struct SequentialMockProvider {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Option<Duration>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SequentialMockProvider {
    pub fn new(replies: Vec<Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// A provider that answers with each text in turn.
    pub fn replies<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    /// Sleep before every reply (pair with a paused tokio clock).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        guard(&self.requests).len()
    }

    /// The `index`-th request received, if any.
    pub fn request(&self, index: usize) -> Option<ProviderRequest> {
        guard(&self.requests).get(index).cloned()
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        guard(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = guard(&self.requests);
            requests.push(request);
            requests.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = guard(&self.replies).pop_front();
        match next {
            Some(Ok(text)) => Ok(make_text_response(&text)),
            Some(Err(e)) => Err(e),
            None => Err(ProviderError::NotConfigured(format!(
                "SequentialMockProvider: no reply scripted for call #{call}"
            ))),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A small catalog for search tests.
pub fn sample_vehicles() -> Vec<Vehicle> {
    vec![
        Vehicle {
            stock_id: 243587,
            km: 41000,
            price: 289999.0,
            make: "Mazda".into(),
            model: "3".into(),
            year: 2021,
            version: "2.5 S Grand Touring".into(),
            bluetooth: true,
            largo: 4460.0,
            ancho: 1795.0,
            altura: 1435.0,
            car_play: true,
        },
        Vehicle {
            stock_id: 118920,
            km: 67000,
            price: 215000.0,
            make: "Volkswagen".into(),
            model: "Jetta".into(),
            year: 2019,
            version: "Trendline".into(),
            bluetooth: true,
            largo: 4702.0,
            ancho: 1799.0,
            altura: 1459.0,
            car_play: false,
        },
        Vehicle {
            stock_id: 305511,
            km: 23000,
            price: 389000.0,
            make: "Toyota".into(),
            model: "RAV4".into(),
            year: 2022,
            version: "XLE".into(),
            bluetooth: true,
            largo: 4600.0,
            ancho: 1855.0,
            altura: 1685.0,
            car_play: true,
        },
    ]
}
