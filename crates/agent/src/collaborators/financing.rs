use async_trait::async_trait;
use kabot_core::collaborator::{Collaborator, CollaboratorExtras};
use kabot_core::error::Result;

use crate::llm::LlmGateway;
use crate::prompts::collaborators::financing_messages;

/// Estimates monthly payments for a vehicle.
pub struct FinancingAdvisor {
    gateway: LlmGateway,
}

impl FinancingAdvisor {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Collaborator for FinancingAdvisor {
    fn name(&self) -> &str {
        "financing"
    }

    async fn respond(&self, user_input: &str, extras: &CollaboratorExtras) -> Result<String> {
        self.gateway
            .generate(financing_messages(user_input, extras))
            .await
    }
}
