use async_trait::async_trait;
use kabot_core::collaborator::{Collaborator, CollaboratorExtras};
use kabot_core::error::Result;

use crate::llm::LlmGateway;
use crate::prompts::collaborators::kavak_info_messages;

/// Answers questions about Kavak from a fixed information sheet.
pub struct KavakInfoDesk {
    gateway: LlmGateway,
}

impl KavakInfoDesk {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Collaborator for KavakInfoDesk {
    fn name(&self) -> &str {
        "kavak_info"
    }

    async fn respond(&self, user_input: &str, _extras: &CollaboratorExtras) -> Result<String> {
        self.gateway.generate(kavak_info_messages(user_input)).await
    }
}
