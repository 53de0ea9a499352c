use async_trait::async_trait;
use kabot_core::collaborator::{Collaborator, CollaboratorExtras};
use kabot_core::error::Result;

use crate::llm::LlmGateway;
use crate::prompts::collaborators::farewell_messages;

/// Writes the closing message of a conversation.
pub struct FarewellWriter {
    gateway: LlmGateway,
}

impl FarewellWriter {
    pub fn new(gateway: LlmGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Collaborator for FarewellWriter {
    fn name(&self) -> &str {
        "farewell"
    }

    async fn respond(&self, user_input: &str, extras: &CollaboratorExtras) -> Result<String> {
        self.gateway
            .generate(farewell_messages(user_input, extras))
            .await
    }
}
