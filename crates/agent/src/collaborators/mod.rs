//! Collaborators the router hands specialised turns to.
//!
//! The prompt-backed ones answer through the LLM gateway; [`CatalogSearch`]
//! stands in for an external vehicle search backend.

mod catalog;
mod farewell;
mod financing;
mod kavak_info;

pub use catalog::CatalogSearch;
pub use farewell::FarewellWriter;
pub use financing::FinancingAdvisor;
pub use kavak_info::KavakInfoDesk;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kabot_core::collaborator::{Collaborator, VehicleSearch};
use kabot_core::error::{CollaboratorError, Result};

use crate::llm::LlmGateway;

/// The collaborators one orchestrator dispatches to.
#[derive(Clone)]
pub struct Collaborators {
    pub search: Arc<dyn VehicleSearch>,
    pub financing: Arc<dyn Collaborator>,
    pub kavak_info: Arc<dyn Collaborator>,
    pub farewell: Arc<dyn Collaborator>,
}

impl Collaborators {
    /// The LLM-backed financing, Kavak-info and farewell collaborators over `gateway`.
    pub fn prompt_backed(gateway: LlmGateway, search: Arc<dyn VehicleSearch>) -> Self {
        Self {
            search,
            financing: Arc::new(FinancingAdvisor::new(gateway.clone())),
            kavak_info: Arc::new(KavakInfoDesk::new(gateway.clone())),
            farewell: Arc::new(FarewellWriter::new(gateway)),
        }
    }
}

/// Run a collaborator call, turning an elapsed timer into [`CollaboratorError::Timeout`].
pub async fn bounded<T, F>(name: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout {
            name: name.to_string(),
            timeout_secs: timeout.as_secs(),
        }
        .into()),
    }
}
