//! Backend construction: one handle per backend, shared by the tiers that use it.

use std::sync::Arc;
use std::time::Duration;

use kabot_config::MemoryConfig;
use kabot_core::error::MemoryError;
use kabot_core::memory::{DocumentStore, KeyValueStore};
use tracing::info;

use crate::in_memory::InMemoryBackend;
use crate::tiers::{EpisodicMemory, FactMemory, SummaryMemory, WorkingMemory};

/// The four tiers, built once and injected into the orchestrator.
#[derive(Clone)]
pub struct Stores {
    pub working: WorkingMemory,
    pub episodic: EpisodicMemory,
    pub facts: FactMemory,
    pub summary: SummaryMemory,
}

impl Stores {
    /// Wire the tiers over explicit backends.
    pub fn from_backends(
        kv: Arc<dyn KeyValueStore>,
        documents: Arc<dyn DocumentStore>,
        config: &MemoryConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            working: WorkingMemory::new(kv, config.namespace.clone(), config.working_ttl(), timeout),
            episodic: EpisodicMemory::new(documents.clone(), timeout),
            facts: FactMemory::new(documents.clone(), timeout),
            summary: SummaryMemory::new(documents, timeout),
        }
    }

    /// Everything in process memory.
    pub fn in_memory(config: &MemoryConfig, timeout: Duration) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        Self::from_backends(backend.clone(), backend, config, timeout)
    }

    /// Build the backend named by `config.backend`.
    pub async fn from_config(config: &MemoryConfig, timeout: Duration) -> Result<Self, MemoryError> {
        match config.backend.as_str() {
            "in_memory" => {
                info!("Using in-memory storage; nothing survives a restart");
                Ok(Self::in_memory(config, timeout))
            }
            #[cfg(feature = "sqlite")]
            "sqlite" => {
                let path = config.database_path();
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        MemoryError::Storage(format!("Cannot create {}: {e}", parent.display()))
                    })?;
                }
                let url = format!("sqlite://{}", path.display());
                let backend = Arc::new(crate::sqlite::SqliteBackend::new(&url).await?);
                Ok(Self::from_backends(backend.clone(), backend, config, timeout))
            }
            other => Err(MemoryError::Storage(format!(
                "Unknown memory backend '{other}'"
            ))),
        }
    }
}
