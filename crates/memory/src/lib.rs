//! Memory tiers and storage backends for Kabot.

pub mod in_memory;
pub mod stores;
pub mod tiers;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryBackend;
pub use stores::Stores;
pub use tiers::{EpisodicMemory, FactMemory, SummaryMemory, WorkingMemory};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
