//! # Kabot Core
//!
//! Domain types, traits, and error definitions for the Kabot
//! conversational-memory orchestrator. This crate has **zero framework
//! dependencies**; it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external seam is a trait here: the LLM gateway ([`Provider`]), the
//! storage backends ([`KeyValueStore`], [`DocumentStore`]), the memory tiers
//! ([`MemoryTier`]) and the collaborators ([`Collaborator`],
//! [`VehicleSearch`]). Implementations live in their respective crates.

pub mod collaborator;
pub mod error;
pub mod intent;
pub mod memory;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use collaborator::{Collaborator, CollaboratorExtras, Vehicle, VehicleSearch};
pub use error::{Error, Result};
pub use intent::{Intent, IntentKind};
pub use memory::{Document, DocumentStore, FactSet, FieldUpdate, KeyValueStore, MemoryTier};
pub use message::{Message, Role, UserKey};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
