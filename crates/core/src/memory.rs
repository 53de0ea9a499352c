//! Memory traits: storage backends and the four memory tiers.
//!
//! Two backend shapes sit underneath the tiers:
//! - [`KeyValueStore`]: a cache-like store holding JSON values per key
//!   (backs working memory)
//! - [`DocumentStore`]: one JSON document per user per collection with
//!   field-level updates (backs episodic, fact and summary memory)
//!
//! The tiers themselves share the [`MemoryTier`] contract: load, store and
//! delete a value per [`UserKey`].

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use crate::error::MemoryError;
use crate::message::UserKey;

/// Durable, merged profile of a user: fact name → value.
pub type FactSet = BTreeMap<String, String>;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// The field that identifies a user inside every document.
pub const USER_ID_FIELD: &str = "whatsapp_id";

/// The field stamped on every document update.
pub const LAST_UPDATED_FIELD: &str = "last_updated";

/// A cache-like key-value backend.
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Fetch the value stored under `key`, if any and not expired.
    async fn get(&self, key: &str) -> std::result::Result<Option<Value>, MemoryError>;

    /// Store `value` under `key`. A `ttl` of `None` means no expiry.
    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Option<Duration>,
    ) -> std::result::Result<(), MemoryError>;

    /// Remove `key`. Returns whether anything was removed.
    async fn delete(&self, key: &str) -> std::result::Result<bool, MemoryError>;
}

/// One field-level change applied by [`DocumentStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Append `values` to the array in `field`, creating it if missing.
    PushEach { field: String, values: Vec<Value> },
    /// Replace `field` with `value`.
    Set { field: String, value: Value },
}

impl FieldUpdate {
    pub fn push_each(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::PushEach {
            field: field.into(),
            values,
        }
    }

    pub fn set(field: impl Into<String>, value: Value) -> Self {
        Self::Set {
            field: field.into(),
            value,
        }
    }
}

/// Apply updates to a document in place.
///
/// Shared by every backend so push/set semantics stay identical.
pub fn apply_updates(doc: &mut Document, updates: &[FieldUpdate]) -> std::result::Result<(), MemoryError> {
    for update in updates {
        match update {
            FieldUpdate::PushEach { field, values } => {
                let slot = doc
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(items) => items.extend(values.iter().cloned()),
                    other => {
                        return Err(MemoryError::InvalidData(format!(
                            "cannot push onto non-array field '{field}' ({other})"
                        )));
                    }
                }
            }
            FieldUpdate::Set { field, value } => {
                doc.insert(field.clone(), value.clone());
            }
        }
    }
    Ok(())
}

/// A document backend with one document per (collection, user).
///
/// Implementations: SQLite, in-memory (for testing).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Find the document for `user` in `collection`.
    async fn find_one(
        &self,
        collection: &str,
        user: &UserKey,
    ) -> std::result::Result<Option<Document>, MemoryError>;

    /// Apply `updates` to the document for `user`, creating it if missing.
    ///
    /// The whole update list is applied atomically.
    async fn upsert(
        &self,
        collection: &str,
        user: &UserKey,
        updates: Vec<FieldUpdate>,
    ) -> std::result::Result<(), MemoryError>;

    /// Remove the whole document. Returns whether anything was removed.
    async fn delete(&self, collection: &str, user: &UserKey) -> std::result::Result<bool, MemoryError>;
}

/// The uniform contract of a memory tier.
///
/// What `store` means depends on the tier: working and episodic memory
/// append, fact and summary memory replace the stored value.
#[async_trait]
pub trait MemoryTier: Send + Sync {
    /// The value held per user.
    type Value: Send;

    /// The tier name (e.g., "working", "episodic").
    fn name(&self) -> &str;

    /// Load the value for `user`, if any.
    async fn load(&self, user: &UserKey) -> std::result::Result<Option<Self::Value>, MemoryError>;

    /// Store `value` for `user` with the tier's write semantics.
    async fn store(&self, user: &UserKey, value: Self::Value) -> std::result::Result<(), MemoryError>;

    /// Remove everything the tier holds for `user`.
    async fn delete(&self, user: &UserKey) -> std::result::Result<(), MemoryError>;
}
