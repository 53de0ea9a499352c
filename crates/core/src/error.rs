//! Error types for the Kabot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Kabot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- LLM gateway errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory tier errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Collaborator errors ---
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// The fact merge reply could not be read as a JSON object.
    /// Facts are never guessed from free text, so this fails the turn.
    #[error("Fact merge reply is not a JSON object: {reason}")]
    FactMergeParse { reason: String, raw: String },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the same turn may succeed if retried later.
    ///
    /// Gateway, collaborator and storage outages are transient; parse and
    /// configuration failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider(e) => !matches!(
                e,
                ProviderError::AuthenticationFailed(_)
                    | ProviderError::ModelNotFound(_)
                    | ProviderError::NotConfigured(_)
            ),
            Self::Memory(e) => !matches!(e, MemoryError::InvalidData(_)),
            Self::Collaborator(_) => true,
            Self::FactMergeParse { .. }
            | Self::Config { .. }
            | Self::Serialization(_)
            | Self::Internal(_) => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Storage timed out: {0}")]
    Timeout(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

#[derive(Debug, Clone, Error)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {name}: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Collaborator timed out: {name} after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}
