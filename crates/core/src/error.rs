//! Error types for the MotoAsesor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them all.

use thiserror::Error;

/// The top-level error type for all MotoAsesor operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Transport errors ---
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Inventory store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

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

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by a completion backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

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

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Map a `reqwest`-style transport failure description onto the taxonomy.
    pub fn from_transport(is_timeout: bool, message: impl Into<String>) -> Self {
        if is_timeout {
            Self::Timeout(message.into())
        } else {
            Self::Network(message.into())
        }
    }
}

/// A failed attempt to produce a reply for a user message.
///
/// The router converts every variant into the fixed apology text.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("completion backend failed: {0}")]
    Backend(#[from] ProviderError),

    #[error("completion backend returned an empty reply")]
    EmptyReply,
}

/// Failures of the inventory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or refused the request.
    #[error("Inventory store unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Failures of the chat transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// Outbound delivery (text or presence) was rejected or never arrived.
    #[error("Message delivery failed to {recipient}: {reason}")]
    SendFailed { recipient: String, reason: String },

    #[error("Channel connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}
