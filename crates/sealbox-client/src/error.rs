//! Error types for sealbox-client

use thiserror::Error;

/// Errors that can occur while bootstrapping the backend client.
///
/// Clone because one failed initialization attempt fans out to every caller
/// awaiting it.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("Failed to fetch credential artifact: {0}")]
    Fetch(String),

    #[error("Failed to unwrap payload key: {0}")]
    KeyUnwrap(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),

    #[error("Decrypted credentials are malformed: {0}")]
    MalformedCredentials(String),

    #[error("Backend client is not initialized")]
    NotInitialized,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors from backend API calls after initialization
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Backend returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Session store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Http(e.to_string())
    }
}

/// Result type for backend API operations
pub type BackendResult<T> = Result<T, BackendError>;
