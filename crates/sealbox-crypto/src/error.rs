//! Error types for sealbox-crypto

use thiserror::Error;

/// Errors that can occur during sealing and unsealing operations
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Authentication tag mismatch")]
    TagMismatch,

    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Key wrap failed: {0}")]
    KeyWrapFailed(String),

    #[error("Key unwrap failed: {0}")]
    KeyUnwrapFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Malformed artifact field '{field}': {reason}")]
    MalformedArtifact {
        field: &'static str,
        reason: String,
    },

    #[error("Malformed credentials payload: {0}")]
    MalformedCredentials(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
