//! Error types for sealbox-packager

use sealbox_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while packaging or verifying sealed credentials
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("Crypto operation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid key module: {0}")]
    KeyModule(String),

    #[error("Invalid artifact file: {0}")]
    ArtifactFile(String),
}

impl From<std::io::Error> for PackageError {
    fn from(e: std::io::Error) -> Self {
        PackageError::Io(e.to_string())
    }
}

/// Result type for packaging operations
pub type PackageResult<T> = Result<T, PackageError>;
