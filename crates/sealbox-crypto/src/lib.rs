//! # Sealbox Crypto
//!
//! Hybrid envelope encryption for sealed backend credentials.
//!
//! A packaging run generates a fresh 256-bit payload key, encrypts the
//! credentials JSON with AES-256-GCM (16-byte nonce, detached 16-byte tag),
//! and wraps the payload key under a freshly generated RSA public key using
//! OAEP with SHA-256. The four parts ship as one base64 JSON artifact; the
//! matching PKCS#8 private key is embedded in the consuming application.
//!
//! ## Key Types
//!
//! - [`PayloadKey`]: Random symmetric key protecting one credentials payload
//! - [`SealedArtifact`]: The published artifact (`data`, `iv`, `authTag`, `encryptedKey`)
//! - [`BackendCredentials`]: The plaintext payload (`url` and `key`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use sealbox_crypto::{BackendCredentials, generate_keypair, seal, unseal};
//!
//! let credentials = BackendCredentials::new("https://project.example.co", "public-api-key");
//! let (private, public) = generate_keypair(4096)?;
//!
//! // Offline: seal the credentials for publication
//! let artifact = seal(&credentials, &public)?;
//!
//! // Runtime: recover them with the embedded private key
//! let recovered = unseal(&artifact, &private)?;
//! assert_eq!(recovered, credentials);
//! ```

pub mod artifact;
pub mod envelope;
pub mod error;
pub mod keywrap;

// Re-exports
pub use artifact::{BackendCredentials, DecodedArtifact, SealedArtifact, seal, unseal};
pub use envelope::{
    KEY_SIZE, NONCE_SIZE, PayloadKey, TAG_SIZE, decrypt_payload, encrypt_payload, generate_nonce,
};
pub use error::{CryptoError, CryptoResult};
pub use keywrap::{
    DEFAULT_MODULUS_BITS, generate_keypair, private_key_from_pem, private_key_to_pem,
    public_key_from_pem, public_key_to_pem, unwrap_key, wrap_key,
};

// Re-export RSA key types for convenience
pub use rsa::{RsaPrivateKey, RsaPublicKey};
