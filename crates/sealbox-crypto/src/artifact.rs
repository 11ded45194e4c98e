//! The sealed credential artifact format.
//!
//! A sealed artifact is the JSON document published alongside the
//! application bundle. All four fields are standard base64:
//!
//! - `data`: AES-256-GCM ciphertext of the credentials JSON
//! - `iv`: the 16-byte GCM nonce
//! - `authTag`: the detached 16-byte authentication tag
//! - `encryptedKey`: the RSA-OAEP wrapped payload key
//!
//! The artifact is safe to serve publicly; without the matching private key
//! none of the fields reveal the credentials.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::envelope::{self, NONCE_SIZE, PayloadKey, TAG_SIZE};
use crate::error::{CryptoError, CryptoResult};
use crate::keywrap;

/// Backend connection credentials carried inside the encrypted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendCredentials {
    /// Base URL of the backend project.
    pub url: String,
    /// Publishable API key for the backend.
    pub key: String,
}

impl BackendCredentials {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
        }
    }

    /// Serialize to the canonical JSON payload: `{"url":...,"key":...}`.
    pub fn to_json(&self) -> CryptoResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| CryptoError::MalformedCredentials(e.to_string()))
    }

    /// Parse a decrypted JSON payload, rejecting missing or empty fields.
    pub fn from_json(bytes: &[u8]) -> CryptoResult<Self> {
        let credentials: Self = serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::MalformedCredentials(e.to_string()))?;

        if credentials.url.is_empty() {
            return Err(CryptoError::MalformedCredentials(
                "field 'url' is empty".to_string(),
            ));
        }
        if credentials.key.is_empty() {
            return Err(CryptoError::MalformedCredentials(
                "field 'key' is empty".to_string(),
            ));
        }

        Ok(credentials)
    }
}

/// Published artifact with base64-encoded fields.
///
/// Serde field names match the wire format exactly: `data`, `iv`,
/// `authTag`, `encryptedKey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedArtifact {
    /// Base64 ciphertext of the credentials JSON.
    pub data: String,
    /// Base64 16-byte GCM nonce.
    pub iv: String,
    /// Base64 16-byte detached authentication tag.
    pub auth_tag: String,
    /// Base64 RSA-OAEP wrapped payload key.
    pub encrypted_key: String,
}

impl SealedArtifact {
    /// Assemble an artifact from raw envelope parts.
    pub fn assemble(
        ciphertext: &[u8],
        nonce: &[u8; NONCE_SIZE],
        tag: &[u8; TAG_SIZE],
        wrapped_key: &[u8],
    ) -> Self {
        Self {
            data: BASE64.encode(ciphertext),
            iv: BASE64.encode(nonce),
            auth_tag: BASE64.encode(tag),
            encrypted_key: BASE64.encode(wrapped_key),
        }
    }

    /// Decode the base64 fields back into raw envelope parts.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedArtifact`] naming the offending field
    /// when a value is not valid base64 or has the wrong decoded length.
    pub fn decode(&self) -> CryptoResult<DecodedArtifact> {
        let ciphertext = decode_field("data", &self.data)?;
        let iv = decode_field("iv", &self.iv)?;
        let tag_bytes = decode_field("authTag", &self.auth_tag)?;
        let wrapped_key = decode_field("encryptedKey", &self.encrypted_key)?;

        let nonce: [u8; NONCE_SIZE] =
            iv.try_into().map_err(|v: Vec<u8>| CryptoError::MalformedArtifact {
                field: "iv",
                reason: format!("expected {} bytes, got {}", NONCE_SIZE, v.len()),
            })?;

        let tag: [u8; TAG_SIZE] =
            tag_bytes
                .try_into()
                .map_err(|v: Vec<u8>| CryptoError::MalformedArtifact {
                    field: "authTag",
                    reason: format!("expected {} bytes, got {}", TAG_SIZE, v.len()),
                })?;

        Ok(DecodedArtifact {
            ciphertext,
            nonce,
            tag,
            wrapped_key,
        })
    }
}

/// Raw envelope parts recovered from a sealed artifact.
#[derive(Debug, Clone)]
pub struct DecodedArtifact {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
    pub wrapped_key: Vec<u8>,
}

fn decode_field(field: &'static str, value: &str) -> CryptoResult<Vec<u8>> {
    BASE64.decode(value).map_err(|e| CryptoError::MalformedArtifact {
        field,
        reason: e.to_string(),
    })
}

/// Seal credentials into a publishable artifact.
///
/// Generates a fresh payload key and nonce, encrypts the canonical
/// credentials JSON, and wraps the payload key under `public`. The payload
/// key drops (and zeroizes) before this function returns.
pub fn seal(
    credentials: &BackendCredentials,
    public: &RsaPublicKey,
) -> CryptoResult<SealedArtifact> {
    let payload = credentials.to_json()?;
    let key = PayloadKey::generate();
    let nonce = envelope::generate_nonce();

    let (ciphertext, tag) = envelope::encrypt_payload(&payload, &key, &nonce)?;
    let wrapped_key = keywrap::wrap_key(&key, public)?;

    Ok(SealedArtifact::assemble(&ciphertext, &nonce, &tag, &wrapped_key))
}

/// Unseal an artifact back into credentials.
///
/// Unwraps the payload key, decrypts with mandatory tag verification, then
/// parses the credentials JSON.
pub fn unseal(
    artifact: &SealedArtifact,
    private: &RsaPrivateKey,
) -> CryptoResult<BackendCredentials> {
    let decoded = artifact.decode()?;
    let key = keywrap::unwrap_key(&decoded.wrapped_key, private)?;
    let plaintext =
        envelope::decrypt_payload(&decoded.ciphertext, &key, &decoded.nonce, &decoded.tag)?;
    BackendCredentials::from_json(&plaintext)
}
