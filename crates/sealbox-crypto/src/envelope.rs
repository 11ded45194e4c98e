//! AES-256-GCM payload encryption with detached authentication tags.
//!
//! This module provides the symmetric half of the hybrid envelope: a random
//! 256-bit payload key encrypts the credentials JSON under a random 128-bit
//! nonce, producing a ciphertext and a detached 128-bit authentication tag.
//! Keeping the tag detached lets the ciphertext, nonce, and tag travel as
//! separate fields of the published artifact.
//!
//! ## Security Model
//!
//! - Each packaging run uses a fresh random payload key and a fresh nonce
//! - The payload key is never written to disk; it leaves the packager only
//!   in RSA-wrapped form
//! - Decryption verifies the authentication tag before releasing any
//!   plaintext; a tampered ciphertext, nonce, or tag yields an error and
//!   nothing else

use aes_gcm::{
    AeadInPlace, AesGcm, KeyInit,
    aead::generic_array::{GenericArray, typenum::U16},
    aes::Aes256,
};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// Size of payload encryption keys (256 bits for AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the GCM nonce (128 bits, published as the artifact `iv` field).
pub const NONCE_SIZE: usize = 16;

/// Size of the detached GCM authentication tag (128 bits).
pub const TAG_SIZE: usize = 16;

/// AES-256-GCM parameterized over the 16-byte nonce this format uses.
type PayloadCipher = AesGcm<Aes256, U16>;

/// Symmetric key protecting one credentials payload.
///
/// Zeroized on drop so the key material does not outlive its single use.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey([u8; KEY_SIZE]);

impl PayloadKey {
    /// Generate a new random payload key.
    ///
    /// Uses the operating system's cryptographically secure random number
    /// generator.
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Generate a random 128-bit nonce.
///
/// Every encryption must use a fresh nonce; reuse under the same key breaks
/// GCM confidentiality and authenticity.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypt a payload with AES-256-GCM.
///
/// # Arguments
///
/// * `plaintext` - The payload to encrypt
/// * `key` - The payload encryption key
/// * `nonce` - A fresh 16-byte nonce
///
/// # Returns
///
/// The ciphertext (same length as the plaintext) and the detached 16-byte
/// authentication tag.
pub fn encrypt_payload(
    plaintext: &[u8],
    key: &PayloadKey,
    nonce: &[u8; NONCE_SIZE],
) -> CryptoResult<(Vec<u8>, [u8; TAG_SIZE])> {
    let cipher = PayloadCipher::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut ciphertext = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), b"", &mut ciphertext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok((ciphertext, tag.into()))
}

/// Decrypt a payload, verifying the detached authentication tag.
///
/// # Errors
///
/// Returns [`CryptoError::TagMismatch`] if the ciphertext, nonce, or tag has
/// been altered or the key is wrong. No plaintext is released on failure.
pub fn decrypt_payload(
    ciphertext: &[u8],
    key: &PayloadKey,
    nonce: &[u8; NONCE_SIZE],
    tag: &[u8; TAG_SIZE],
) -> CryptoResult<Vec<u8>> {
    let cipher = PayloadCipher::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let mut plaintext = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            b"",
            &mut plaintext,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| CryptoError::TagMismatch)?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_is_random() {
        let key1 = PayloadKey::generate();
        let key2 = PayloadKey::generate();

        // Keys should be different
        assert_ne!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn test_generate_nonce_is_random() {
        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();

        assert_ne!(nonce1, nonce2);
        assert_eq!(nonce1.len(), NONCE_SIZE);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();
        let plaintext = br#"{"url":"https://example.co","key":"public-key"}"#;

        let (ciphertext, tag) = encrypt_payload(plaintext, &key, &nonce).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());

        let decrypted = decrypt_payload(&ciphertext, &key, &nonce, &tag).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_empty_payload() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();

        let (ciphertext, tag) = encrypt_payload(b"", &key, &nonce).unwrap();
        let decrypted = decrypt_payload(&ciphertext, &key, &nonce, &tag).unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_encrypt_large_payload() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();
        let plaintext = vec![0xABu8; 1024 * 1024]; // 1 MB

        let (ciphertext, tag) = encrypt_payload(&plaintext, &key, &nonce).unwrap();
        let decrypted = decrypt_payload(&ciphertext, &key, &nonce, &tag).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key1 = PayloadKey::generate();
        let key2 = PayloadKey::generate();
        let nonce = generate_nonce();

        let (ciphertext, tag) = encrypt_payload(b"secret", &key1, &nonce).unwrap();
        let result = decrypt_payload(&ciphertext, &key2, &nonce, &tag);

        assert!(matches!(result, Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();

        let (mut ciphertext, tag) = encrypt_payload(b"secret", &key, &nonce).unwrap();
        ciphertext[0] ^= 0xFF;

        let result = decrypt_payload(&ciphertext, &key, &nonce, &tag);
        assert!(matches!(result, Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn test_tampered_tag_fails() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();

        let (ciphertext, mut tag) = encrypt_payload(b"secret", &key, &nonce).unwrap();
        tag[0] ^= 0x01;

        let result = decrypt_payload(&ciphertext, &key, &nonce, &tag);
        assert!(matches!(result, Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn test_tampered_nonce_fails() {
        let key = PayloadKey::generate();
        let nonce = generate_nonce();

        let (ciphertext, tag) = encrypt_payload(b"secret", &key, &nonce).unwrap();

        let mut other_nonce = nonce;
        other_nonce[0] ^= 0x01;

        let result = decrypt_payload(&ciphertext, &key, &other_nonce, &tag);
        assert!(matches!(result, Err(CryptoError::TagMismatch)));
    }

    #[test]
    fn test_same_plaintext_different_nonces_differ() {
        let key = PayloadKey::generate();
        let plaintext = b"same content";

        let nonce1 = generate_nonce();
        let nonce2 = generate_nonce();
        let (ciphertext1, _) = encrypt_payload(plaintext, &key, &nonce1).unwrap();
        let (ciphertext2, _) = encrypt_payload(plaintext, &key, &nonce2).unwrap();

        assert_ne!(ciphertext1, ciphertext2);
    }
}
