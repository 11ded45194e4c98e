//! One-shot packaging of backend credentials.
//!
//! A packaging run is a pure function from credentials to outputs: it
//! generates a fresh RSA wrapping keypair and a fresh payload key, seals the
//! credentials, and returns the artifact together with the PKCS#8 private
//! key PEM. Nothing is persisted here; see [`crate::emit`] for file output.
//!
//! The public key is used for exactly one wrap and dropped. The private key
//! is the only way back to the credentials, and it ships inside the
//! consuming application, so possession of the deployed bundle is enough to
//! recover them. This obfuscates credentials at rest and in transit, it does
//! not protect them from a bundle holder.

use std::path::Path;

use tracing::{debug, info};
use zeroize::Zeroizing;

use sealbox_crypto::{
    BackendCredentials, DEFAULT_MODULUS_BITS, SealedArtifact, generate_keypair,
    private_key_from_pem, private_key_to_pem, seal, unseal,
};

use crate::emit;
use crate::error::PackageResult;

/// Configuration for a packaging run.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Backend project URL to seal.
    pub url: String,
    /// Publishable API key to seal.
    pub api_key: String,
    /// RSA modulus size in bits for the wrapping keypair.
    pub modulus_bits: usize,
}

impl PackageConfig {
    /// Create a config with the default 4096-bit wrapping keypair.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            modulus_bits: DEFAULT_MODULUS_BITS,
        }
    }

    /// Override the RSA modulus size.
    pub fn with_modulus_bits(mut self, bits: usize) -> Self {
        self.modulus_bits = bits;
        self
    }
}

/// Everything a packaging run produces.
pub struct PackageOutput {
    /// The publishable artifact.
    pub artifact: SealedArtifact,
    /// PKCS#8 PEM of the private key, zeroized on drop.
    pub private_key_pem: Zeroizing<String>,
}

/// Seal credentials into a publishable artifact.
///
/// Generates the wrapping keypair and the payload key, so every run produces
/// a completely fresh envelope even for identical credentials.
pub fn package(config: &PackageConfig) -> PackageResult<PackageOutput> {
    let credentials = BackendCredentials::new(&config.url, &config.api_key);

    debug!(modulus_bits = config.modulus_bits, "Generating wrapping keypair");
    let (private, public) = generate_keypair(config.modulus_bits)?;

    let artifact = seal(&credentials, &public)?;
    let private_key_pem = private_key_to_pem(&private)?;

    info!(url = %config.url, "Sealed backend credentials");

    Ok(PackageOutput {
        artifact,
        private_key_pem,
    })
}

/// Unseal an emitted artifact with its key module and return the credentials.
///
/// Reads both files back the way a consuming application would, so a
/// successful verify means the emitted pair actually works together.
pub fn verify(artifact_path: &Path, key_module_path: &Path) -> PackageResult<BackendCredentials> {
    let artifact = emit::load_artifact(artifact_path)?;
    let pem = emit::load_key_module(key_module_path)?;
    let private = private_key_from_pem(&pem)?;

    let credentials = unseal(&artifact, &private)?;
    Ok(credentials)
}
