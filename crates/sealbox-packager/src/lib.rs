//! # Sealbox Packager
//!
//! Offline one-shot tool that seals backend credentials for publication.
//!
//! A run generates a fresh RSA wrapping keypair and a fresh AES-256 payload
//! key, encrypts the credentials JSON, and writes two files:
//!
//! - `public/encrypted-credentials.json`: the artifact served alongside the
//!   application bundle (`data`, `iv`, `authTag`, `encryptedKey`, all base64)
//! - `src/keys/private_key.rs`: a generated module embedding the PKCS#8
//!   private key PEM, compiled into the consuming application
//!
//! The `verify` subcommand reads both files back and unseals them the way
//! the runtime would.

pub mod cli;
pub mod emit;
pub mod error;
pub mod package;

// Re-exports
pub use emit::{ARTIFACT_FILENAME, EmittedPaths, KEY_MODULE_FILENAME, emit};
pub use error::{PackageError, PackageResult};
pub use package::{PackageConfig, PackageOutput, package, verify};
