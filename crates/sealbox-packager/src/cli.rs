//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "sealbox-packager",
    about = "Seals backend credentials into a publishable encrypted artifact"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate a fresh wrapping keypair and seal credentials into an artifact
    Seal {
        /// Backend project URL to seal
        #[arg(long)]
        url: String,
        /// Publishable API key to seal
        #[arg(long)]
        api_key: String,
        /// Directory for the public artifact JSON
        #[arg(long, default_value = "public")]
        out_dir: PathBuf,
        /// Directory for the generated private key module
        #[arg(long, default_value = "src/keys")]
        key_dir: PathBuf,
        /// RSA modulus size in bits for the wrapping keypair
        #[arg(long, default_value_t = sealbox_crypto::DEFAULT_MODULUS_BITS)]
        modulus_bits: usize,
    },
    /// Unseal an emitted artifact with its key module and report the result
    Verify {
        /// Path to the artifact JSON
        #[arg(long)]
        artifact: PathBuf,
        /// Path to the generated private key module
        #[arg(long)]
        key_module: PathBuf,
    },
}
