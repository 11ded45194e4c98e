use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sealbox_packager::cli::{Cli, Command};
use sealbox_packager::emit;
use sealbox_packager::package::{PackageConfig, package, verify};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Seal {
            url,
            api_key,
            out_dir,
            key_dir,
            modulus_bits,
        } => {
            let config = PackageConfig::new(url, api_key).with_modulus_bits(modulus_bits);
            let output = package(&config)?;
            let paths = emit::emit(&output, &out_dir, &key_dir)?;

            warn!(
                path = %paths.key_module_path.display(),
                "The private key module recovers the sealed credentials; anyone \
                 holding the built application can do the same. Keep it out of \
                 version control."
            );
            println!(
                "Sealed credentials written to {} (key module: {})",
                paths.artifact_path.display(),
                paths.key_module_path.display()
            );
        }
        Command::Verify {
            artifact,
            key_module,
        } => {
            let credentials = verify(&artifact, &key_module)?;
            info!(url = %credentials.url, "Artifact unsealed successfully");
            println!("Artifact verified: credentials for {} recovered", credentials.url);
        }
    }

    Ok(())
}
