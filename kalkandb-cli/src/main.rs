//! `KalkanDB` CLI tool for secret management and shadow-index debugging.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use kalkandb::digest::keyed_digest;
use kalkandb_key_env::EnvKeyProvider;
use rand::rngs::OsRng;
use rand::RngCore;

#[derive(Parser)]
#[command(name = "kalkandb")]
#[command(about = "KalkanDB secret management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh master key and hashing salt
    Keygen {
        /// Environment variable prefix
        #[arg(short, long, default_value = "KALKANDB")]
        prefix: String,
    },
    /// Compute the shadow-index digest of a value using the environment's salt
    Digest {
        /// The plaintext value to digest
        value: String,
        /// Environment variable prefix
        #[arg(short, long, default_value = "KALKANDB")]
        prefix: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { prefix } => {
            let mut master = [0u8; 32];
            OsRng.fill_bytes(&mut master);

            let mut salt = [0u8; 32];
            OsRng.fill_bytes(&mut salt);

            println!("export {prefix}__MASTER_KEY={}", hex::encode(master));
            println!("export {prefix}__HASHING_SALT={}", hex::encode(salt));
        }
        Commands::Digest { value, prefix } => {
            let provider = EnvKeyProvider::from_env_prefixed(&prefix)
                .with_context(|| format!("failed to load secrets from {prefix}__* variables"))?;

            let digest = keyed_digest(&provider, value.as_bytes())
                .context("digest computation failed")?;

            println!("{digest}");
        }
    }

    Ok(())
}
