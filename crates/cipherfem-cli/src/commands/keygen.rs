//! `cipherfem keygen`: oracle signing keys.

use anyhow::Result;
use cipherfem_core::crypto::Signer;
use clap::Args;
use serde::Serialize;

use super::print_json;

/// Arguments for `cipherfem keygen`.
#[derive(Debug, Args)]
pub struct KeygenArgs {
    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// A freshly generated keypair, hex-encoded.
#[derive(Debug, Serialize)]
pub struct KeypairOutput {
    /// 32-byte secret seed. Feed to `demo --oracle-secret`.
    pub secret_key: String,
    /// 32-byte public key. Pin via `oracle_public_key` in the config.
    pub public_key: String,
}

/// Generates an Ed25519 keypair and prints it.
pub fn run(args: &KeygenArgs) -> Result<()> {
    let signer = Signer::generate();
    let output = KeypairOutput {
        secret_key: hex::encode(signer.secret_bytes()),
        public_key: hex::encode(signer.verifying_key().as_bytes()),
    };

    if args.json {
        print_json(&output)
    } else {
        println!("secret_key        = {}", output.secret_key);
        println!("oracle_public_key = \"{}\"", output.public_key);
        Ok(())
    }
}
