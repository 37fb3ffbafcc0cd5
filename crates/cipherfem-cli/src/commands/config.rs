//! `cipherfem config` subcommands.

use std::path::Path;

use anyhow::{Context, Result, bail};

use super::load_config;

/// Prints the effective configuration.
pub fn show(path: Option<&Path>) -> Result<()> {
    let config = load_config(path)?;
    let rendered = config.to_toml().context("failed to render config")?;
    print!("{rendered}");
    Ok(())
}

/// Validates a configuration file and reports a one-line summary.
pub fn check(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        bail!("no config file given (use --config <PATH>)");
    };
    let config = load_config(Some(path))?;

    let ttl = config
        .request_ttl()
        .map_or_else(|| "never".to_string(), |ms| format!("{ms}ms"));
    let key = if config.oracle_public_key.is_some() {
        "pinned"
    } else {
        "unpinned"
    };
    println!(
        "{}: ok (request expiry: {ttl}, compute stages: {}, oracle key: {key})",
        path.display(),
        config.trusted_compute_stages.len(),
    );
    Ok(())
}
