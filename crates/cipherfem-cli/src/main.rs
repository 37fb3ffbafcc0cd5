//! cipherfem - confidential FEA ledger driver
//!
//! Runs the disclosure ledger against the in-process oracle and manages
//! ledger configuration and oracle keys.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

/// cipherfem - confidential FEA ledger driver
#[derive(Parser, Debug)]
#[command(name = "cipherfem")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to ledger configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit records, decrypt them through the software oracle and replay
    /// a callback
    Demo(commands::demo::DemoArgs),

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate an oracle signing keypair
    Keygen(commands::keygen::KeygenArgs),
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Validate a configuration file
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable.
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Demo(args) => commands::demo::run(&args, config_path),
        Commands::Config(ConfigCommands::Show) => commands::config::show(config_path),
        Commands::Config(ConfigCommands::Check) => commands::config::check(config_path),
        Commands::Keygen(args) => commands::keygen::run(&args),
    }
}
