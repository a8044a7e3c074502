//! Keyward CLI - keysets, wallet addresses, and scripted wallet demos
//!
//! # Quick Start
//!
//! ```bash
//! # Hash a keyset manifest and check it against the configured thresholds
//! keyward keyset hash keys.json
//!
//! # Derive the counterfactual wallet address for it
//! keyward keyset address keys.json
//!
//! # Walk through batched execution and guardian recovery
//! keyward demo batch
//! keyward demo recovery
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use keyward_types::Address;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod display;

use commands::{demo, keyset};
use config::{KeywardConfig, LoggingConfig};

/// Keyward CLI - authorization and recovery for smart-contract wallets
#[derive(Parser)]
#[command(name = "keyward")]
#[command(author = "Keyward Contributors")]
#[command(version)]
#[command(about = "Keyset hashing, wallet address derivation, and wallet demos", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (merged over config/default and config/local)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect keyset manifests
    Keyset {
        #[command(subcommand)]
        action: KeysetCommands,
    },

    /// Run scripted demos on an in-memory chain
    Demo {
        #[command(subcommand)]
        demo_type: DemoCommands,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
enum KeysetCommands {
    /// Print the keyset hash and per-role weight
    Hash {
        /// JSON keyset manifest
        manifest: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the counterfactual wallet address
    Address {
        /// JSON keyset manifest
        manifest: PathBuf,

        /// Factory address (defaults to the configured one)
        #[arg(long)]
        factory: Option<Address>,

        /// Implementation address (defaults to the configured one)
        #[arg(long)]
        implementation: Option<Address>,
    },
}

#[derive(Subcommand)]
enum DemoCommands {
    /// Batched transfers, replay protection, session keys, owner threshold
    Batch,

    /// Guardian lock, owner cancel, timelocked and immediate recovery
    Recovery,
}

fn init_logging(config: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.format == "json" {
        subscriber
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        subscriber
            .with(fmt::layer().pretty().with_target(true))
            .init();
    }
}

fn print_banner() {
    println!();
    println!("{}", "╔══════════════════════════════════════════════════════╗".bright_cyan());
    println!(
        "{}{}{}",
        "║  ".bright_cyan(),
        "Keyward".bright_white().bold(),
        " - wallet authorization and recovery         ║".bright_cyan()
    );
    println!("{}", "╚══════════════════════════════════════════════════════╝".bright_cyan());
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = KeywardConfig::load(cli.config.as_deref())?;
    init_logging(&config.logging);
    debug!(
        chain_id = config.wallet.chain_id,
        factory = %config.factory.address,
        implementation = %config.factory.implementation,
        "configuration loaded"
    );

    match cli.command {
        Commands::Keyset { action } => match action {
            KeysetCommands::Hash { manifest, json } => {
                keyset::show_hash(&manifest, &config, json)?;
            }
            KeysetCommands::Address {
                manifest,
                factory,
                implementation,
            } => {
                keyset::show_address(&manifest, &config, factory, implementation)?;
            }
        },

        Commands::Demo { demo_type } => {
            print_banner();
            match demo_type {
                DemoCommands::Batch => demo::run_batch_demo(&config)?,
                DemoCommands::Recovery => demo::run_recovery_demo(&config)?,
            }
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
