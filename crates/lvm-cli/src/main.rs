//! # lvm
//!
//! Developer harness for the LedgerVM interpreter.
//!
//! ## Usage
//!
//! ```bash
//! # Return the word 20
//! lvm run --code 60146000526020600060f3
//!
//! # Call an account seeded from a state file, with call data
//! lvm run --genesis state.json --caller 0x64 --callee 0x65 --input 0x693200ce...
//!
//! # Print the default VM configuration as JSON
//! lvm default-config > vm.json
//! lvm run --config vm.json --code ...
//! ```

use clap::{Parser, Subcommand};
use lvm_evm::VmConfig;

use crate::error::CliError;

mod commands;
mod error;
mod genesis;
mod output;

/// LedgerVM developer harness
#[derive(Parser, Debug)]
#[command(name = "lvm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Log level, used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// CLI commands
#[derive(Debug, Subcommand)]
enum Commands {
    /// Run bytecode as a top-level call
    Run(commands::run::RunArgs),
    /// Print the default VM configuration
    DefaultConfig,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Run(args) => args.execute(cli.json),
        Commands::DefaultConfig => {
            println!("{}", serde_json::to_string_pretty(&VmConfig::default())?);
            Ok(())
        }
    };

    if let Err(e) = result {
        // execution failures are already part of the printed report
        if matches!(e, CliError::Execution(_)) {
            std::process::exit(1);
        }
        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "error": e.to_string(),
                    "success": false
                })
            );
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}
