//! RW CLI - Documentation content preferences.
//!
//! Provides commands for:
//! - `prefs check`: Validate every page's preference declarations
//! - `prefs defaults`: Print a page's default selection
//! - `prefs payload`: Emit a page's chooser container and client payload

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::PrefsCommand;
use output::Output;

/// RW - Documentation content preferences.
#[derive(Parser)]
#[command(name = "rw", version, about)]
struct Cli {
    /// Enable verbose output (show compilation logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Content preference commands.
    #[command(subcommand)]
    Prefs(PrefsCommand),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Prefs(cmd) => cmd.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
