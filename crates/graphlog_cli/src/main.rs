//! graphlog CLI
//!
//! Command-line tools for graphlog transaction log files.
//!
//! # Commands
//!
//! - `dump` - Print the commands of a log file
//! - `verify` - Check a log file, optionally removing a torn tail
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// graphlog transaction log tools.
#[derive(Parser)]
#[command(name = "graphlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the log file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the commands of a log file
    Dump {
        /// Maximum number of commands to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check that every entry of a log file decodes
    Verify {
        /// Cut off an incomplete trailing entry
        #[arg(short, long)]
        repair: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Dump { limit, format } => {
            let path = cli.path.ok_or("Log file path required for dump")?;
            commands::dump::run(&path, limit, &format)?;
        }
        Commands::Verify { repair } => {
            let path = cli.path.ok_or("Log file path required for verify")?;
            commands::verify::run(&path, repair)?;
        }
        Commands::Version => {
            println!("graphlog CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("graphlog core v{}", graphlog_core::VERSION);
            println!("log format v{}", graphlog_core::CURRENT_FORMAT_VERSION);
        }
    }

    Ok(())
}
