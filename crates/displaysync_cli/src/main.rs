//! displaysync CLI
//!
//! Command-line access to display settings through a [`SyncEngine`].
//!
//! The configuration service is simulated in process; its state is kept in
//! a CBOR file between invocations so that writes persist.
//!
//! # Commands
//!
//! - `list` - List the known settings and their remote keys
//! - `show` - Show every setting's current value
//! - `get` - Read one setting
//! - `set` - Write one setting
//! - `max-brightness` - Query the number of brightness levels
//! - `orientation` - Read or write the orientation lock
//!
//! [`SyncEngine`]: displaysync_core::SyncEngine

mod commands;

use clap::{Parser, Subcommand};
use commands::session::SessionOptions;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Display settings command-line tool.
#[derive(Parser)]
#[command(name = "displayctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File holding the configuration service state
    #[arg(global = true, long, default_value = "displaysync-service.cbor")]
    state: PathBuf,

    /// File holding local settings
    #[arg(global = true, long, default_value = "displaysync-local.cbor")]
    store: PathBuf,

    /// Reply timeout for service queries, in milliseconds
    #[arg(global = true, long, default_value = "25000")]
    fetch_timeout: u64,

    /// Attempts per key during the initial fetch
    #[arg(global = true, long, default_value = "3")]
    retries: u32,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the known settings and their remote keys
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show every setting's current value
    Show {
        /// Also show engine counters
        #[arg(short, long)]
        stats: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Read one setting
    Get {
        /// Setting name, as printed by `list`
        setting: String,
    },

    /// Write one setting
    Set {
        /// Setting name, as printed by `list`
        setting: String,

        /// New value (integer, true/false, or an enumeration name)
        value: String,
    },

    /// Query the number of brightness levels
    MaxBrightness,

    /// Read or write the orientation lock
    Orientation {
        /// New value; prints the current one when omitted
        value: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = SessionOptions {
        state: cli.state,
        store: cli.store,
        fetch_timeout: Duration::from_millis(cli.fetch_timeout),
        retries: cli.retries,
    };

    match cli.command {
        Commands::List { format } => commands::list::run(&format)?,
        Commands::Show { stats, format } => commands::show::run(&options, stats, &format)?,
        Commands::Get { setting } => commands::get::run(&options, &setting)?,
        Commands::Set { setting, value } => commands::set::run(&options, &setting, &value)?,
        Commands::MaxBrightness => commands::max_brightness::run(&options)?,
        Commands::Orientation { value } => commands::orientation::run(&options, value.as_deref())?,
        Commands::Version => {
            println!("displayctl v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
