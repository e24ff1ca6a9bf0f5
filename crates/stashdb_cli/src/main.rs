//! stashdb CLI
//!
//! Command-line tools for looking into and editing stashdb storages.
//!
//! # Commands
//!
//! - `inspect` - Display storage kind, keys and chunk layout
//! - `get` - Print the value at a key or dotted path
//! - `set` - Write a value at a key or dotted path and save
//! - `remove` - Delete a key from the storage
//! - `dump` - Print every stored key and value

mod commands;
mod target;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use target::{FormatArg, Target};
use tracing_subscriber::EnvFilter;

/// stashdb command-line storage tools.
#[derive(Parser)]
#[command(name = "stash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Flat file backing the storage
    #[arg(global = true, long, conflicts_with = "sqlite")]
    file: Option<PathBuf>,

    /// File format (detected from the extension if omitted)
    #[arg(global = true, long, value_enum, requires = "file")]
    format: Option<FormatArg>,

    /// SQLite database backing the storage
    #[arg(global = true, long)]
    sqlite: Option<PathBuf>,

    /// Values are zlib-compressed (relational storages only)
    #[arg(global = true, long)]
    compress: bool,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display storage kind, keys and chunk layout
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Print the value at a key or dotted path
    Get {
        /// Key or dotted path (`spawn.x`)
        path: String,
    },

    /// Write a value at a key or dotted path and save
    Set {
        /// Key or dotted path (`spawn.x`)
        path: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,
    },

    /// Delete a key from the storage
    Remove {
        /// Key to delete
        key: String,
    },

    /// Print every stored key and value
    Dump {
        /// Output format (json, yaml)
        #[arg(short, long, default_value = "json")]
        output: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("stashdb CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("stashdb Core v{}", stashdb_core::VERSION);
        return Ok(());
    }

    let target = Target::from_args(cli.file, cli.format, cli.sqlite, cli.compress)?;
    let storage = target.open()?;

    match cli.command {
        Commands::Inspect { output } => commands::inspect::run(&storage, &target, &output).await?,
        Commands::Get { path } => commands::get::run(&storage, &path).await?,
        Commands::Set { path, value } => commands::set::run(&storage, &path, &value).await?,
        Commands::Remove { key } => commands::remove::run(&storage, &key).await?,
        Commands::Dump { output } => commands::dump::run(&storage, &output).await?,
        Commands::Version => {}
    }

    Ok(())
}
