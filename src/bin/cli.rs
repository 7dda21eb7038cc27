//! StrataKV CLI
//!
//! Opens a data directory, runs one command and exits.
//!
//! Writes stay in the active log between invocations (they are durable
//! there and replayed on the next open); `flush` moves them into an SSTable.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use stratakv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// StrataKV CLI
#[derive(Parser, Debug)]
#[command(name = "stratakv-cli")]
#[command(about = "Command-line access to a StrataKV data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./stratakv_data")]
    data_dir: String,

    /// Store values longer than this many bytes in the value log
    #[arg(short = 't', long)]
    value_log_threshold: Option<usize>,

    /// MemTable entry limit before rotation
    #[arg(short = 'm', long, default_value = "10000")]
    memtable_entries: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Put {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Write the MemTable to an SSTable and wait for compaction
    Flush,

    /// Print table counts per level
    Stats,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,stratakv=info"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    tracing::debug!("StrataKV CLI v{}", stratakv::VERSION);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> stratakv::Result<()> {
    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .memtable_entry_limit(args.memtable_entries);
    if let Some(threshold) = args.value_log_threshold {
        builder = builder.value_log_threshold(threshold);
    }

    let engine = Engine::open(builder.build())?;

    match args.command {
        Commands::Get { key } => match engine.get(key.as_bytes())? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => println!("(nil)"),
        },
        Commands::Put { key, value } => {
            engine.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Del { key } => {
            engine.delete(key.as_bytes())?;
            println!("OK");
        }
        Commands::Flush => {
            engine.flush()?;
            engine.sync_background()?;
            println!("OK");
        }
        Commands::Stats => {
            let stats = engine.stats();
            println!("memtable entries:    {}", stats.memtable_entries);
            println!("immutable memtables: {}", stats.immutable_memtables);
            for (level, (tables, compactions)) in stats
                .tables_per_level
                .iter()
                .zip(&stats.compactions_per_level)
                .enumerate()
            {
                println!("L{}: {} tables, {} compactions", level, tables, compactions);
            }
        }
    }

    engine.sync_background()?;
    engine.health()
}
