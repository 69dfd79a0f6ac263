//! Cognition row tools.
//!
//! Usage:
//!   cognition derive-key <source-id> [--timestamp <millis>]
//!   cognition ranges --begin <rfc3339> --end <rfc3339>
//!   cognition encode [--input records.jsonl]
//!   cognition decode [--input cells.jsonl] [--skip-unrecognized]
//!
//! Key layout and visibility come from `--config` (a JSON storage config),
//! with `--prefix` and `--shards` taking precedence.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use cognition_cli::{decode_cells, encode_records, format_range, load_settings};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "cognition")]
#[command(about = "Row key and cell dump tools for cognition records")]
struct Args {
    /// JSON storage config (uuid_prefix, shard_count, visibility, ...)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Row key prefix
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// Number of shard prefixes
    #[arg(long, global = true)]
    shards: Option<u32>,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the row key of a source id at a point in time
    DeriveKey {
        source_id: String,
        /// Epoch milliseconds; defaults to now
        #[arg(short, long)]
        timestamp: Option<i64>,
    },
    /// Print the per-shard scan ranges covering a time window
    Ranges {
        #[arg(long)]
        begin: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Encode JSON-lines records into JSON-lines cells
    Encode {
        /// Input file; defaults to stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Decode JSON-lines cells into JSON-lines records
    Decode {
        /// Input file; defaults to stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Skip rows with a missing or unknown type tag instead of stopping
        #[arg(long)]
        skip_unrecognized: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();

    let settings = load_settings(args.config.as_deref(), args.prefix.as_deref(), args.shards)?;
    let keys = settings.key_layout()?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match args.command {
        Command::DeriveKey {
            source_id,
            timestamp,
        } => {
            let millis = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
            writeln!(out, "{}", keys.derive(&source_id, millis))?;
        }
        Command::Ranges { begin, end } => {
            for range in keys.time_window(begin, end)? {
                writeln!(out, "{}", format_range(&range))?;
            }
        }
        Command::Encode { input } => {
            let codec = settings.codec()?;
            let count = encode_records(&codec, open_input(input.as_ref())?, &mut out)?;
            info!("Encoded {} records", count);
        }
        Command::Decode {
            input,
            skip_unrecognized,
        } => {
            let codec = settings.codec()?;
            let input = open_input(input.as_ref())?;
            let count = decode_cells(&codec, input, &mut out, skip_unrecognized)?;
            info!("Decoded {} records", count);
        }
    }

    out.flush().context("Failed to write output")?;
    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}
