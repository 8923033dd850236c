//! Command-line interface definitions for fastdu.
//!
//! # Example
//!
//! ```bash
//! # Top 10 directories by size, duplicate reports in the current directory
//! fastdu scan /mnt/photos /mnt/backup
//!
//! # Top-level summary, everything listed, running totals every 5 seconds
//! fastdu scan -s -t -1 -f 5 /mnt/photos
//!
//! # Copy images and videos above 1MB into a dated tree
//! fastdu replicate --db media.db -p /mnt/sorted --min-size 1MB
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

/// Concurrent disk-usage scanner and media duplicate finder.
///
/// fastdu walks one or more directory trees, totals disk usage per
/// directory, and groups media files that share a base name into duplicate
/// candidate sets annotated with their common path.
#[derive(Debug, Parser)]
#[command(name = "fastdu")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Walk directories, rank disk usage and report same-named media files
    Scan(ScanArgs),
    /// Copy stored images and videos into a YYYY/MM/DD tree
    Replicate(ReplicateArgs),
}

/// Arguments for `scan`.
///
/// Unset options fall back to the config file and `FASTDU_*` variables;
/// only flags given on the command line are serialized as overrides.
#[derive(Debug, Clone, Default, Args, Serialize)]
pub struct ScanArgs {
    /// Files or directories to scan
    #[arg(required = true, value_name = "PATH")]
    #[serde(skip)]
    pub paths: Vec<PathBuf>,

    /// Number of entries in the ranked listing (-1 for all)
    #[arg(short = 't', long, value_name = "N", allow_negative_numbers = true)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<i64>,

    /// Concurrency factor: simultaneous directory listings
    #[arg(short = 'c', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u64>,

    /// Traversal threads (0 = same as the concurrency factor)
    #[arg(long, value_name = "N")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Rank top-level directories instead of every directory
    #[arg(short = 's', long)]
    #[serde(skip)]
    pub summary: bool,

    /// Print running totals every N seconds (0 disables)
    #[arg(short = 'f', long = "print-interval", value_name = "SECONDS")]
    #[serde(rename = "print_interval_secs", skip_serializing_if = "Option::is_none")]
    pub print_interval: Option<u64>,

    /// Skip paths matching this regex (repeatable; replaces the defaults)
    #[arg(long = "skip", value_name = "REGEX")]
    #[serde(rename = "skip_patterns", skip_serializing_if = "Vec::is_empty")]
    pub skip: Vec<String>,

    /// Record every file, not just images, audio and video
    #[arg(long)]
    #[serde(skip)]
    pub all_files: bool,

    /// Directory for the JSON reports
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_dir: Option<PathBuf>,

    /// SQLite database path
    #[arg(long = "db", value_name = "PATH")]
    #[serde(rename = "database", skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,

    /// Do not write the database
    #[arg(long)]
    #[serde(skip)]
    pub no_db: bool,
}

/// Arguments for `replicate`.
#[derive(Debug, Clone, Args)]
pub struct ReplicateArgs {
    /// SQLite database written by `scan`
    #[arg(long = "db", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Destination root for the dated tree
    #[arg(short = 'p', long, value_name = "DIR", default_value = "replicated")]
    pub prefix: PathBuf,

    /// Only copy files larger than this (e.g. 20KB, 1MiB)
    #[arg(long, value_name = "SIZE", default_value = "20000", value_parser = parse_size)]
    pub min_size: u64,

    /// Concurrent copy workers
    #[arg(long, value_name = "N", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: u64,

    /// Print the copy plan without copying
    #[arg(long)]
    pub dry_run: bool,
}

impl ScanArgs {
    /// Overrides carried by bare boolean flags.
    ///
    /// Bare flags only ever flip a setting away from its default.
    #[must_use]
    pub fn switches(&self) -> ScanSwitches {
        ScanSwitches {
            summary: self.summary.then_some(true),
            media_only: self.all_files.then_some(false),
            write_database: self.no_db.then_some(false),
        }
    }
}

/// Boolean flags given on the command line.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanSwitches {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_database: Option<bool>,
}

/// Parse a human-readable size string into bytes.
///
/// Decimal suffixes (KB, MB, GB, TB) use powers of 1000, binary suffixes
/// (KiB, MiB, GiB, TiB) powers of 1024. Case-insensitive.
///
/// # Errors
///
/// Returns a message for empty input, a bad number or an unknown suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
