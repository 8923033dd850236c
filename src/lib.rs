//! fastdu - parallel disk usage and duplicate-name finder
//!
//! Walks one or more directory trees with a bounded number of simultaneous
//! directory listings, totals file sizes per directory, and indexes every
//! file by base name so that copies of the same media file scattered over
//! several volumes can be found and reorganised.

pub mod accounting;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod replicate;
pub mod scanner;
pub mod store;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::{Cli, Commands, ReplicateArgs, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderConfig, ScanOutcome};
use crate::error::ExitCode;
use crate::output::{text, JsonReports};
use crate::progress::Progress;
use crate::replicate::{Replicator, DEFAULT_WORKERS};
use crate::store::MediaStore;

/// Run one invocation and return its exit code.
///
/// # Errors
///
/// Returns an error for anything that stops the run: bad configuration, a
/// fatal scan error, or a report or database that cannot be written.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let Cli {
        verbose,
        quiet,
        config: config_path,
        command,
        ..
    } = cli;

    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;
    log::debug!("Loaded configuration: {config:?}");

    match command {
        Commands::Scan(args) => run_scan(config, &args, verbose, quiet),
        Commands::Replicate(args) => run_replicate(&config, &args),
    }
}

fn run_scan(config: Config, args: &ScanArgs, verbose: u8, quiet: bool) -> Result<ExitCode> {
    let config = config
        .merge(args)
        .and_then(|c| c.merge(args.switches()))
        .context("Invalid command-line options")?;

    let mut finder_config = FinderConfig::default()
        .with_walker_config(config.walker_config()?)
        .with_print_interval(config.print_interval());
    if finder_config.print_interval.is_some() && !quiet {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(quiet)));
    }

    let outcome = DuplicateFinder::new(finder_config)
        .run(&args.paths)
        .context("Scan aborted")?;

    text::print_ranking(&outcome.totals, config.top, config.summary)
        .context("Failed to print ranking")?;

    let exit_code = exit_code_for(&outcome);
    let groups = outcome.index.duplicate_groups();

    let reports = JsonReports::new(&outcome.index, &groups, &outcome.summary, exit_code);
    let written = reports
        .write_all(&config.report_dir)
        .context("Failed to write JSON reports")?;
    log::debug!("Reports written: {written:?}");

    if config.write_database {
        let mut store = MediaStore::open(&config.database)
            .with_context(|| format!("Failed to open database {}", config.database.display()))?;
        store
            .write_records(&outcome.index)
            .context("Failed to store media records")?;
        store
            .write_duplicates(&outcome.index)
            .context("Failed to store duplicate paths")?;
    }

    if !quiet {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        if verbose > 0 {
            text::write_duplicates(&mut out, &groups)?;
        }
        text::write_summary(&mut out, &outcome.summary, &outcome.totals)?;
        out.flush()?;
    }

    Ok(exit_code)
}

fn exit_code_for(outcome: &ScanOutcome) -> ExitCode {
    if !outcome.summary.is_clean() {
        ExitCode::PartialSuccess
    } else if outcome.summary.duplicate_groups == 0 {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn run_replicate(config: &Config, args: &ReplicateArgs) -> Result<ExitCode> {
    let database = args.database.as_ref().unwrap_or(&config.database);
    if !database.is_file() {
        bail!("Database not found: {}", database.display());
    }
    let store = MediaStore::open(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;

    let jobs = replicate::load_jobs(&store, args.min_size, &args.prefix)?;
    let workers = usize::try_from(args.workers).unwrap_or(DEFAULT_WORKERS);
    let report = Replicator::new()
        .with_workers(workers)
        .with_dry_run(args.dry_run)
        .run(&jobs)?;

    if args.dry_run {
        for job in &jobs {
            println!("{job}");
        }
    }
    for (path, error) in &report.failures {
        eprintln!("{}: {error}", path.display());
    }
    println!("{}", report.summary());

    Ok(if report.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    })
}
