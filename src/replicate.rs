//! Reorganise stored media into a date-based tree.
//!
//! Rows are read back from the [`MediaStore`], one copy is planned per row
//! into `PREFIX/YYYY/MM/DD/<name>` using the record's modification time, and
//! the copies run on a bounded rayon pool. A failed copy is recorded in the
//! [`ReplicateReport`]; the remaining copies still run.
//!
//! # Example
//!
//! ```no_run
//! use fastdu::replicate::{load_jobs, Replicator, DEFAULT_MIN_SIZE};
//! use fastdu::store::MediaStore;
//! use std::path::Path;
//!
//! let store = MediaStore::open(Path::new("media.db")).unwrap();
//! let jobs = load_jobs(&store, DEFAULT_MIN_SIZE, Path::new("replicated")).unwrap();
//! let report = Replicator::new().run(&jobs).unwrap();
//! println!("{}", report.summary());
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use rayon::prelude::*;
use thiserror::Error;

use crate::store::{MediaRow, MediaStore, StoreError};

/// Rows at or below this many bytes are not replicated.
pub const DEFAULT_MIN_SIZE: u64 = 20_000;

/// Default size of the copy pool.
pub const DEFAULT_WORKERS: usize = 10;

/// Path fragment marking the preferred source copy.
pub const ORIGINALS_MARKER: &str = "Originals";

/// Error type for replication.
#[derive(Debug, Error)]
pub enum ReplicateError {
    /// Reading rows from the store failed.
    #[error("failed to read media rows: {0}")]
    Store(#[from] StoreError),

    /// The destination directory could not be created.
    #[error("failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Copying one file failed.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The copy pool could not be built.
    #[error("failed to build copy pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// One planned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    pub name: String,
    pub size: u64,
    pub source: PathBuf,
    /// `PREFIX/YYYY/MM/DD`
    pub dest_dir: PathBuf,
    /// `dest_dir/<name>`
    pub destination: PathBuf,
}

impl CopyJob {
    /// Plan the copy for `row`, or `None` when it has no occurrences.
    #[must_use]
    pub fn plan(row: &MediaRow, prefix: &Path) -> Option<Self> {
        let source = row
            .occurrences
            .iter()
            .find(|o| o.path.contains(ORIGINALS_MARKER))
            .or_else(|| row.occurrences.first())?;

        let date = row.datetime;
        let dest_dir = prefix
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{:02}", date.day()));
        let destination = dest_dir.join(&row.name);

        Some(Self {
            name: row.name.clone(),
            size: source.size,
            source: PathBuf::from(&source.path),
            dest_dir,
            destination,
        })
    }

    /// Create the destination directory and copy the file.
    ///
    /// # Errors
    ///
    /// Returns an error if either step fails.
    pub fn execute(&self) -> Result<u64, ReplicateError> {
        fs::create_dir_all(&self.dest_dir).map_err(|source| ReplicateError::CreateDir {
            path: self.dest_dir.clone(),
            source,
        })?;
        fs::copy(&self.source, &self.destination).map_err(|source| ReplicateError::Copy {
            from: self.source.clone(),
            to: self.destination.clone(),
            source,
        })
    }
}

impl std::fmt::Display for CopyJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source.display(), self.destination.display())
    }
}

/// Plan one copy per row. Rows without occurrences are skipped.
#[must_use]
pub fn plan_copies(rows: &[MediaRow], prefix: &Path) -> Vec<CopyJob> {
    rows.iter()
        .filter_map(|row| {
            let job = CopyJob::plan(row, prefix);
            if job.is_none() {
                log::warn!("No source path stored for {}", row.name);
            }
            job
        })
        .collect()
}

/// Load rows larger than `min_size` from `store` and plan their copies.
///
/// # Errors
///
/// Returns an error if the store query fails.
pub fn load_jobs(
    store: &MediaStore,
    min_size: u64,
    prefix: &Path,
) -> Result<Vec<CopyJob>, ReplicateError> {
    let rows = store.load_media(min_size)?;
    log::info!("{} media rows larger than {min_size} bytes", rows.len());
    Ok(plan_copies(&rows, prefix))
}

/// Outcome of a replication run.
#[derive(Debug, Clone, Default)]
pub struct ReplicateReport {
    /// Number of planned copies.
    pub planned: usize,
    /// Destinations written.
    pub copied: Vec<PathBuf>,
    /// Failed copies with their errors.
    pub failures: Vec<(PathBuf, String)>,
    pub bytes_copied: u64,
    pub dry_run: bool,
}

impl ReplicateReport {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.copied.len()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.dry_run {
            return format!("Planned {} copies (dry run)", self.planned);
        }
        let bytes = bytesize::ByteSize(self.bytes_copied);
        if self.all_succeeded() {
            format!("Copied {} file(s), {bytes}", self.success_count())
        } else {
            format!(
                "Copied {} file(s), {} failed, {bytes}",
                self.success_count(),
                self.failure_count()
            )
        }
    }
}

/// Runs copy jobs on a bounded pool.
#[derive(Debug, Clone)]
pub struct Replicator {
    workers: usize,
    dry_run: bool,
}

impl Default for Replicator {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            dry_run: false,
        }
    }
}

impl Replicator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pool size (at least 1).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute `jobs`.
    ///
    /// # Errors
    ///
    /// Only pool construction fails the whole run; per-file failures are
    /// collected in the report.
    pub fn run(&self, jobs: &[CopyJob]) -> Result<ReplicateReport, ReplicateError> {
        let mut report = ReplicateReport {
            planned: jobs.len(),
            dry_run: self.dry_run,
            ..ReplicateReport::default()
        };
        if self.dry_run {
            for job in jobs {
                log::info!("Would copy {job}");
            }
            return Ok(report);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("fastdu-copy-{i}"))
            .build()?;

        let results: Vec<(&CopyJob, Result<u64, ReplicateError>)> =
            pool.install(|| jobs.par_iter().map(|job| (job, job.execute())).collect());

        for (job, result) in results {
            match result {
                Ok(bytes) => {
                    log::debug!("Copied {job}");
                    report.bytes_copied += bytes;
                    report.copied.push(job.destination.clone());
                }
                Err(e) => {
                    log::warn!("{e}");
                    report.failures.push((job.source.clone(), e.to_string()));
                }
            }
        }

        log::info!("{}", report.summary());
        Ok(report)
    }
}
