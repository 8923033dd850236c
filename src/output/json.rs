//! JSON report files.
//!
//! Four files are written into the report directory after a scan:
//!
//! | File | Content |
//! |---|---|
//! | `file-info.json` | every record, keyed by base name |
//! | `duplicates.json` | duplicate groups with path analysis, plus a summary |
//! | `date-info.json` | records sorted by modification time, oldest first |
//! | `size-info.json` | records sorted by size, largest first |
//!
//! An existing `file-info.json` is copied to `file-info.json.bak` before it
//! is overwritten.
//!
//! # Example
//!
//! ```no_run
//! use fastdu::duplicates::DuplicateFinder;
//! use fastdu::error::ExitCode;
//! use fastdu::output::json::JsonReports;
//! use std::path::{Path, PathBuf};
//!
//! let outcome = DuplicateFinder::with_defaults()
//!     .run(&[PathBuf::from("/media/photos")])
//!     .unwrap();
//! let groups = outcome.index.duplicate_groups();
//!
//! let reports = JsonReports::new(&outcome.index, &groups, &outcome.summary, ExitCode::Success);
//! let written = reports.write_all(Path::new("reports")).unwrap();
//! println!("{}", written.duplicates.display());
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, FileIndex, FileRecord, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::StatsSnapshot;

pub const FILE_INFO: &str = "file-info.json";
pub const DUPLICATES: &str = "duplicates.json";
pub const DATE_INFO: &str = "date-info.json";
pub const SIZE_INFO: &str = "size-info.json";

/// Summary block of `duplicates.json`.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub records: usize,
    pub duplicate_groups: usize,
    /// Copies beyond the first, summed over every group
    pub duplicate_files: usize,
    pub mismatched_groups: usize,
    pub scan_duration_ms: u64,
    pub root_errors: Vec<String>,
    pub clean: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "FD000")
    pub exit_code_name: String,
    pub stats: StatsSnapshot,
}

impl JsonSummary {
    #[must_use]
    pub fn from_scan_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            records: summary.records,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            mismatched_groups: summary.mismatched_groups,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            root_errors: summary.root_errors.iter().map(ToString::to_string).collect(),
            clean: summary.is_clean(),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
            stats: summary.stats,
        }
    }
}

/// Content of `duplicates.json`.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport<'a> {
    pub duplicates: &'a [DuplicateGroup],
    pub summary: JsonSummary,
}

/// Paths of the files written by [`JsonReports::write_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenReports {
    pub file_info: PathBuf,
    pub duplicates: PathBuf,
    pub date_info: PathBuf,
    pub size_info: PathBuf,
    /// Backup of the previous `file-info.json`, if there was one.
    pub backup: Option<PathBuf>,
}

/// Report writer over a finished scan.
pub struct JsonReports<'a> {
    index: &'a FileIndex,
    duplicates: DuplicateReport<'a>,
}

impl<'a> JsonReports<'a> {
    #[must_use]
    pub fn new(
        index: &'a FileIndex,
        groups: &'a [DuplicateGroup],
        summary: &ScanSummary,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            index,
            duplicates: DuplicateReport {
                duplicates: groups,
                summary: JsonSummary::from_scan_summary(summary, exit_code),
            },
        }
    }

    /// Write all four reports into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or any file
    /// cannot be written.
    pub fn write_all(&self, dir: &Path) -> Result<WrittenReports, JsonOutputError> {
        fs::create_dir_all(dir).map_err(|e| JsonOutputError::io(dir, e))?;

        let file_info = dir.join(FILE_INFO);
        let backup = create_backup(&file_info)?;
        write_json(&file_info, self.index)?;

        let duplicates = dir.join(DUPLICATES);
        write_json(&duplicates, &self.duplicates)?;

        let date_info = dir.join(DATE_INFO);
        write_json(&date_info, &self.index.sorted_by_date())?;

        let size_info = dir.join(SIZE_INFO);
        write_json(&size_info, &self.index.sorted_by_size())?;

        Ok(WrittenReports {
            file_info,
            duplicates,
            date_info,
            size_info,
            backup,
        })
    }

    /// `duplicates.json` content as a pretty string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn duplicates_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.duplicates)
    }
}

/// Copy an existing `path` to `<path>.bak`.
fn create_backup(path: &Path) -> Result<Option<PathBuf>, JsonOutputError> {
    if !path.is_file() {
        return Ok(None);
    }
    let mut backup = path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    fs::copy(path, &backup).map_err(|e| JsonOutputError::io(&backup, e))?;
    log::debug!("Backed up {} to {}", path.display(), backup.display());
    Ok(Some(backup))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), JsonOutputError> {
    log::info!("Writing {}", path.display());
    let file = File::create(path).map_err(|e| JsonOutputError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n").map_err(|e| JsonOutputError::io(path, e))?;
    writer.flush().map_err(|e| JsonOutputError::io(path, e))?;
    Ok(())
}

/// Read a `file-info.json` back into records.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_file_info(path: &Path) -> Result<FileIndex, JsonOutputError> {
    let data = fs::read_to_string(path).map_err(|e| JsonOutputError::io(path, e))?;
    let records: std::collections::BTreeMap<String, FileRecord> = serde_json::from_str(&data)?;
    Ok(records.into_values().collect())
}

/// Errors that can occur while writing reports.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// Serialization failed
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error while writing
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl JsonOutputError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
