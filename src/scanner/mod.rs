//! Scanner module: concurrent tree traversal and per-file classification.
//!
//! This module provides:
//! - [`ConcurrencyGate`]: bounds simultaneous directory listings
//! - [`Walker`]: one rayon task per directory, feeding the registry and the
//!   size stream
//! - [`Classifier`] / [`MagicClassifier`]: signature-based media typing
//! - [`ScanStats`]: counters shared by every traversal task
//!
//! # Example
//!
//! ```no_run
//! use fastdu::scanner::{SkipPatterns, WalkerConfig};
//!
//! let config = WalkerConfig::default()
//!     .with_concurrency(8)
//!     .with_skip_patterns(SkipPatterns::new(["/Thumbs/", "@eaDir", r"\.lrdata/"]).unwrap());
//! assert_eq!(config.concurrency, 8);
//! ```

pub mod classify;
pub mod gate;
pub mod path_utils;
pub mod stats;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};

use regex::RegexSet;

pub use classify::{
    Classification, Classifier, ExifData, MagicClassifier, MediaKind, MediaMetadata, Probe,
    HEADER_LEN,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use stats::{ScanStats, StatsSnapshot};
pub use walker::Walker;

/// Default concurrency factor (simultaneous directory listings).
pub const DEFAULT_CONCURRENCY: usize = 20;

/// Regex rules for paths that never become file records.
///
/// Matched against the full file path with `/` separators on every
/// platform. A match is counted as skipped before any classification.
#[derive(Debug, Clone)]
pub struct SkipPatterns {
    patterns: Vec<String>,
    set: RegexSet,
}

impl SkipPatterns {
    /// Thumbnail caches written by Windows Explorer and Synology DSM.
    pub const DEFAULT: &'static [&'static str] = &["/Thumbs/", "@eaDir"];

    /// Compile a set of patterns.
    ///
    /// # Errors
    ///
    /// Returns the regex error for the first invalid pattern.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_string())
            .collect();
        let set = RegexSet::new(&patterns)?;
        Ok(Self { patterns, set })
    }

    /// A set that matches nothing.
    #[must_use]
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
            set: RegexSet::empty(),
        }
    }

    /// Source patterns, in configuration order.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `path` matches any pattern.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        if self.set.is_empty() {
            return false;
        }
        if cfg!(windows) {
            self.set.is_match(&path.replace('\\', "/"))
        } else {
            self.set.is_match(path)
        }
    }
}

impl Default for SkipPatterns {
    fn default() -> Self {
        Self::new(Self::DEFAULT).unwrap_or_else(|_| Self::none())
    }
}

/// Configuration for a traversal.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Permits in the [`ConcurrencyGate`]; fixed for the run.
    pub concurrency: usize,

    /// Traversal pool size. `0` means "same as `concurrency`".
    pub threads: usize,

    /// Paths matching these are excluded before classification.
    pub skip_patterns: SkipPatterns,

    /// Only image/audio/video files become records when set.
    pub media_only: bool,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            threads: 0,
            skip_patterns: SkipPatterns::default(),
            media_only: true,
        }
    }
}

impl WalkerConfig {
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn with_skip_patterns(mut self, patterns: SkipPatterns) -> Self {
        self.skip_patterns = patterns;
        self
    }

    #[must_use]
    pub fn with_media_only(mut self, media_only: bool) -> Self {
        self.media_only = media_only;
        self
    }

    /// Number of rayon threads the walker will run on.
    #[must_use]
    pub fn effective_threads(&self) -> usize {
        if self.threads == 0 {
            self.concurrency.max(1)
        } else {
            self.threads
        }
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The open-file limit was hit while listing a directory. Fatal.
    #[error(
        "Too many open files while listing {path}: {source}. \
         Reduce the concurrency factor (-c) or raise the open-file limit, then retry"
    )]
    DescriptorLimit {
        /// Directory whose listing failed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A root given on the command line does not exist.
    #[error("Path not found: {0}")]
    RootNotFound(PathBuf),

    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while accessing a path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The traversal thread pool could not be created.
    #[error("Failed to build traversal thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The size accounting thread could not be started.
    #[error("Failed to start size accounting thread: {0}")]
    Thread(#[source] io::Error),

    /// The size accounting thread panicked before returning its totals.
    #[error("Size accounting thread panicked")]
    AccountantPanicked,
}

impl ScanError {
    /// Map an I/O error on `path` to the matching variant.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        if is_descriptor_exhaustion(&error) {
            return Self::DescriptorLimit {
                path: path.to_path_buf(),
                source: error,
            };
        }
        match error.kind() {
            io::ErrorKind::NotFound => Self::RootNotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Whether this error must stop the whole run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::RootNotFound(_) | Self::PermissionDenied(_) | Self::Io { .. }
        )
    }
}

/// Errors that can occur while classifying a file.
#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    /// The file disappeared between listing and classification.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file header.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ClassifyError {
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

#[cfg(unix)]
const DESCRIPTOR_LIMIT_CODES: &[i32] = &[24 /* EMFILE */, 23 /* ENFILE */];
#[cfg(windows)]
const DESCRIPTOR_LIMIT_CODES: &[i32] = &[4 /* ERROR_TOO_MANY_OPEN_FILES */];
#[cfg(not(any(unix, windows)))]
const DESCRIPTOR_LIMIT_CODES: &[i32] = &[];

/// Whether an I/O error means the process ran out of file descriptors.
#[must_use]
pub fn is_descriptor_exhaustion(error: &io::Error) -> bool {
    error
        .raw_os_error()
        .is_some_and(|code| DESCRIPTOR_LIMIT_CODES.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walker_config_default() {
        let config = WalkerConfig::default();

        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.threads, 0);
        assert_eq!(config.effective_threads(), DEFAULT_CONCURRENCY);
        assert!(config.media_only);
        assert_eq!(config.skip_patterns.patterns(), ["/Thumbs/", "@eaDir"]);
    }

    #[test]
    fn test_walker_config_builders() {
        let config = WalkerConfig::default()
            .with_concurrency(0)
            .with_threads(3)
            .with_media_only(false)
            .with_skip_patterns(SkipPatterns::none());

        assert_eq!(config.concurrency, 1);
        assert_eq!(config.effective_threads(), 3);
        assert!(!config.media_only);
        assert!(config.skip_patterns.patterns().is_empty());
    }

    #[test]
    fn test_default_skip_patterns() {
        let skip = SkipPatterns::default();
        assert!(skip.is_match("/photos/Thumbs/skip.png"));
        assert!(skip.is_match("/volume1/@eaDir/skip.png"));
        assert!(skip.is_match("/rep/ssd/@eaDir/x/skip.png"));
        // "Thumb" without the trailing s is a real folder
        assert!(!skip.is_match("/photos/Thumb/dont_skip.png"));
        assert!(!skip.is_match("/photos/Thumbs.png"));
    }

    #[test]
    fn test_skip_patterns_none_matches_nothing() {
        assert!(!SkipPatterns::none().is_match("/Thumbs/x.png"));
    }

    #[test]
    fn test_skip_patterns_invalid_regex() {
        assert!(SkipPatterns::new(["(unclosed"]).is_err());
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::RootNotFound(PathBuf::from("/missing"));
        assert_eq!(err.to_string(), "Path not found: /missing");

        let err = ScanError::PermissionDenied(PathBuf::from("/secret"));
        assert_eq!(err.to_string(), "Permission denied: /secret");
    }

    #[test]
    fn test_scan_error_from_io_kinds() {
        let p = Path::new("/x");
        let err = ScanError::from_io(p, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, ScanError::RootNotFound(_)));
        assert!(!err.is_fatal());

        let err = ScanError::from_io(p, io::Error::other("boom"));
        assert!(matches!(err, ScanError::Io { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    #[cfg(unix)]
    fn test_descriptor_exhaustion_is_fatal() {
        let emfile = io::Error::from_raw_os_error(24);
        assert!(is_descriptor_exhaustion(&emfile));

        let err = ScanError::from_io(Path::new("/deep"), emfile);
        assert!(matches!(err, ScanError::DescriptorLimit { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Reduce the concurrency factor"));

        assert!(!is_descriptor_exhaustion(&io::Error::from_raw_os_error(2)));
    }

    #[test]
    fn test_classify_error_display() {
        let err = ClassifyError::NotFound(PathBuf::from("/gone.jpg"));
        assert_eq!(err.to_string(), "File not found: /gone.jpg");
    }
}
