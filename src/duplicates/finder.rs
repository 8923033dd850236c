//! Scan orchestration.
//!
//! [`DuplicateFinder::run`] wires the pieces of one invocation together:
//!
//! 1. **Accountant** - spawn the size-stream consumer thread
//! 2. **Walk** - run the [`Walker`] over every root inside one rayon scope
//! 3. **Barrier** - drop the walker (closing the size stream), join the
//!    accountant, then consume the registry into a [`FileIndex`]
//!
//! The index only exists after step 3, so nothing downstream can observe a
//! partially built registry.

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use bytesize::ByteSize;

use super::{FileIndex, Registry};
use crate::accounting::{DirSizeTotals, SizeAccountant};
use crate::progress::ProgressCallback;
use crate::scanner::{
    Classifier, MagicClassifier, ScanError, ScanStats, StatsSnapshot, Walker, WalkerConfig,
};

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Walker configuration for directory traversal.
    pub walker_config: WalkerConfig,
    /// Interval of the running-totals report; `None` disables it.
    pub print_interval: Option<Duration>,
    /// Classifier called once per regular file.
    pub classifier: Arc<dyn Classifier>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("walker_config", &self.walker_config)
            .field("print_interval", &self.print_interval)
            .field("classifier", &"<classifier>")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            walker_config: WalkerConfig::default(),
            print_interval: None,
            classifier: Arc::new(MagicClassifier),
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Report running totals every `interval`; zero disables it.
    #[must_use]
    pub fn with_print_interval(mut self, interval: Duration) -> Self {
        self.print_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Summary statistics from a scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Counters collected by the walker
    pub stats: StatsSnapshot,
    /// Number of distinct base names recorded
    pub records: usize,
    /// Number of base names seen at two or more paths
    pub duplicate_groups: usize,
    /// Copies beyond the first, summed over every duplicate group
    pub duplicate_files: usize,
    /// Duplicate groups whose occurrences disagree on size
    pub mismatched_groups: usize,
    /// Duration of the walk including the accounting barrier
    pub scan_duration: Duration,
    /// Roots that could not be walked
    pub root_errors: Vec<ScanError>,
}

impl ScanSummary {
    /// Whether nothing was absorbed along the way.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.stats.is_clean()
    }

    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize(self.stats.bytes_seen).to_string()
    }
}

/// Everything a finished scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub index: FileIndex,
    pub totals: DirSizeTotals,
    pub summary: ScanSummary,
}

/// Runs one scan over a list of roots.
///
/// # Example
///
/// ```no_run
/// use fastdu::duplicates::{DuplicateFinder, FinderConfig};
/// use std::path::PathBuf;
///
/// let finder = DuplicateFinder::new(FinderConfig::default());
/// let outcome = finder.run(&[PathBuf::from("/media/photos")]).unwrap();
///
/// println!("{} duplicate groups", outcome.summary.duplicate_groups);
/// println!("{} files under {} dirs", outcome.totals.file_count(), outcome.totals.directory_count());
/// ```
#[derive(Debug)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Walk every root and return the final index and size totals.
    ///
    /// Per-root and per-file problems are absorbed and reported in
    /// [`ScanSummary`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::DescriptorLimit`] when the process ran out of
    /// file descriptors, or a thread setup error.
    pub fn run(&self, roots: &[PathBuf]) -> Result<ScanOutcome, ScanError> {
        let start_time = Instant::now();
        log::info!(
            "Scanning {} root(s), concurrency factor {}",
            roots.len(),
            self.config.walker_config.concurrency
        );

        let registry = Registry::new();
        let stats = ScanStats::new();
        let (sizes_tx, sizes_rx) = mpsc::channel();

        let mut accountant = SizeAccountant::new().with_tick(self.config.print_interval);
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_walk_start(roots.len());
            accountant = accountant.with_progress(Arc::clone(callback));
        }
        let accountant = accountant.spawn(sizes_rx)?;

        let walked = {
            let walker = Walker::new(
                &self.config.walker_config,
                &registry,
                self.config.classifier.as_ref(),
                &stats,
                sizes_tx,
            );
            walker.run(roots)
        };

        let totals = accountant.join()?;
        let root_errors = walked?;
        let index = registry.into_index();

        let mut summary = ScanSummary {
            stats: stats.snapshot(),
            records: index.len(),
            scan_duration: start_time.elapsed(),
            root_errors,
            ..ScanSummary::default()
        };
        for record in index.duplicates() {
            summary.duplicate_groups += 1;
            summary.duplicate_files += record.occurrences.len() - 1;
            if record.size_mismatch {
                summary.mismatched_groups += 1;
            }
        }

        log::info!(
            "Scan complete: {} files, {} records, {} duplicate groups in {:.2?}",
            totals.file_count(),
            summary.records,
            summary.duplicate_groups,
            summary.scan_duration
        );

        Ok(ScanOutcome {
            index,
            totals,
            summary,
        })
    }
}
