//! Per-directory disk usage accounting.
//!
//! Walker tasks send one [`SizeEvent`] per regular file. A single consumer
//! thread ([`SizeAccountant`]) folds them into [`DirSizeTotals`], so the
//! totals themselves need no locking. The stream closes when the walker is
//! dropped; [`AccountantHandle::join`] then yields the final totals.
//!
//! ```
//! use fastdu::accounting::{format_units, DirSizeTotals, RankScope};
//! use std::path::Path;
//!
//! let mut totals = DirSizeTotals::default();
//! totals.add(Path::new("/mnt/photos"), 260_000_000);
//! totals.add(Path::new("/mnt/music"), 40_000);
//!
//! let ranking = totals.ranked(1, RankScope::Directories);
//! assert_eq!(ranking.entries[0].0, "/mnt/photos");
//! assert_eq!(format_units(ranking.entries[0].1), "0.3GB");
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::progress::{totals_message, ProgressCallback};
use crate::scanner::path_utils::{path_string, top_level_segment};
use crate::scanner::ScanError;

/// Size of one regular file, attributed to its containing directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeEvent {
    pub dir: PathBuf,
    pub size: u64,
}

/// Which totals a ranking is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankScope {
    /// One entry per directory that directly holds files.
    #[default]
    Directories,
    /// One entry per first path segment.
    TopLevel,
}

/// Descending-by-size listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    pub entries: Vec<(String, u64)>,
    /// `true` when the requested count was honoured, `false` when every
    /// available entry is listed because the count was negative or larger
    /// than the number of entries.
    pub limited: bool,
}

/// Byte totals per directory and per top-level segment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DirSizeTotals {
    directories: HashMap<String, u64>,
    top_level: HashMap<String, u64>,
    files: u64,
    bytes: u64,
}

impl DirSizeTotals {
    /// Add one file of `size` bytes under `dir`.
    pub fn add(&mut self, dir: &Path, size: u64) {
        *self.directories.entry(path_string(dir)).or_default() += size;
        *self.top_level.entry(top_level_segment(dir)).or_default() += size;
        self.files += 1;
        self.bytes += size;
    }

    #[must_use]
    pub fn file_count(&self) -> u64 {
        self.files
    }

    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.bytes
    }

    #[must_use]
    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    #[must_use]
    pub fn directory_total(&self, dir: &Path) -> Option<u64> {
        self.directories.get(&path_string(dir)).copied()
    }

    #[must_use]
    pub fn top_level_total(&self, segment: &str) -> Option<u64> {
        self.top_level.get(segment).copied()
    }

    /// Rank `scope` totals by size, largest first, ties by path.
    ///
    /// A negative `count`, or one larger than the number of entries, lists
    /// everything.
    #[must_use]
    pub fn ranked(&self, count: i64, scope: RankScope) -> Ranking {
        let source = match scope {
            RankScope::Directories => &self.directories,
            RankScope::TopLevel => &self.top_level,
        };

        let mut entries: Vec<(String, u64)> =
            source.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        match usize::try_from(count) {
            Ok(n) if n <= entries.len() => {
                entries.truncate(n);
                Ranking {
                    entries,
                    limited: true,
                }
            }
            _ => Ranking {
                entries,
                limited: false,
            },
        }
    }
}

/// Render a byte count with one decimal in KB, MB or GB (decimal units).
///
/// The largest unit whose value exceeds 0.09 wins.
#[must_use]
pub fn format_units(bytes: u64) -> String {
    let size = bytes as f64;
    let gb = size / 1e9;
    let mb = size / 1e6;
    if gb > 0.09 {
        format!("{gb:.1}GB")
    } else if mb > 0.09 {
        format!("{mb:.1}MB")
    } else {
        format!("{:.1}KB", size / 1e3)
    }
}

/// Consumer of the size stream.
pub struct SizeAccountant {
    totals: DirSizeTotals,
    tick: Option<Duration>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl Default for SizeAccountant {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeAccountant {
    #[must_use]
    pub fn new() -> Self {
        Self {
            totals: DirSizeTotals::default(),
            tick: None,
            progress: None,
        }
    }

    /// Report running totals every `interval`. A zero interval disables it.
    #[must_use]
    pub fn with_tick(mut self, interval: Option<Duration>) -> Self {
        self.tick = interval.filter(|d| !d.is_zero());
        self
    }

    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Drain `events` until every sender is gone.
    #[must_use]
    pub fn consume(mut self, events: Receiver<SizeEvent>) -> DirSizeTotals {
        match self.tick {
            None => {
                for event in events {
                    self.totals.add(&event.dir, event.size);
                }
            }
            Some(interval) => {
                let mut next_tick = Instant::now() + interval;
                loop {
                    let wait = next_tick.saturating_duration_since(Instant::now());
                    match events.recv_timeout(wait) {
                        Ok(event) => self.totals.add(&event.dir, event.size),
                        Err(RecvTimeoutError::Timeout) => {
                            self.report_tick();
                            next_tick += interval;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            }
        }

        if let Some(ref progress) = self.progress {
            progress.on_finish(self.totals.file_count(), self.totals.total_bytes());
        }
        self.totals
    }

    fn report_tick(&self) {
        let (files, bytes) = (self.totals.file_count(), self.totals.total_bytes());
        match self.progress {
            Some(ref progress) => progress.on_tick(files, bytes),
            None => log::info!("{}", totals_message(files, bytes)),
        }
    }

    /// Run [`consume`](Self::consume) on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Thread`] if the thread cannot be spawned.
    pub fn spawn(self, events: Receiver<SizeEvent>) -> Result<AccountantHandle, ScanError> {
        let handle = thread::Builder::new()
            .name("fastdu-sizes".to_string())
            .spawn(move || self.consume(events))
            .map_err(ScanError::Thread)?;
        Ok(AccountantHandle { handle })
    }
}

/// Handle to a running [`SizeAccountant`].
pub struct AccountantHandle {
    handle: JoinHandle<DirSizeTotals>,
}

impl AccountantHandle {
    /// Wait for the stream to close and return the totals.
    ///
    /// Blocks until every [`SizeEvent`] sender has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::AccountantPanicked`] if the thread panicked.
    pub fn join(self) -> Result<DirSizeTotals, ScanError> {
        self.handle.join().map_err(|_| ScanError::AccountantPanicked)
    }
}
