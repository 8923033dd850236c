//! Scan counters shared by every traversal task.
//!
//! One [`ScanStats`] is created per run and borrowed by all walker tasks.
//! Counters are relaxed atomics: they are tallies, nothing synchronises on
//! them, and the final read happens after the traversal scope has joined.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::MediaKind;

/// Live counters for an in-progress scan.
#[derive(Debug, Default)]
pub struct ScanStats {
    files_seen: AtomicU64,
    bytes_seen: AtomicU64,
    images: AtomicU64,
    audio: AtomicU64,
    videos: AtomicU64,
    other_files: AtomicU64,
    skipped_by_pattern: AtomicU64,
    skipped_symlinks: AtomicU64,
    empty_files: AtomicU64,
    classify_errors: AtomicU64,
    metadata_errors: AtomicU64,
    size_mismatches: AtomicU64,
    directory_errors: AtomicU64,
    entry_errors: AtomicU64,
    root_errors: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl ScanStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_seen(&self, size: u64) {
        bump(&self.files_seen);
        self.bytes_seen.fetch_add(size, Ordering::Relaxed);
    }

    pub fn classified(&self, kind: MediaKind) {
        match kind {
            MediaKind::Image => bump(&self.images),
            MediaKind::Audio => bump(&self.audio),
            MediaKind::Video => bump(&self.videos),
            MediaKind::Other => bump(&self.other_files),
        }
    }

    pub fn skipped_by_pattern(&self) {
        bump(&self.skipped_by_pattern);
    }

    pub fn skipped_symlink(&self) {
        bump(&self.skipped_symlinks);
    }

    pub fn empty_file(&self) {
        bump(&self.empty_files);
    }

    pub fn classify_error(&self) {
        bump(&self.classify_errors);
    }

    pub fn metadata_error(&self) {
        bump(&self.metadata_errors);
    }

    pub fn size_mismatch(&self) {
        bump(&self.size_mismatches);
    }

    pub fn directory_error(&self) {
        bump(&self.directory_errors);
    }

    pub fn entry_error(&self) {
        bump(&self.entry_errors);
    }

    pub fn root_error(&self) {
        bump(&self.root_errors);
    }

    /// Copy the counters into a plain value.
    ///
    /// Safe to call mid-walk for a best-effort view.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            files_seen: load(&self.files_seen),
            bytes_seen: load(&self.bytes_seen),
            images: load(&self.images),
            audio: load(&self.audio),
            videos: load(&self.videos),
            other_files: load(&self.other_files),
            skipped_by_pattern: load(&self.skipped_by_pattern),
            skipped_symlinks: load(&self.skipped_symlinks),
            empty_files: load(&self.empty_files),
            classify_errors: load(&self.classify_errors),
            metadata_errors: load(&self.metadata_errors),
            size_mismatches: load(&self.size_mismatches),
            directory_errors: load(&self.directory_errors),
            entry_errors: load(&self.entry_errors),
            root_errors: load(&self.root_errors),
        }
    }
}

/// Point-in-time copy of [`ScanStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub files_seen: u64,
    pub bytes_seen: u64,
    pub images: u64,
    pub audio: u64,
    pub videos: u64,
    pub other_files: u64,
    pub skipped_by_pattern: u64,
    pub skipped_symlinks: u64,
    pub empty_files: u64,
    pub classify_errors: u64,
    /// Images whose dimension or EXIF probe failed; the file is still recorded.
    pub metadata_errors: u64,
    /// Sightings whose size disagreed with the first record for the name.
    pub size_mismatches: u64,
    pub directory_errors: u64,
    pub entry_errors: u64,
    pub root_errors: u64,
}

impl StatsSnapshot {
    /// Errors that were absorbed instead of stopping the run.
    ///
    /// Metadata probe failures and size mismatches are not counted: the
    /// former still records the file, the latter is a heuristic flag.
    #[must_use]
    pub fn absorbed_errors(&self) -> u64 {
        self.classify_errors + self.directory_errors + self.entry_errors + self.root_errors
    }

    /// Whether the scan finished without absorbing any error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.absorbed_errors() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let stats = ScanStats::new();
        stats.file_seen(100);
        stats.file_seen(50);
        stats.classified(MediaKind::Image);
        stats.classified(MediaKind::Video);
        stats.classified(MediaKind::Other);
        stats.skipped_by_pattern();
        stats.size_mismatch();

        let snap = stats.snapshot();
        assert_eq!(snap.files_seen, 2);
        assert_eq!(snap.bytes_seen, 150);
        assert_eq!(snap.images, 1);
        assert_eq!(snap.videos, 1);
        assert_eq!(snap.other_files, 1);
        assert_eq!(snap.skipped_by_pattern, 1);
        assert_eq!(snap.size_mismatches, 1);
        assert!(snap.is_clean());
    }

    #[test]
    fn test_absorbed_errors_excludes_heuristics() {
        let stats = ScanStats::new();
        stats.metadata_error();
        stats.size_mismatch();
        assert!(stats.snapshot().is_clean());

        stats.classify_error();
        stats.root_error();
        stats.directory_error();
        let snap = stats.snapshot();
        assert_eq!(snap.absorbed_errors(), 3);
        assert!(!snap.is_clean());
    }
}
