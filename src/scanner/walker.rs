//! Concurrent directory walker.
//!
//! # Overview
//!
//! [`Walker::run`] opens one [`rayon::scope`] for the whole invocation and
//! spawns one task per root. Each directory task:
//!
//! 1. takes a [`ConcurrencyGate`] permit, lists its direct children, and
//!    drops the permit as soon as the listing is collected;
//! 2. spawns a new task into the same scope for every child directory;
//! 3. reports every regular file synchronously: a [`SizeEvent`] goes to the
//!    size stream and a [`Sighting`] goes to the [`Registry`].
//!
//! The scope is the completion barrier: `run` returns only after every task,
//! including every recursively spawned one, has returned.
//!
//! # Failure policy
//!
//! - Unreadable files and failed classifications are counted and skipped.
//! - A directory that cannot be listed is counted and its subtree skipped.
//! - A root that does not exist is reported; other roots still run.
//! - Running out of file descriptors while listing is fatal: the first such
//!   error is kept, every task stops listing, and `run` returns it.

use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::path_utils::{base_name_key, path_string};
use super::{
    is_descriptor_exhaustion, Classifier, ConcurrencyGate, Probe, ScanError, ScanStats,
    WalkerConfig,
};
use crate::accounting::SizeEvent;
use crate::duplicates::{Occurrence, Registry, Sighting};

enum Listed {
    Dir(PathBuf),
    File(PathBuf, Metadata),
}

/// Walks one or more roots into a shared [`Registry`].
///
/// A `Walker` lives for exactly one run. It borrows the registry, the
/// classifier and the counters, and owns the sending half of the size
/// stream; dropping the walker closes that stream.
pub struct Walker<'a> {
    config: &'a WalkerConfig,
    gate: ConcurrencyGate,
    registry: &'a Registry,
    classifier: &'a dyn Classifier,
    stats: &'a ScanStats,
    sizes: Sender<SizeEvent>,
    aborted: AtomicBool,
    fatal: Mutex<Option<ScanError>>,
    root_errors: Mutex<Vec<ScanError>>,
}

impl<'a> Walker<'a> {
    #[must_use]
    pub fn new(
        config: &'a WalkerConfig,
        registry: &'a Registry,
        classifier: &'a dyn Classifier,
        stats: &'a ScanStats,
        sizes: Sender<SizeEvent>,
    ) -> Self {
        Self {
            gate: ConcurrencyGate::new(config.concurrency),
            config,
            registry,
            classifier,
            stats,
            sizes,
            aborted: AtomicBool::new(false),
            fatal: Mutex::new(None),
            root_errors: Mutex::new(Vec::new()),
        }
    }

    /// Walk every root and wait for all spawned tasks.
    ///
    /// Returns the per-root errors that were absorbed.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::DescriptorLimit`] if a listing ran out of file
    /// descriptors, or [`ScanError::ThreadPool`] if the pool cannot start.
    pub fn run(&self, roots: &[PathBuf]) -> Result<Vec<ScanError>, ScanError> {
        let threads = self.config.effective_threads();
        log::debug!(
            "Walking {} root(s) with concurrency {} on {} thread(s)",
            roots.len(),
            self.gate.capacity(),
            threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("fastdu-walk-{i}"))
            .build()?;

        pool.install(|| {
            rayon::scope(|s| {
                for root in roots {
                    s.spawn(move |s| self.walk_root(s, root));
                }
            });
        });

        if let Some(err) = self
            .fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(err);
        }

        Ok(std::mem::take(
            &mut *self
                .root_errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        ))
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn abort(&self, err: ScanError) {
        log::error!("{err}");
        self.aborted.store(true, Ordering::SeqCst);
        let mut fatal = self.fatal.lock().unwrap_or_else(PoisonError::into_inner);
        if fatal.is_none() {
            *fatal = Some(err);
        }
    }

    fn walk_root<'s>(&'s self, scope: &rayon::Scope<'s>, root: &'s Path) {
        let metadata = match fs::metadata(root) {
            Ok(m) => m,
            Err(e) => {
                let err = ScanError::from_io(root, e);
                if err.is_fatal() {
                    self.abort(err);
                    return;
                }
                log::error!("Skipping root: {err}");
                self.stats.root_error();
                self.root_errors
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(err);
                return;
            }
        };

        if metadata.is_dir() {
            self.walk_dir(scope, root.to_path_buf());
        } else if metadata.is_file() {
            let dir = match root.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            self.report_file(&dir, root, &metadata);
        } else {
            log::debug!("Skipping special file root: {}", root.display());
        }
    }

    fn walk_dir<'s>(&'s self, scope: &rayon::Scope<'s>, dir: PathBuf) {
        if self.is_aborted() {
            return;
        }

        let entries = match self.list_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_descriptor_exhaustion(&e) => {
                self.abort(ScanError::DescriptorLimit { path: dir, source: e });
                return;
            }
            Err(e) => {
                log::warn!("Cannot list {}: {}", dir.display(), e);
                self.stats.directory_error();
                return;
            }
        };

        for entry in entries {
            match entry {
                Listed::Dir(child) => scope.spawn(move |s| self.walk_dir(s, child)),
                Listed::File(path, metadata) => self.report_file(&dir, &path, &metadata),
            }
        }
    }

    /// List the direct children of `dir` while holding one gate permit.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<Listed>> {
        let _permit = self.gate.acquire();

        let mut listed = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_descriptor_exhaustion(&e) => return Err(e),
                Err(e) => {
                    self.entry_error(dir, &e);
                    continue;
                }
            };

            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(e) if is_descriptor_exhaustion(&e) => return Err(e),
                Err(e) => {
                    self.entry_error(&entry.path(), &e);
                    continue;
                }
            };

            if file_type.is_dir() {
                listed.push(Listed::Dir(entry.path()));
            } else if file_type.is_file() {
                match entry.metadata() {
                    Ok(metadata) => listed.push(Listed::File(entry.path(), metadata)),
                    Err(e) if is_descriptor_exhaustion(&e) => return Err(e),
                    Err(e) => self.entry_error(&entry.path(), &e),
                }
            } else if file_type.is_symlink() {
                log::trace!("Skipping symlink: {}", entry.path().display());
                self.stats.skipped_symlink();
            }
        }
        Ok(listed)
    }

    fn entry_error(&self, path: &Path, error: &io::Error) {
        log::warn!("I/O error for {}: {}", path.display(), error);
        self.stats.entry_error();
    }

    fn report_file(&self, dir: &Path, path: &Path, metadata: &Metadata) {
        let size = metadata.len();
        self.stats.file_seen(size);

        let event = SizeEvent {
            dir: dir.to_path_buf(),
            size,
        };
        if self.sizes.send(event).is_err() {
            log::debug!("Size stream closed; {} not counted", path.display());
        }

        self.submit(path, metadata, size);
    }

    /// Filter, classify and record one regular file.
    fn submit(&self, path: &Path, metadata: &Metadata, size: u64) {
        let full_path = path_string(path);
        if self.config.skip_patterns.is_match(&full_path) {
            log::trace!("Skipping by pattern: {full_path}");
            self.stats.skipped_by_pattern();
            return;
        }

        if size == 0 {
            log::debug!("Skipping empty file: {full_path}");
            self.stats.empty_file();
            return;
        }

        let Some(base_name) = base_name_key(path) else {
            return;
        };

        let probe = match self.classifier.classify(path) {
            Ok(probe) => {
                self.stats.classified(probe.classification.kind);
                if probe.metadata_error.is_some() {
                    self.stats.metadata_error();
                }
                if self.config.media_only && !probe.classification.is_media() {
                    return;
                }
                probe
            }
            Err(e) => {
                log::warn!("Classification failed: {e}");
                self.stats.classify_error();
                Probe::default()
            }
        };

        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_default();

        let outcome = self.registry.record(Sighting {
            base_name,
            occurrence: Occurrence {
                path: full_path,
                size,
            },
            modified,
            classification: probe.classification,
            metadata: probe.metadata,
        });

        if outcome.size_mismatch {
            self.stats.size_mismatch();
        }
    }
}
