//! Progress reporting utilities using indicatif.
//!
//! The size accountant calls [`ProgressCallback::on_tick`] on its periodic
//! tick with the running file and byte totals. [`Progress`] renders those
//! as a spinner line; it draws nothing in quiet mode.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressStyle};

/// Receives scan progress.
///
/// Totals passed to the callbacks are best-effort snapshots taken while the
/// walk is still running, except for [`on_finish`](Self::on_finish).
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first root is walked.
    fn on_walk_start(&self, _roots: usize) {}

    /// Called on every accountant tick.
    fn on_tick(&self, files: u64, bytes: u64);

    /// Called once after the size stream has closed.
    fn on_finish(&self, _files: u64, _bytes: u64) {}

    /// Free-form status line.
    fn on_message(&self, _message: &str) {}
}

/// Spinner-based progress reporter.
pub struct Progress {
    spinner: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Examples
    ///
    /// ```
    /// use fastdu::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            quiet,
        }
    }

    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(ref pb) = *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) {
            f(pb);
        }
    }
}

/// Status text shared by the spinner and the final summary line.
#[must_use]
pub fn totals_message(files: u64, bytes: u64) -> String {
    format!("{files} files, {}", ByteSize(bytes))
}

impl ProgressCallback for Progress {
    fn on_walk_start(&self, roots: usize) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::walking_style());
        pb.set_message(format!("Walking {roots} root(s)"));
        pb.enable_steady_tick(Duration::from_millis(100));
        *self.spinner.lock().unwrap_or_else(PoisonError::into_inner) = Some(pb);
    }

    fn on_tick(&self, files: u64, bytes: u64) {
        self.with_spinner(|pb| pb.set_message(totals_message(files, bytes)));
    }

    fn on_finish(&self, files: u64, bytes: u64) {
        if let Some(pb) = self
            .spinner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pb.finish_with_message(format!("Walk complete: {}", totals_message(files, bytes)));
        }
    }

    fn on_message(&self, message: &str) {
        self.with_spinner(|pb| pb.set_message(message.to_string()));
    }
}
