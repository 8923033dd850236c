//! Counting permit pool that bounds concurrent directory listings.
//!
//! Every `read_dir` holds an open directory handle until the listing is
//! drained. On a wide tree the walker can have thousands of tasks ready to
//! list at once, so the gate caps how many of them may hold a handle at the
//! same time. Only listings are gated; file reads for classification and the
//! recursive fan-out itself are not.
//!
//! Permits are RAII: [`ConcurrencyGate::acquire`] returns a [`GatePermit`]
//! and the permit goes back to the pool when it is dropped.
//!
//! # Example
//!
//! ```
//! use fastdu::scanner::ConcurrencyGate;
//!
//! let gate = ConcurrencyGate::new(2);
//! {
//!     let _permit = gate.acquire();
//!     assert_eq!(gate.available(), 1);
//! }
//! assert_eq!(gate.available(), 2);
//! ```

use std::sync::{Condvar, Mutex, MutexGuard};

/// Fixed-capacity blocking permit pool.
///
/// Capacity is set once at construction and never changes for the lifetime
/// of the gate.
#[derive(Debug)]
pub struct ConcurrencyGate {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl ConcurrencyGate {
    /// Create a gate with `capacity` permits. A capacity of zero is raised
    /// to one, since a zero-permit gate would block every listing forever.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        }
    }

    /// Total number of permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free. A snapshot; may be stale immediately.
    #[must_use]
    pub fn available(&self) -> usize {
        *self.lock_or_recover()
    }

    /// Block the calling thread until a permit is free, then take it.
    pub fn acquire(&self) -> GatePermit<'_> {
        let mut avail = self.lock_or_recover();
        while *avail == 0 {
            avail = match self.released.wait(avail) {
                Ok(guard) => guard,
                Err(poison) => poison.into_inner(),
            };
        }
        *avail -= 1;
        GatePermit { gate: self }
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        let mut avail = self.lock_or_recover();
        if *avail == 0 {
            return None;
        }
        *avail -= 1;
        Some(GatePermit { gate: self })
    }

    fn release(&self) {
        let mut avail = self.lock_or_recover();
        *avail += 1;
        debug_assert!(*avail <= self.capacity, "permit released twice");
        drop(avail);
        self.released.notify_one();
    }

    // Poisoning only means another walker thread panicked while holding the
    // counter; the count itself is still consistent, and a release in Drop
    // must never panic.
    fn lock_or_recover(&self) -> MutexGuard<'_, usize> {
        match self.available.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }
}

/// A held permit. Returned to the gate on drop.
#[derive(Debug)]
#[must_use = "dropping the permit releases it immediately"]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
