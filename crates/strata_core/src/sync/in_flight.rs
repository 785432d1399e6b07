//! # In-Flight Promise
//!
//! A single-assignment slot that any number of threads can block on.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// A value that is being computed by exactly one thread.
///
/// The computing thread calls [`InFlight::complete`] once; every other
/// thread calls [`InFlight::wait`] and receives a clone of the result.
/// Completion is first-wins: later calls are ignored.
///
/// # Example
///
/// ```rust,ignore
/// let pending = Arc::new(InFlight::new());
///
/// let waiter = {
///     let pending = Arc::clone(&pending);
///     std::thread::spawn(move || pending.wait())
/// };
///
/// pending.complete(42);
/// assert_eq!(waiter.join().unwrap(), 42);
/// ```
pub struct InFlight<T> {
    /// `None` until completed.
    slot: Mutex<Option<T>>,
    /// Signalled once when the slot is filled.
    ready: Condvar,
    /// Threads currently blocked in `wait`.
    waiters: AtomicUsize,
}

impl<T> InFlight<T> {
    /// Creates an empty, pending promise.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: Condvar::new(),
            waiters: AtomicUsize::new(0),
        }
    }

    /// Stores the result and wakes every waiter.
    ///
    /// Returns `false` (and drops `value`) if the promise was already
    /// completed.
    pub fn complete(&self, value: T) -> bool {
        {
            let mut slot = self.slot.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.ready.notify_all();
        true
    }

    /// Returns whether a result has been stored.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Returns the number of threads currently blocked on this promise.
    #[inline]
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire)
    }
}

impl<T: Clone> InFlight<T> {
    /// Returns the result if it is already available.
    #[must_use]
    pub fn try_get(&self) -> Option<T> {
        self.slot.lock().clone()
    }

    /// Blocks until the promise is completed and returns a clone of the
    /// result.
    #[must_use]
    pub fn wait(&self) -> T {
        let mut slot = self.slot.lock();
        self.waiters.fetch_add(1, Ordering::AcqRel);
        loop {
            if let Some(value) = slot.as_ref() {
                self.waiters.fetch_sub(1, Ordering::AcqRel);
                return value.clone();
            }
            self.ready.wait(&mut slot);
        }
    }
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("complete", &self.is_complete())
            .field("waiters", &self.waiters())
            .finish()
    }
}
