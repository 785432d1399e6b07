//! # Resource Pool
//!
//! Recycling pool for objects that are expensive to build and cheap to
//! overwrite (generation cells, scratch buffers).

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A thread-safe pool of reusable objects.
///
/// `acquire` never fails and never waits on other leases: it either pops an
/// idle object or builds a fresh one with the factory. Idle objects beyond
/// the soft cap are dropped on release instead of being kept around.
///
/// # Thread Safety
///
/// The pool can be shared between threads. The idle list sits behind a
/// short mutex; the factory always runs outside of it.
///
/// # Example
///
/// ```rust,ignore
/// let pool = ResourcePool::new(16, || Vec::<f32>::with_capacity(1024));
///
/// let mut scratch = pool.acquire();
/// scratch.clear();
/// scratch.push(1.0);
/// drop(scratch); // back in the pool
/// ```
pub struct ResourcePool<T> {
    /// Idle objects waiting to be leased again.
    idle: Mutex<Vec<T>>,
    /// Builds a new object when the idle list is empty.
    factory: Box<dyn Fn() -> T + Send + Sync>,
    /// Maximum number of idle objects retained.
    soft_cap: usize,
    /// Lifetime counters.
    counters: PoolCounters,
}

#[derive(Default)]
struct PoolCounters {
    created: AtomicU64,
    recycled: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
    outstanding: AtomicUsize,
}

/// Snapshot of a pool's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects built by the factory.
    pub created: u64,
    /// Leases served from the idle list.
    pub recycled: u64,
    /// Leases returned to the pool.
    pub released: u64,
    /// Returned objects dropped because the idle list was at its soft cap.
    pub discarded: u64,
    /// Leases currently alive.
    pub outstanding: usize,
    /// Objects currently idle in the pool.
    pub idle: usize,
}

impl<T> ResourcePool<T> {
    /// Creates an empty pool.
    ///
    /// # Arguments
    ///
    /// * `soft_cap` - Maximum number of idle objects kept for reuse
    /// * `factory` - Builds a new object when no idle one is available
    #[must_use]
    pub fn new<F>(soft_cap: usize, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(Vec::with_capacity(soft_cap.min(1024))),
            factory: Box::new(factory),
            soft_cap,
            counters: PoolCounters::default(),
        }
    }

    /// Creates a pool whose factory is `T::default`.
    #[must_use]
    pub fn with_default(soft_cap: usize) -> Self
    where
        T: Default + 'static,
    {
        Self::new(soft_cap, T::default)
    }

    /// Returns the soft cap on idle objects.
    #[inline]
    #[must_use]
    pub const fn soft_cap(&self) -> usize {
        self.soft_cap
    }

    /// Leases an object from the pool.
    ///
    /// Recycled objects keep whatever state their last user left in them;
    /// callers are expected to overwrite it.
    ///
    /// # Panics
    ///
    /// Propagates a panic from the factory. The pool itself never refuses
    /// a lease.
    #[must_use]
    pub fn acquire(&self) -> Resource<'_, T> {
        let recycled = self.idle.lock().pop();
        let value = if let Some(value) = recycled {
            self.counters.recycled.fetch_add(1, Ordering::Relaxed);
            value
        } else {
            let value = (self.factory)();
            self.counters.created.fetch_add(1, Ordering::Relaxed);
            value
        };

        self.counters.outstanding.fetch_add(1, Ordering::AcqRel);

        Resource {
            pool: self,
            value: Some(value),
        }
    }

    /// Builds objects up front so the first `count` leases do not allocate.
    ///
    /// The idle list never grows beyond the soft cap.
    pub fn prewarm(&self, count: usize) {
        let target = count.min(self.soft_cap);
        let missing = target.saturating_sub(self.idle.lock().len());

        let fresh: Vec<T> = (0..missing).map(|_| (self.factory)()).collect();
        self.counters
            .created
            .fetch_add(fresh.len() as u64, Ordering::Relaxed);

        let mut idle = self.idle.lock();
        let room = self.soft_cap.saturating_sub(idle.len());
        idle.extend(fresh.into_iter().take(room));
    }

    /// Returns a snapshot of the pool counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.counters.created.load(Ordering::Relaxed),
            recycled: self.counters.recycled.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            discarded: self.counters.discarded.load(Ordering::Relaxed),
            outstanding: self.counters.outstanding.load(Ordering::Acquire),
            idle: self.idle.lock().len(),
        }
    }

    /// Takes an object back from a lease.
    fn give_back(&self, value: T) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        self.counters.outstanding.fetch_sub(1, Ordering::AcqRel);

        let overflow = {
            let mut idle = self.idle.lock();
            if idle.len() < self.soft_cap {
                idle.push(value);
                None
            } else {
                Some(value)
            }
        };

        if overflow.is_some() {
            self.counters.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<T> fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("soft_cap", &self.soft_cap)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Exclusive lease on a pooled object.
///
/// The object is moved out of the pool for the lifetime of the lease, so
/// no two leases can ever observe the same object. Dropping the lease (or
/// calling [`Resource::release`]) returns it exactly once, including when
/// the owning scope is left through `?` or a panic.
pub struct Resource<'pool, T> {
    pool: &'pool ResourcePool<T>,
    value: Option<T>,
}

impl<'pool, T> Resource<'pool, T> {
    /// Returns the object to the pool now instead of at end of scope.
    #[inline]
    pub fn release(self) {
        drop(self);
    }

    /// Returns the pool this lease belongs to.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &'pool ResourcePool<T> {
        self.pool
    }

    #[inline]
    fn inner(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("pooled resource accessed after release"),
        }
    }

    #[inline]
    fn inner_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("pooled resource accessed after release"),
        }
    }
}

impl<T> Deref for Resource<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        self.inner()
    }
}

impl<T> DerefMut for Resource<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        self.inner_mut()
    }
}

impl<T> Drop for Resource<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.give_back(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resource<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(self.inner()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_pool_acquire_release() {
        let pool: ResourcePool<u32> = ResourcePool::with_default(4);

        let mut handle = pool.acquire();
        *handle = 42;
        assert_eq!(*handle, 42);
        assert_eq!(pool.stats().outstanding, 1);

        handle.release();
        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.released, 1);
        assert_eq!(stats.idle, 1);
    }

    #[test]
    fn test_pool_reuse() {
        let pool: ResourcePool<Vec<u8>> = ResourcePool::new(4, || Vec::with_capacity(64));

        {
            let mut buffer = pool.acquire();
            buffer.push(7);
        }

        let buffer = pool.acquire();
        assert_eq!(buffer.as_slice(), &[7], "Recycled object keeps its contents");

        let stats = pool.stats();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.recycled, 1);
    }

    #[test]
    fn test_pool_soft_cap_discards() {
        let pool: ResourcePool<u64> = ResourcePool::with_default(2);

        let handles: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        assert_eq!(pool.stats().created, 5);
        drop(handles);

        let stats = pool.stats();
        assert_eq!(stats.idle, 2, "Idle list is capped");
        assert_eq!(stats.discarded, 3);
        assert_eq!(stats.outstanding, 0);
    }

    #[test]
    fn test_pool_prewarm() {
        let pool: ResourcePool<u8> = ResourcePool::with_default(8);
        pool.prewarm(100);

        let stats = pool.stats();
        assert_eq!(stats.idle, 8);
        assert_eq!(stats.created, 8);

        let _lease = pool.acquire();
        assert_eq!(pool.stats().created, 8, "Prewarmed object is reused");
    }

    #[test]
    fn test_pool_release_on_early_return() {
        fn fallible(pool: &ResourcePool<u32>, fail: bool) -> Result<u32, String> {
            let mut lease = pool.acquire();
            *lease = 3;
            if fail {
                return Err("sampler failed".to_string());
            }
            Ok(*lease)
        }

        let pool: ResourcePool<u32> = ResourcePool::with_default(4);

        assert!(fallible(&pool, true).is_err());
        assert_eq!(fallible(&pool, false), Ok(3));

        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0, "Every lease must come back");
        assert_eq!(stats.released, 2);
    }

    #[test]
    fn test_pool_release_on_panic() {
        let pool: ResourcePool<u32> = ResourcePool::with_default(4);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _lease = pool.acquire();
            panic!("generation blew up");
        }));

        assert!(result.is_err());
        assert_eq!(pool.stats().outstanding, 0);
        assert_eq!(pool.stats().released, 1);
    }

    #[test]
    fn test_pool_exclusive_under_contention() {
        let pool: ResourcePool<Arc<AtomicBool>> =
            ResourcePool::new(16, || Arc::new(AtomicBool::new(false)));

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..2_000 {
                        let lease = pool.acquire();
                        let was_busy = lease.swap(true, Ordering::AcqRel);
                        assert!(!was_busy, "Two leases observed the same object");
                        lease.store(false, Ordering::Release);
                    }
                });
            }
        });

        let stats = pool.stats();
        assert_eq!(stats.outstanding, 0);
        assert_eq!(stats.released, 16_000);
        assert!(stats.created <= 16 + stats.discarded);
    }
}
