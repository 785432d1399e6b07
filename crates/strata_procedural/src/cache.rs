//! # Tile Cache
//!
//! Region-granularity cache with at-most-once generation.
//!
//! ## Slot States
//!
//! ```text
//! ABSENT --(first caller)--> GENERATING --(success)--> CACHED
//!                                 |                      |
//!                                 +--(failure)--> ABSENT <-(eviction)
//! ```
//!
//! Both transitions out of ABSENT and GENERATING happen under the map
//! mutex, so exactly one caller generates a given region. Everyone else
//! who asks while it is generating blocks on the same [`InFlight`] and
//! receives the same result. Generation itself runs outside the lock.
//!
//! ## Eviction
//!
//! Capacity counts cached regions only. Before a new region is inserted,
//! least-recently-used regions are evicted until there is room. Regions a
//! caller still holds (pinned) are skipped, so the cache can briefly run
//! over capacity when everything is in use.
//!
//! ## Warm-up
//!
//! `queue_*` calls are hints. They go to a bounded channel served by
//! background workers and are dropped when the queue is full. Hints still
//! queued when the cache is dropped are discarded.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use strata_core::InFlight;

use crate::error::{GenResult, GenerationError, SettingsResult};
use crate::region::{ChunkReader, Region, RegionCoord, RegionHandle};
use crate::sampler::Sampler;
use crate::settings::WorldSettings;

/// Promise shared by every caller waiting on one region.
type Pending = Arc<InFlight<GenResult<RegionHandle>>>;

/// State of one region in the cache.
enum Slot {
    /// One caller is generating; the rest wait on the promise.
    Generating(Pending),
    /// Generated and published.
    Cached {
        region: RegionHandle,
        /// Logical clock tick of the last access.
        last_access: u64,
    },
}

/// Cache statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests served from a cached region.
    pub hits: u64,
    /// Requests that started a generation.
    pub misses: u64,
    /// Requests that joined an in-flight generation.
    pub waits: u64,
    /// Regions generated successfully.
    pub generated: u64,
    /// Generations that failed or were aborted.
    pub failed: u64,
    /// Regions evicted.
    pub evicted: u64,
    /// Warm-up hints accepted.
    pub queued: u64,
    /// Warm-up hints dropped.
    pub dropped_hints: u64,
    /// Regions currently cached.
    pub cached: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    waits: AtomicU64,
    generated: AtomicU64,
    failed: AtomicU64,
    evicted: AtomicU64,
    queued: AtomicU64,
    dropped_hints: AtomicU64,
}

impl Counters {
    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// What a caller does after inspecting the slot map.
enum Claim {
    Hit(RegionHandle),
    Wait(Pending),
    Generate(Pending),
}

/// State shared between the cache handle and its warm-up workers.
struct Shared {
    settings: Arc<WorldSettings>,
    sampler: Arc<dyn Sampler>,
    slots: Mutex<HashMap<RegionCoord, Slot>>,
    clock: AtomicU64,
    counters: Counters,
    /// Set when the cache is dropped; workers discard remaining hints.
    shutdown: AtomicBool,
}

impl Shared {
    #[inline]
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get_region(&self, coord: RegionCoord) -> GenResult<RegionHandle> {
        let claim = {
            let mut slots = self.slots.lock();
            match slots.get_mut(&coord) {
                Some(Slot::Cached {
                    region,
                    last_access,
                }) => {
                    *last_access = self.tick();
                    Claim::Hit(Arc::clone(region))
                }
                Some(Slot::Generating(pending)) => Claim::Wait(Arc::clone(pending)),
                None => {
                    let pending: Pending = Arc::new(InFlight::new());
                    slots.insert(coord, Slot::Generating(Arc::clone(&pending)));
                    Claim::Generate(pending)
                }
            }
        };

        match claim {
            Claim::Hit(region) => {
                Counters::bump(&self.counters.hits);
                Ok(region)
            }
            Claim::Wait(pending) => {
                Counters::bump(&self.counters.waits);
                tracing::trace!("Waiting on in-flight region {}", coord);
                pending.wait()
            }
            Claim::Generate(pending) => {
                Counters::bump(&self.counters.misses);
                self.generate(coord, &pending)
            }
        }
    }

    fn generate(&self, coord: RegionCoord, pending: &Pending) -> GenResult<RegionHandle> {
        let guard = GenerationGuard {
            shared: self,
            coord,
            pending,
            armed: true,
        };

        let start = Instant::now();
        let result = Region::generate(coord, &self.settings, &*self.sampler).map(Arc::new);

        match &result {
            Ok(_) => tracing::debug!(
                "Generated region {} in {}us",
                coord,
                start.elapsed().as_micros()
            ),
            Err(error) => tracing::warn!("Generation of region {} failed: {}", coord, error),
        }

        guard.publish(result)
    }

    /// Evicts least-recently-used, unpinned regions until a new region fits.
    ///
    /// Must be called with the slot map locked.
    fn make_room(&self, slots: &mut HashMap<RegionCoord, Slot>) {
        let capacity = self.settings.cache_capacity.max(1);

        loop {
            let cached = slots
                .values()
                .filter(|slot| matches!(slot, Slot::Cached { .. }))
                .count();
            if cached < capacity {
                return;
            }

            let victim = slots
                .iter()
                .filter_map(|(coord, slot)| match slot {
                    Slot::Cached {
                        region,
                        last_access,
                    } if Arc::strong_count(region) == 1 => Some((*last_access, *coord)),
                    _ => None,
                })
                .min();

            let Some((_, coord)) = victim else {
                tracing::debug!(
                    "All {} cached regions are pinned, exceeding capacity {}",
                    cached,
                    capacity
                );
                return;
            };

            slots.remove(&coord);
            Counters::bump(&self.counters.evicted);
            tracing::debug!("Evicted region {}", coord);
        }
    }

    fn contains(&self, coord: RegionCoord) -> bool {
        matches!(self.slots.lock().get(&coord), Some(Slot::Cached { .. }))
    }
}

/// Settles a generating slot exactly once.
///
/// If the generating thread unwinds before publishing, `Drop` clears the
/// slot and releases waiters with [`GenerationError::Aborted`].
struct GenerationGuard<'a> {
    shared: &'a Shared,
    coord: RegionCoord,
    pending: &'a Pending,
    armed: bool,
}

impl GenerationGuard<'_> {
    fn publish(mut self, result: GenResult<RegionHandle>) -> GenResult<RegionHandle> {
        self.armed = false;

        {
            let mut slots = self.shared.slots.lock();
            match &result {
                Ok(region) => {
                    slots.remove(&self.coord);
                    self.shared.make_room(&mut slots);
                    slots.insert(
                        self.coord,
                        Slot::Cached {
                            region: Arc::clone(region),
                            last_access: self.shared.tick(),
                        },
                    );
                    Counters::bump(&self.shared.counters.generated);
                }
                Err(_) => {
                    slots.remove(&self.coord);
                    Counters::bump(&self.shared.counters.failed);
                }
            }
        }

        self.pending.complete(result.clone());
        result
    }
}

impl Drop for GenerationGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        {
            let mut slots = self.shared.slots.lock();
            if let Some(Slot::Generating(current)) = slots.get(&self.coord) {
                if Arc::ptr_eq(current, self.pending) {
                    slots.remove(&self.coord);
                }
            }
        }

        Counters::bump(&self.shared.counters.failed);
        tracing::warn!("Generation of region {} aborted", self.coord);
        self.pending
            .complete(Err(GenerationError::Aborted(self.coord)));
    }
}

/// Region cache shared by every lookup.
///
/// All methods take `&self`; share the cache behind an `Arc`.
pub struct TileCache {
    shared: Arc<Shared>,
    hints: Option<Sender<RegionCoord>>,
    workers: Vec<JoinHandle<()>>,
}

impl TileCache {
    /// Creates a cache and starts `settings.warmup_threads` warm-up workers.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SettingsError::Invalid`] if the settings fail
    /// [`WorldSettings::validate`].
    pub fn new(settings: Arc<WorldSettings>, sampler: Arc<dyn Sampler>) -> SettingsResult<Self> {
        settings.validate()?;

        let shared = Arc::new(Shared {
            settings,
            sampler,
            slots: Mutex::new(HashMap::new()),
            clock: AtomicU64::new(0),
            counters: Counters::default(),
            shutdown: AtomicBool::new(false),
        });

        let thread_count = shared.settings.warmup_threads;
        if thread_count == 0 {
            return Ok(Self {
                shared,
                hints: None,
                workers: Vec::new(),
            });
        }

        let (sender, receiver) = bounded(shared.settings.warmup_queue.max(1));
        let mut workers = Vec::with_capacity(thread_count);

        for id in 0..thread_count {
            let worker_shared = Arc::clone(&shared);
            let worker_receiver = receiver.clone();

            let spawned = std::thread::Builder::new()
                .name(format!("strata-warmup-{id}"))
                .spawn(move || warmup_worker(&worker_shared, &worker_receiver));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(error) => tracing::warn!("Failed to spawn warm-up worker {}: {}", id, error),
            }
        }

        let hints = if workers.is_empty() { None } else { Some(sender) };

        tracing::debug!(
            "Tile cache ready: capacity {}, {} warm-up workers",
            shared.settings.cache_capacity,
            workers.len()
        );

        Ok(Self {
            shared,
            hints,
            workers,
        })
    }

    /// Generation settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &WorldSettings {
        &self.shared.settings
    }

    /// Shared settings handle.
    #[inline]
    #[must_use]
    pub fn settings_arc(&self) -> &Arc<WorldSettings> {
        &self.shared.settings
    }

    /// Sampler used for generation.
    #[inline]
    #[must_use]
    pub fn sampler(&self) -> &dyn Sampler {
        &*self.shared.sampler
    }

    /// Region coordinate containing a chunk coordinate (floor division).
    #[inline]
    #[must_use]
    pub fn chunk_to_region(&self, chunk: i32) -> i32 {
        chunk.div_euclid(self.settings().region_chunks as i32)
    }

    /// Region coordinate containing a block coordinate (floor division).
    #[inline]
    #[must_use]
    pub fn block_to_region(&self, block: i32) -> i32 {
        block.div_euclid(self.settings().region_size())
    }

    /// Returns the region, generating it or joining an in-flight
    /// generation if necessary.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the sampler failed. The failure is
    /// not cached; the next call retries.
    pub fn get_region(&self, region_x: i32, region_z: i32) -> GenResult<RegionHandle> {
        self.shared.get_region(RegionCoord::new(region_x, region_z))
    }

    /// Returns the region containing a chunk.
    ///
    /// # Errors
    ///
    /// As [`Self::get_region`].
    pub fn get_region_for_chunk(&self, chunk_x: i32, chunk_z: i32) -> GenResult<RegionHandle> {
        self.get_region(self.chunk_to_region(chunk_x), self.chunk_to_region(chunk_z))
    }

    /// Returns the region containing a block.
    ///
    /// # Errors
    ///
    /// As [`Self::get_region`].
    pub fn get_region_for_block(&self, block_x: i32, block_z: i32) -> GenResult<RegionHandle> {
        self.get_region(self.block_to_region(block_x), self.block_to_region(block_z))
    }

    /// Returns a reader for one chunk, generating its region if needed.
    ///
    /// # Errors
    ///
    /// As [`Self::get_region`].
    pub fn chunk(&self, chunk_x: i32, chunk_z: i32) -> GenResult<ChunkReader> {
        let region = self.get_region_for_chunk(chunk_x, chunk_z)?;
        Ok(ChunkReader::new(
            region,
            chunk_x,
            chunk_z,
            self.settings().chunk_edge(),
        ))
    }

    /// Returns the region only if it is already cached. Counts as an access.
    #[must_use]
    pub fn peek(&self, region_x: i32, region_z: i32) -> Option<RegionHandle> {
        let mut slots = self.shared.slots.lock();
        match slots.get_mut(&RegionCoord::new(region_x, region_z)) {
            Some(Slot::Cached {
                region,
                last_access,
            }) => {
                *last_access = self.shared.tick();
                Counters::bump(&self.shared.counters.hits);
                Some(Arc::clone(region))
            }
            _ => None,
        }
    }

    /// Hints that a region will be needed soon.
    ///
    /// Never blocks. The hint is dropped if the region is already present,
    /// the queue is full, or warm-up is disabled.
    pub fn queue_region(&self, region_x: i32, region_z: i32) {
        let coord = RegionCoord::new(region_x, region_z);

        if self.shared.slots.lock().contains_key(&coord) {
            return;
        }

        let Some(hints) = &self.hints else {
            Counters::bump(&self.shared.counters.dropped_hints);
            tracing::trace!("Warm-up disabled, dropping hint for region {}", coord);
            return;
        };

        match hints.try_send(coord) {
            Ok(()) => Counters::bump(&self.shared.counters.queued),
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                Counters::bump(&self.shared.counters.dropped_hints);
                tracing::trace!("Warm-up queue full, dropping hint for region {}", coord);
            }
        }
    }

    /// Hints that the region containing a chunk will be needed soon.
    pub fn queue_chunk(&self, chunk_x: i32, chunk_z: i32) {
        self.queue_region(self.chunk_to_region(chunk_x), self.chunk_to_region(chunk_z));
    }

    /// Returns whether the region is cached (not merely generating).
    #[must_use]
    pub fn contains(&self, region_x: i32, region_z: i32) -> bool {
        self.shared.contains(RegionCoord::new(region_x, region_z))
    }

    /// Number of cached regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared
            .slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Cached { .. }))
            .count()
    }

    /// Returns whether no region is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached region no caller is holding.
    ///
    /// In-flight generations are left alone.
    pub fn clear(&self) {
        let mut slots = self.shared.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Generating(_) => true,
            Slot::Cached { region, .. } => Arc::strong_count(region) > 1,
        });
        tracing::debug!("Cleared {} regions", before - slots.len());
    }

    /// Returns a snapshot of the cache counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let counters = &self.shared.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            waits: counters.waits.load(Ordering::Relaxed),
            generated: counters.generated.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            evicted: counters.evicted.load(Ordering::Relaxed),
            queued: counters.queued.load(Ordering::Relaxed),
            dropped_hints: counters.dropped_hints.load(Ordering::Relaxed),
            cached: self.len(),
        }
    }
}

impl Drop for TileCache {
    fn drop(&mut self) {
        // Pending hints are discarded, not generated.
        self.shared.shutdown.store(true, Ordering::Release);
        self.hints = None;
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::warn!("Warm-up worker exited with a panic");
            }
        }
    }
}

impl std::fmt::Debug for TileCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileCache")
            .field("cached", &self.len())
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

fn warmup_worker(shared: &Shared, hints: &Receiver<RegionCoord>) {
    for coord in hints {
        if shared.shutdown.load(Ordering::Acquire) {
            tracing::trace!("Warm-up stopping, {} hints discarded", hints.len() + 1);
            break;
        }
        if shared.contains(coord) {
            continue;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| shared.get_region(coord))) {
            Ok(Ok(_)) => {}
            Ok(Err(error)) => tracing::warn!("Warm-up of region {} failed: {}", coord, error),
            Err(_) => tracing::warn!("Warm-up of region {} panicked", coord),
        }
    }
}
