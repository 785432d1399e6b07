//! # World Lookup
//!
//! Point queries against the world, backed by the tile cache and a pool
//! of scratch cells.
//!
//! ## Paths
//!
//! - **Populating**: block until the containing region is cached, then copy
//!   the cell out of it.
//! - **Non-populating**: use the region if it is already cached, otherwise
//!   sample the single column directly and hint the region for warm-up.
//!
//! Both paths run the same sampler with the same seed, so they return
//! identical cells.

use std::ops::ControlFlow;
use std::sync::Arc;

use strata_core::{PoolStats, Resource, ResourcePool};

use crate::cache::TileCache;
use crate::cell::Cell;
use crate::error::{GenResult, GenerationError};
use crate::region::{Region, RegionCoord};
use crate::settings::WorldSettings;

/// Rectangular, inclusive area walked by [`WorldLookup::scan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanArea {
    /// Minimum X (inclusive).
    pub min_x: i32,
    /// Minimum Z (inclusive).
    pub min_z: i32,
    /// Maximum X (inclusive).
    pub max_x: i32,
    /// Maximum Z (inclusive).
    pub max_z: i32,
    /// Step between visited points. 0 is treated as 1.
    pub stride: u32,
}

impl ScanArea {
    /// Creates an area visiting every point.
    #[must_use]
    pub const fn new(min_x: i32, min_z: i32, max_x: i32, max_z: i32) -> Self {
        Self {
            min_x,
            min_z,
            max_x,
            max_z,
            stride: 1,
        }
    }

    /// Square area of `radius` blocks around a center.
    #[must_use]
    pub const fn around(center_x: i32, center_z: i32, radius: i32) -> Self {
        Self::new(
            center_x.saturating_sub(radius),
            center_z.saturating_sub(radius),
            center_x.saturating_add(radius),
            center_z.saturating_add(radius),
        )
    }

    /// Sets the step between visited points.
    #[must_use]
    pub const fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    /// Visited coordinates, row-major (Z outer, X inner).
    pub fn points(&self) -> impl Iterator<Item = (i32, i32)> {
        let step = self.stride.max(1) as usize;
        let (min_x, max_x) = (self.min_x, self.max_x);
        (self.min_z..=self.max_z)
            .step_by(step)
            .flat_map(move |z| (min_x..=max_x).step_by(step).map(move |x| (x, z)))
    }
}

/// Coordinate queries over the generated world.
pub struct WorldLookup {
    cache: Arc<TileCache>,
    pool: ResourcePool<Cell>,
}

impl WorldLookup {
    /// Creates a lookup over a cache. The cell pool keeps at most
    /// `pool_soft_cap` idle cells.
    #[must_use]
    pub fn new(cache: Arc<TileCache>) -> Self {
        let pool = ResourcePool::with_default(cache.settings().pool_soft_cap);
        Self { cache, pool }
    }

    /// The backing cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Generation settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &WorldSettings {
        self.cache.settings()
    }

    /// Statistics of the cell pool.
    #[must_use]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Returns the cell at `(x, z)` in a pooled handle.
    ///
    /// With `populate` the containing region is generated (or waited on)
    /// first; without it the call never blocks on generation.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the sampler fails. The pooled cell
    /// is returned to the pool on that path too.
    pub fn get_cell(&self, x: i32, z: i32, populate: bool) -> GenResult<Resource<'_, Cell>> {
        let mut cell = self.pool.acquire();

        if populate {
            let region = self.cache.get_region_for_block(x, z)?;
            copy_from_region(&region, x, z, &mut cell);
        } else {
            self.apply_cell(&mut cell, x, z)?;
        }

        Ok(cell)
    }

    /// Writes the cell at `(x, z)` into a caller-owned cell without
    /// blocking on region generation.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Sampler`] if the direct sample fails.
    pub fn apply_cell(&self, cell: &mut Cell, x: i32, z: i32) -> GenResult<()> {
        let region_x = self.cache.block_to_region(x);
        let region_z = self.cache.block_to_region(z);

        if let Some(region) = self.cache.peek(region_x, region_z) {
            copy_from_region(&region, x, z, cell);
            return Ok(());
        }

        let sample = self
            .cache
            .sampler()
            .sample(self.settings().seed, x, z)
            .map_err(|source| GenerationError::Sampler {
                region: RegionCoord::new(region_x, region_z),
                x,
                z,
                source,
            })?;

        cell.apply_sample(&sample);
        self.cache.queue_region(region_x, region_z);
        Ok(())
    }

    /// Walks `area`, loading each point into `buffer` and handing it to
    /// `visit`. Returning `ControlFlow::Break` stops the walk.
    ///
    /// Returns the number of points visited.
    ///
    /// # Errors
    ///
    /// Stops at the first point whose sample fails.
    pub fn scan<F>(&self, area: ScanArea, buffer: &mut Cell, mut visit: F) -> GenResult<usize>
    where
        F: FnMut(i32, i32, &Cell) -> ControlFlow<()>,
    {
        let mut visited = 0;

        for (x, z) in area.points() {
            self.apply_cell(buffer, x, z)?;
            visited += 1;
            if visit(x, z, buffer).is_break() {
                break;
            }
        }

        Ok(visited)
    }
}

impl std::fmt::Debug for WorldLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorldLookup")
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .finish()
    }
}

fn copy_from_region(region: &Region, x: i32, z: i32, cell: &mut Cell) {
    let size = region.size();
    cell.copy_from(region.cell_at(x.rem_euclid(size), z.rem_euclid(size)));
}
