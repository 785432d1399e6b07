//! # Regions
//!
//! A region is a square grid of cells covering `region_chunks x
//! region_chunks` chunks. It is the unit of generation and caching.
//!
//! ## Layout
//!
//! Cells are stored row-major, Z outer and X inner:
//!
//! ```text
//! index = local_z * size + local_x
//! ```
//!
//! A region is built in one pass and never mutated afterwards, so a
//! published region can be shared freely behind an `Arc`.

use std::fmt;
use std::sync::Arc;

use crate::cell::Cell;
use crate::error::{GenResult, GenerationError};
use crate::sampler::Sampler;
use crate::settings::WorldSettings;

/// Region coordinate (identifies a region in the world grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionCoord {
    /// X coordinate (in regions, not blocks).
    pub x: i32,
    /// Z coordinate (in regions, not blocks).
    pub z: i32,
}

impl RegionCoord {
    /// Creates a new region coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing a world block, for a region edge of `size` cells.
    #[inline]
    #[must_use]
    pub const fn from_block_pos(block_x: i32, block_z: i32, size: i32) -> Self {
        Self {
            x: block_x.div_euclid(size),
            z: block_z.div_euclid(size),
        }
    }
}

impl fmt::Display for RegionCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Shared handle to a cached region.
pub type RegionHandle = Arc<Region>;

/// An immutable grid of generated cells.
pub struct Region {
    coord: RegionCoord,
    size: i32,
    origin_x: i32,
    origin_z: i32,
    cells: Box<[Cell]>,
}

impl Region {
    /// Generates a region by sampling every column once, row-major.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Sampler`] for the first column the
    /// sampler fails on. No partial region is returned.
    pub fn generate(
        coord: RegionCoord,
        settings: &WorldSettings,
        sampler: &dyn Sampler,
    ) -> GenResult<Self> {
        let size = settings.region_size();
        let origin_x = coord.x.wrapping_mul(size);
        let origin_z = coord.z.wrapping_mul(size);

        let edge = size as usize;
        let mut cells = Vec::with_capacity(edge * edge);

        for dz in 0..size {
            for dx in 0..size {
                let x = origin_x.wrapping_add(dx);
                let z = origin_z.wrapping_add(dz);

                let sample = sampler
                    .sample(settings.seed, x, z)
                    .map_err(|source| GenerationError::Sampler {
                        region: coord,
                        x,
                        z,
                        source,
                    })?;

                cells.push(Cell::from_sample(&sample));
            }
        }

        Ok(Self {
            coord,
            size,
            origin_x,
            origin_z,
            cells: cells.into_boxed_slice(),
        })
    }

    /// Region coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> RegionCoord {
        self.coord
    }

    /// Edge length in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// World coordinates of the region's minimum corner.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_z)
    }

    /// All cells, row-major.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Returns the cell at local coordinates.
    ///
    /// # Panics
    ///
    /// Panics if either coordinate is outside `0..size`.
    #[inline]
    #[must_use]
    pub fn cell_at(&self, local_x: i32, local_z: i32) -> &Cell {
        assert!(
            (0..self.size).contains(&local_x) && (0..self.size).contains(&local_z),
            "local ({local_x}, {local_z}) outside region of size {}",
            self.size
        );
        &self.cells[(local_z * self.size + local_x) as usize]
    }

    /// Returns whether a world coordinate lies inside this region.
    #[inline]
    #[must_use]
    pub fn contains_world(&self, x: i32, z: i32) -> bool {
        let dx = i64::from(x) - i64::from(self.origin_x);
        let dz = i64::from(z) - i64::from(self.origin_z);
        let size = i64::from(self.size);
        (0..size).contains(&dx) && (0..size).contains(&dz)
    }

    /// Returns the cell at world coordinates, or `None` outside the region.
    #[inline]
    #[must_use]
    pub fn cell_at_world(&self, x: i32, z: i32) -> Option<&Cell> {
        if !self.contains_world(x, z) {
            return None;
        }
        Some(self.cell_at(x.wrapping_sub(self.origin_x), z.wrapping_sub(self.origin_z)))
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("coord", &self.coord)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Read view of one chunk inside a cached region.
///
/// Holds the region alive (and therefore pinned in the cache) for as long
/// as the reader exists.
#[derive(Clone, Debug)]
pub struct ChunkReader {
    region: RegionHandle,
    chunk_x: i32,
    chunk_z: i32,
    local_x: i32,
    local_z: i32,
    size: i32,
}

impl ChunkReader {
    /// Creates a reader for chunk `(chunk_x, chunk_z)`.
    ///
    /// # Panics
    ///
    /// Panics if the chunk does not lie inside `region`.
    #[must_use]
    pub fn new(region: RegionHandle, chunk_x: i32, chunk_z: i32, chunk_size: i32) -> Self {
        let (origin_x, origin_z) = region.origin();
        let local_x = chunk_x.wrapping_mul(chunk_size).wrapping_sub(origin_x);
        let local_z = chunk_z.wrapping_mul(chunk_size).wrapping_sub(origin_z);

        assert!(
            local_x >= 0
                && local_z >= 0
                && local_x + chunk_size <= region.size()
                && local_z + chunk_size <= region.size(),
            "chunk ({chunk_x}, {chunk_z}) is not inside region {}",
            region.coord()
        );

        Self {
            region,
            chunk_x,
            chunk_z,
            local_x,
            local_z,
            size: chunk_size,
        }
    }

    /// Chunk X coordinate.
    #[inline]
    #[must_use]
    pub const fn chunk_x(&self) -> i32 {
        self.chunk_x
    }

    /// Chunk Z coordinate.
    #[inline]
    #[must_use]
    pub const fn chunk_z(&self) -> i32 {
        self.chunk_z
    }

    /// Chunk edge in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> i32 {
        self.size
    }

    /// Region backing this chunk.
    #[inline]
    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Returns the cell at chunk-local coordinates.
    ///
    /// # Panics
    ///
    /// Panics if either coordinate is outside `0..size`.
    #[must_use]
    pub fn cell(&self, block_x: i32, block_z: i32) -> &Cell {
        assert!(
            (0..self.size).contains(&block_x) && (0..self.size).contains(&block_z),
            "block ({block_x}, {block_z}) outside chunk of size {}",
            self.size
        );
        self.region
            .cell_at(self.local_x + block_x, self.local_z + block_z)
    }

    /// Iterates `(block_x, block_z, cell)` row-major.
    pub fn iter(&self) -> impl Iterator<Item = (i32, i32, &Cell)> + '_ {
        (0..self.size).flat_map(move |z| (0..self.size).map(move |x| (x, z, self.cell(x, z))))
    }
}
