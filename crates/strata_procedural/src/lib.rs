//! # Strata Procedural Generation
//!
//! Streaming terrain and biome data for infinite, reproducible worlds.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same seed and coordinate always produce the same cell
//! 2. **Region cached**: Cells are generated a region at a time and cached
//! 3. **At-most-once**: Concurrent requests for one region share one generation
//! 4. **Injected**: Settings, sampler and biome table are passed in, never global
//!
//! ## Core Components
//!
//! - `Cell`: Per-column generation result
//! - `Sampler` / `TerrainSampler`: Produces raw column values from noise
//! - `Region` / `TileCache`: Region grids and the concurrent cache around them
//! - `WorldLookup`: Point and area queries with pooled cells
//! - `BiomeClassifier`: Cell -> biome mapping over a category table
//! - `BiomeProvider`: World-level biome, height and spawn queries
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_procedural::{BiomeProvider, WorldSettings};
//!
//! let provider = BiomeProvider::from_settings(WorldSettings::with_seed(12345))?;
//!
//! // Blocks until the region around (100, 200) is generated
//! let biome = provider.biome_at(100, 200)?;
//!
//! // Hint the neighbourhood so later lookups hit the cache
//! provider.lookup().cache().queue_chunk(7, 12);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod cache;
pub mod cell;
pub mod error;
pub mod lookup;
pub mod noise;
pub mod provider;
pub mod region;
pub mod sampler;
pub mod settings;

pub use biome::{
    Biome, BiomeClassifier, BiomeId, BiomeTable, BiomeTableBuilder, BiomeTableConfig,
    CategoryKey, ClimateEntry, DefaultBiomeRule, TerrainEntry,
};
pub use cache::{CacheStats, TileCache};
pub use cell::{BiomeType, Cell, TerrainCategory};
pub use error::{GenResult, GenerationError, SamplerError, SettingsError, SettingsResult};
pub use lookup::{ScanArea, WorldLookup};
pub use noise::{CellularNoise, SimplexNoise, WorldSeed};
pub use provider::{BiomeProvider, HeightmapKind};
pub use region::{ChunkReader, Region, RegionCoord, RegionHandle};
pub use sampler::{Sample, Sampler, TerrainSampler};
pub use settings::{Levels, WorldSettings};
