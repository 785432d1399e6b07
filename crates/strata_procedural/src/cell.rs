//! # Cells
//!
//! A cell is the generation result for one world column: normalized
//! height, terrain category, climate type and the biome identity used to
//! pick between biomes of the same category.
//!
//! Cells are plain, reusable records. They are overwritten in place by
//! region generation and by pooled lookups, so a cell borrowed from a pool
//! must not outlive its lease.

use serde::{Deserialize, Serialize};

use crate::sampler::Sample;

/// Largest identity value a cell can hold (identity lives in `[0, 1)`).
pub const MAX_IDENTITY: f32 = 1.0 - f32::EPSILON;

/// Terrain category of a cell.
///
/// The discriminants are dense so categories can index arrays directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TerrainCategory {
    /// Open ocean far below sea level.
    DeepOcean = 0,
    /// Ocean below sea level.
    Ocean = 1,
    /// Shallow water along a shore.
    Coast = 2,
    /// Land just above sea level next to water.
    Beach = 3,
    /// Inland standing water.
    Lake = 4,
    /// Flowing inland water.
    River = 5,
    /// Waterlogged lowland.
    Wetland = 6,
    /// Flat, low land.
    #[default]
    Plains = 7,
    /// Rolling land.
    Hills = 8,
    /// High, flat land.
    Plateau = 9,
    /// Steep, high land.
    Mountains = 10,
}

impl TerrainCategory {
    /// Number of terrain categories.
    pub const COUNT: usize = 11;

    /// Every category, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::DeepOcean,
        Self::Ocean,
        Self::Coast,
        Self::Beach,
        Self::Lake,
        Self::River,
        Self::Wetland,
        Self::Plains,
        Self::Hills,
        Self::Plateau,
        Self::Mountains,
    ];

    /// Dense index of this category.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the category for a dense index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns whether the surface of this category is water.
    #[inline]
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(
            self,
            Self::DeepOcean | Self::Ocean | Self::Coast | Self::Lake | Self::River
        )
    }

    /// Returns whether biomes for this category are chosen by terrain
    /// rather than by climate.
    #[inline]
    #[must_use]
    pub const fn overrides_climate(self) -> bool {
        !matches!(self, Self::Plains | Self::Hills | Self::Plateau)
    }
}

/// Climate type of a cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BiomeType {
    /// Hot and wet.
    TropicalRainforest = 0,
    /// Hot, seasonally dry.
    Savanna = 1,
    /// Hot and dry.
    Desert = 2,
    /// Mild and very wet.
    TemperateRainforest = 3,
    /// Mild and wet.
    TemperateForest = 4,
    /// Mild and moderately dry.
    #[default]
    Grassland = 5,
    /// Cool and dry.
    ColdSteppe = 6,
    /// Mild and dry.
    Steppe = 7,
    /// Cold and wet.
    Taiga = 8,
    /// Very cold.
    Tundra = 9,
    /// Cold, high altitude.
    Alpine = 10,
}

impl BiomeType {
    /// Number of climate types.
    pub const COUNT: usize = 11;

    /// Every climate type, in index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::TropicalRainforest,
        Self::Savanna,
        Self::Desert,
        Self::TemperateRainforest,
        Self::TemperateForest,
        Self::Grassland,
        Self::ColdSteppe,
        Self::Steppe,
        Self::Taiga,
        Self::Tundra,
        Self::Alpine,
    ];

    /// Climate lookup grid, indexed `[temperature band][moisture band]`
    /// from cold/dry to hot/wet.
    const CLIMATE_GRID: [[Self; 4]; 4] = [
        [Self::Tundra, Self::Tundra, Self::Taiga, Self::Taiga],
        [Self::ColdSteppe, Self::Steppe, Self::TemperateForest, Self::TemperateRainforest],
        [Self::Steppe, Self::Grassland, Self::TemperateForest, Self::TemperateRainforest],
        [Self::Desert, Self::Savanna, Self::Savanna, Self::TropicalRainforest],
    ];

    /// Dense index of this climate type.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the climate type for a dense index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Picks a climate type from normalized temperature and moisture.
    ///
    /// Both inputs are clamped to `[0, 1]`.
    #[must_use]
    pub fn from_climate(temperature: f32, moisture: f32) -> Self {
        let band = |value: f32| -> usize {
            let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
            ((value * 4.0) as usize).min(3)
        };
        Self::CLIMATE_GRID[band(temperature)][band(moisture)]
    }
}

/// Generation result for one world column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    height: f32,
    terrain: TerrainCategory,
    biome_type: BiomeType,
    identity: f32,
    temperature: f32,
    moisture: f32,
}

impl Cell {
    /// Creates a cell with all fields at their defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cell from a sampler result.
    #[must_use]
    pub fn from_sample(sample: &Sample) -> Self {
        let mut cell = Self::new();
        cell.apply_sample(sample);
        cell
    }

    /// Overwrites every field from a sampler result.
    pub fn apply_sample(&mut self, sample: &Sample) {
        self.height = sample.height;
        self.terrain = sample.terrain;
        self.biome_type = sample.biome_type;
        self.set_identity(sample.identity);
        self.temperature = sample.temperature;
        self.moisture = sample.moisture;
    }

    /// Overwrites every field with those of `other`.
    #[inline]
    pub fn copy_from(&mut self, other: &Self) {
        self.clone_from(other);
    }

    /// Normalized height (0 = world bottom, 1 = world top).
    #[inline]
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Sets the normalized height.
    #[inline]
    pub fn set_height(&mut self, height: f32) {
        self.height = height;
    }

    /// Terrain category.
    #[inline]
    #[must_use]
    pub const fn terrain(&self) -> TerrainCategory {
        self.terrain
    }

    /// Sets the terrain category.
    #[inline]
    pub fn set_terrain(&mut self, terrain: TerrainCategory) {
        self.terrain = terrain;
    }

    /// Climate type.
    #[inline]
    #[must_use]
    pub const fn biome_type(&self) -> BiomeType {
        self.biome_type
    }

    /// Sets the climate type.
    #[inline]
    pub fn set_biome_type(&mut self, biome_type: BiomeType) {
        self.biome_type = biome_type;
    }

    /// Biome identity in `[0, 1)`.
    #[inline]
    #[must_use]
    pub const fn identity(&self) -> f32 {
        self.identity
    }

    /// Sets the biome identity, clamped into `[0, 1)`. NaN becomes 0.
    #[inline]
    pub fn set_identity(&mut self, identity: f32) {
        self.identity = if identity.is_nan() {
            0.0
        } else {
            identity.clamp(0.0, MAX_IDENTITY)
        };
    }

    /// Normalized temperature (0 = coldest).
    #[inline]
    #[must_use]
    pub const fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Sets the normalized temperature.
    #[inline]
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }

    /// Normalized moisture (0 = driest).
    #[inline]
    #[must_use]
    pub const fn moisture(&self) -> f32 {
        self.moisture
    }

    /// Sets the normalized moisture.
    #[inline]
    pub fn set_moisture(&mut self, moisture: f32) {
        self.moisture = moisture;
    }
}
