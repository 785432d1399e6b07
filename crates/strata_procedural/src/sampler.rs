//! # Samplers
//!
//! A sampler is the opaque, pure function that turns `(seed, x, z)` into
//! the raw values of one cell. Regions call it once per column; direct
//! lookups call it for single points. Because both paths go through the
//! same sampler with the same seed, cached and uncached answers agree.
//!
//! `TerrainSampler` is the bundled implementation: layered simplex noise
//! for elevation and climate, cellular noise for biome identity.

use crate::cell::{BiomeType, TerrainCategory};
use crate::error::SamplerError;
use crate::noise::{CellularNoise, SimplexNoise, WorldSeed};
use crate::settings::Levels;

/// Raw values produced by a sampler for one world column.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Normalized height in `[0, 1]`.
    pub height: f32,
    /// Terrain category.
    pub terrain: TerrainCategory,
    /// Climate type.
    pub biome_type: BiomeType,
    /// Biome identity in `[0, 1)`.
    pub identity: f32,
    /// Normalized temperature in `[0, 1]`.
    pub temperature: f32,
    /// Normalized moisture in `[0, 1]`.
    pub moisture: f32,
}

impl Sample {
    /// Creates a sample with temperate climate values.
    #[must_use]
    pub const fn new(
        height: f32,
        terrain: TerrainCategory,
        biome_type: BiomeType,
        identity: f32,
    ) -> Self {
        Self {
            height,
            terrain,
            biome_type,
            identity,
            temperature: 0.5,
            moisture: 0.5,
        }
    }

    /// Sets temperature and moisture.
    #[must_use]
    pub const fn with_climate(mut self, temperature: f32, moisture: f32) -> Self {
        self.temperature = temperature;
        self.moisture = moisture;
        self
    }
}

/// Source of per-column generation data.
///
/// Implementations must be pure: the same `(seed, x, z)` always yields the
/// same sample. Region caching relies on it.
pub trait Sampler: Send + Sync {
    /// Samples the column at world coordinates `(x, z)`.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError`] if the column cannot be computed. The
    /// error is handed to whoever requested the region or cell.
    fn sample(&self, seed: WorldSeed, x: i32, z: i32) -> Result<Sample, SamplerError>;
}

impl<F> Sampler for F
where
    F: Fn(WorldSeed, i32, i32) -> Result<Sample, SamplerError> + Send + Sync,
{
    #[inline]
    fn sample(&self, seed: WorldSeed, x: i32, z: i32) -> Result<Sample, SamplerError> {
        self(seed, x, z)
    }
}

/// Default noise-driven sampler.
///
/// Noise tables are built for one seed at construction; asking for a
/// different seed is an error rather than a silent reseed.
pub struct TerrainSampler {
    seed: WorldSeed,
    /// Sea level as a normalized height.
    water_level: f32,
    elevation: SimplexNoise,
    temperature: SimplexNoise,
    moisture: SimplexNoise,
    rivers: SimplexNoise,
    lakes: SimplexNoise,
    identity: CellularNoise,
}

impl TerrainSampler {
    /// Scale for elevation noise (larger = more gradual changes).
    const ELEVATION_SCALE: f64 = 0.0025;
    /// Scale for temperature noise.
    const TEMPERATURE_SCALE: f64 = 0.002;
    /// Scale for moisture noise.
    const MOISTURE_SCALE: f64 = 0.003;
    /// Scale for river channels.
    const RIVER_SCALE: f64 = 0.0015;
    /// Scale for lake basins.
    const LAKE_SCALE: f64 = 0.004;
    /// Average biome width in blocks.
    const BIOME_SIZE: f64 = 192.0;

    /// Creates a sampler for `seed` using the world's height levels.
    #[must_use]
    pub fn new(seed: WorldSeed, levels: &Levels) -> Self {
        Self {
            seed,
            water_level: levels.water_height(),
            elevation: SimplexNoise::new(seed.derive(1)),
            temperature: SimplexNoise::new(seed.derive(2)),
            moisture: SimplexNoise::new(seed.derive(3)),
            rivers: SimplexNoise::new(seed.derive(4)),
            lakes: SimplexNoise::new(seed.derive(5)),
            identity: CellularNoise::new(seed.derive(6), Self::BIOME_SIZE, 0.8),
        }
    }

    /// Returns the seed the noise tables were built for.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Raw elevation in `[-1, 1]`, 0 at sea level.
    fn elevation(&self, x: f64, z: f64) -> f64 {
        let base = self.elevation.fbm(
            x * Self::ELEVATION_SCALE,
            z * Self::ELEVATION_SCALE,
            4,
            0.5,
            2.0,
        );
        let ridged = self.elevation.ridged(
            x * Self::ELEVATION_SCALE * 1.5,
            z * Self::ELEVATION_SCALE * 1.5,
            3,
            0.5,
            2.0,
        );

        // Ridges only lift land that is already high.
        let lift = if base > 0.2 { ridged * (base - 0.2) } else { 0.0 };
        (base + lift).clamp(-1.0, 1.0)
    }

    fn classify_terrain(&self, elevation: f64, moisture: f32, x: f64, z: f64) -> TerrainCategory {
        match elevation {
            e if e < -0.45 => return TerrainCategory::DeepOcean,
            e if e < -0.15 => return TerrainCategory::Ocean,
            e if e < -0.03 => return TerrainCategory::Coast,
            e if e < 0.02 => return TerrainCategory::Beach,
            _ => {}
        }

        let river = self.rivers.fbm(x * Self::RIVER_SCALE, z * Self::RIVER_SCALE, 2, 0.5, 2.0);
        if river.abs() < 0.015 && elevation < 0.35 {
            return TerrainCategory::River;
        }

        let lake = self.lakes.sample(x * Self::LAKE_SCALE, z * Self::LAKE_SCALE);
        if lake > 0.8 && elevation < 0.2 {
            return TerrainCategory::Lake;
        }

        if moisture > 0.8 && elevation < 0.1 {
            return TerrainCategory::Wetland;
        }

        match elevation {
            e if e > 0.55 => TerrainCategory::Mountains,
            e if e > 0.4 => TerrainCategory::Plateau,
            e if e > 0.22 => TerrainCategory::Hills,
            _ => TerrainCategory::Plains,
        }
    }
}

impl Sampler for TerrainSampler {
    fn sample(&self, seed: WorldSeed, x: i32, z: i32) -> Result<Sample, SamplerError> {
        if seed != self.seed {
            return Err(SamplerError::new(format!(
                "sampler built for seed {} was asked for seed {}",
                self.seed.value(),
                seed.value()
            )));
        }

        let fx = f64::from(x);
        let fz = f64::from(z);

        let elevation = self.elevation(fx, fz);

        let height = if elevation < 0.0 {
            f64::from(self.water_level) * (1.0 + elevation)
        } else {
            f64::from(self.water_level) + elevation * f64::from(1.0 - self.water_level)
        };

        let warmth = self
            .temperature
            .fbm(fx * Self::TEMPERATURE_SCALE, fz * Self::TEMPERATURE_SCALE, 2, 0.5, 2.0);
        let temperature = ((warmth + 1.0) * 0.5 - elevation.max(0.0) * 0.5).clamp(0.0, 1.0) as f32;

        let wetness = self
            .moisture
            .fbm(fx * Self::MOISTURE_SCALE, fz * Self::MOISTURE_SCALE, 4, 0.5, 2.0);
        let moisture = ((wetness + 1.0) * 0.5).clamp(0.0, 1.0) as f32;

        let terrain = self.classify_terrain(elevation, moisture, fx, fz);

        let biome_type = if elevation > 0.4 && temperature < 0.35 {
            BiomeType::Alpine
        } else {
            BiomeType::from_climate(temperature, moisture)
        };

        Ok(Sample {
            height: height.clamp(0.0, 1.0) as f32,
            terrain,
            biome_type,
            identity: self.identity.value(fx, fz),
            temperature,
            moisture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler(seed: u64) -> TerrainSampler {
        TerrainSampler::new(WorldSeed::new(seed), &Levels::default())
    }

    #[test]
    fn test_sampler_determinism() {
        let a = sampler(42);
        let b = sampler(42);
        let seed = WorldSeed::new(42);

        for i in 0..200 {
            let x = i * 37 - 3000;
            let z = i * -53 + 1200;
            assert_eq!(
                a.sample(seed, x, z).unwrap(),
                b.sample(seed, x, z).unwrap(),
                "Sampling must be deterministic at ({x}, {z})"
            );
        }
    }

    #[test]
    fn test_sample_ranges() {
        let sampler = sampler(7);
        let seed = WorldSeed::new(7);

        for i in 0..2_000 {
            let sample = sampler.sample(seed, i * 13 - 10_000, i * 7 - 5_000).unwrap();
            assert!((0.0..=1.0).contains(&sample.height), "Height {} out of range", sample.height);
            assert!((0.0..1.0).contains(&sample.identity));
            assert!((0.0..=1.0).contains(&sample.temperature));
            assert!((0.0..=1.0).contains(&sample.moisture));
        }
    }

    #[test]
    fn test_water_terrain_below_sea_level() {
        let levels = Levels::default();
        let sampler = sampler(99);
        let seed = WorldSeed::new(99);

        for i in 0..2_000 {
            let sample = sampler.sample(seed, i * 31, i * -17).unwrap();
            if matches!(sample.terrain, TerrainCategory::Ocean | TerrainCategory::DeepOcean) {
                assert!(
                    sample.height < levels.water_height(),
                    "Ocean at height {} above water level",
                    sample.height
                );
            }
        }
    }

    #[test]
    fn test_seed_mismatch_is_error() {
        let sampler = sampler(1);
        assert!(sampler.sample(WorldSeed::new(2), 0, 0).is_err());
    }

    #[test]
    fn test_several_terrains_reachable() {
        let sampler = sampler(12345);
        let seed = WorldSeed::new(12345);
        let mut found = std::collections::HashSet::new();

        for x in (-4000..4000).step_by(97) {
            for z in (-4000..4000).step_by(89) {
                found.insert(sampler.sample(seed, x, z).unwrap().terrain);
            }
        }

        assert!(found.len() >= 4, "Should find several terrain categories, found: {found:?}");
    }

    #[test]
    fn test_closure_sampler() {
        let flat = |_seed: WorldSeed, x: i32, _z: i32| -> Result<Sample, SamplerError> {
            Ok(Sample::new(0.5, TerrainCategory::Plains, BiomeType::Grassland, (x.rem_euclid(10) as f32) / 10.0))
        };

        let sample = flat.sample(WorldSeed::new(0), 3, 0).unwrap();
        assert_eq!(sample.terrain, TerrainCategory::Plains);
        assert!((sample.identity - 0.3).abs() < f32::EPSILON);
    }
}
