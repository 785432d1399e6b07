//! # Biome Provider
//!
//! World-level queries built on the lookup and the classifier: biome at a
//! point, biomes around a point, locating a biome, heightmaps and spawn
//! checks.
//!
//! Area queries walk a quarter-resolution grid (every 4th block), the
//! same resolution as [`BiomeProvider::noise_biome`].

use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::biome::{BiomeClassifier, BiomeId};
use crate::cache::TileCache;
use crate::cell::{Cell, TerrainCategory};
use crate::error::{GenResult, SettingsResult};
use crate::lookup::{ScanArea, WorldLookup};
use crate::sampler::TerrainSampler;
use crate::settings::WorldSettings;

/// Blocks per quarter-resolution step.
const QUARTER: i32 = 4;

/// Which surface a height query measures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeightmapKind {
    /// Top of the world column, never below the water surface.
    Surface,
    /// Top of the solid ground, which may lie under water.
    OceanFloor,
}

/// Biome queries over a generated world.
#[derive(Debug)]
pub struct BiomeProvider {
    lookup: WorldLookup,
    classifier: BiomeClassifier,
}

impl BiomeProvider {
    /// Creates a provider from its parts.
    #[must_use]
    pub fn new(lookup: WorldLookup, classifier: BiomeClassifier) -> Self {
        Self { lookup, classifier }
    }

    /// Builds the full default stack: terrain sampler, tile cache, lookup
    /// and the standard biome table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SettingsError::Invalid`] if the settings fail
    /// validation.
    pub fn from_settings(settings: WorldSettings) -> SettingsResult<Self> {
        let sampler = Arc::new(TerrainSampler::new(settings.seed, &settings.levels));
        let cache = Arc::new(TileCache::new(Arc::new(settings), sampler)?);

        Ok(Self::new(WorldLookup::new(cache), BiomeClassifier::standard()))
    }

    /// The underlying lookup.
    #[inline]
    #[must_use]
    pub fn lookup(&self) -> &WorldLookup {
        &self.lookup
    }

    /// The classifier.
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &BiomeClassifier {
        &self.classifier
    }

    /// Biome of an already loaded cell.
    #[inline]
    #[must_use]
    pub fn biome_for_cell(&self, cell: &Cell) -> BiomeId {
        self.classifier.classify(cell)
    }

    /// Biome at a block position. Generates the region if needed.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the region cannot be produced.
    pub fn biome_at(&self, x: i32, z: i32) -> GenResult<BiomeId> {
        let cell = self.lookup.get_cell(x, z, true)?;
        Ok(self.classifier.classify(&cell))
    }

    /// Biome at a quarter-resolution position (`x << 2`, `z << 2`).
    ///
    /// Never generates a region: a miss samples the column directly and
    /// queues the region for warm-up.
    ///
    /// # Errors
    ///
    /// Returns the sampler error if the column cannot be sampled.
    pub fn noise_biome(&self, quarter_x: i32, quarter_z: i32) -> GenResult<BiomeId> {
        let cell = self.lookup.get_cell(quarter_x << 2, quarter_z << 2, false)?;
        Ok(self.classifier.classify(&cell))
    }

    /// Distinct biomes within `radius` blocks of a center, sampled every
    /// 4 blocks.
    ///
    /// # Errors
    ///
    /// Returns the first sampler error encountered.
    pub fn biomes_in_radius(
        &self,
        center_x: i32,
        center_z: i32,
        radius: i32,
    ) -> GenResult<BTreeSet<BiomeId>> {
        let mut found = BTreeSet::new();
        let mut buffer = Cell::new();

        self.lookup.scan(
            quarter_area(center_x, center_z, radius),
            &mut buffer,
            |_, _, cell| {
                found.insert(self.classifier.classify(cell));
                ControlFlow::Continue(())
            },
        )?;

        Ok(found)
    }

    /// Picks a uniformly random position within `range` blocks whose biome
    /// is one of `targets`, sampled every 4 blocks.
    ///
    /// Uses reservoir sampling, so every matching position is equally
    /// likely and the walk needs no extra memory.
    ///
    /// # Errors
    ///
    /// Returns the first sampler error encountered.
    pub fn locate_biome<R>(
        &self,
        center_x: i32,
        center_z: i32,
        range: i32,
        targets: &[BiomeId],
        rng: &mut R,
    ) -> GenResult<Option<(i32, i32)>>
    where
        R: Rng,
    {
        let mut chosen = None;
        let mut matches = 0u32;
        let mut buffer = Cell::new();

        self.lookup.scan(
            quarter_area(center_x, center_z, range),
            &mut buffer,
            |x, z, cell| {
                if targets.contains(&self.classifier.classify(cell)) {
                    if chosen.is_none() || rng.gen_range(0..=matches) == 0 {
                        chosen = Some((x, z));
                    }
                    matches += 1;
                }
                ControlFlow::Continue(())
            },
        )?;

        tracing::trace!(
            "Biome search at ({}, {}) range {}: {} matches",
            center_x,
            center_z,
            range,
            matches
        );

        Ok(chosen)
    }

    /// [`Self::locate_biome`] with a reproducible `ChaCha8` stream.
    ///
    /// # Errors
    ///
    /// As [`Self::locate_biome`].
    pub fn locate_biome_seeded(
        &self,
        center_x: i32,
        center_z: i32,
        range: i32,
        targets: &[BiomeId],
        seed: u64,
    ) -> GenResult<Option<(i32, i32)>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.locate_biome(center_x, center_z, range, targets, &mut rng)
    }

    /// Block Y of the requested surface at a position.
    ///
    /// # Errors
    ///
    /// Returns the generation error if the region cannot be produced.
    pub fn height_at(&self, x: i32, z: i32, kind: HeightmapKind) -> GenResult<i32> {
        let cell = self.lookup.get_cell(x, z, true)?;
        let levels = &self.lookup.settings().levels;
        let level = levels.scale(cell.height()) + 1;

        Ok(match kind {
            HeightmapKind::Surface => level.max(levels.water_level),
            HeightmapKind::OceanFloor => level,
        })
    }

    /// Returns whether players may spawn on a cell.
    #[inline]
    #[must_use]
    pub fn can_spawn_at(cell: &Cell) -> bool {
        !matches!(
            cell.terrain(),
            TerrainCategory::Ocean | TerrainCategory::DeepOcean
        )
    }
}

/// Area covering `radius` around a center, snapped to the quarter grid.
fn quarter_area(center_x: i32, center_z: i32, radius: i32) -> ScanArea {
    let snap = |value: i32| (value >> 2) << 2;
    let radius = radius.max(0);

    ScanArea::new(
        snap(center_x.saturating_sub(radius)),
        snap(center_z.saturating_sub(radius)),
        snap(center_x.saturating_add(radius)),
        snap(center_z.saturating_add(radius)),
    )
    .with_stride(QUARTER as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::{Biome, BiomeTable, CategoryKey, DefaultBiomeRule};
    use crate::cell::BiomeType;
    use crate::error::SamplerError;
    use crate::noise::WorldSeed;
    use crate::sampler::Sample;

    fn settings() -> WorldSettings {
        WorldSettings {
            chunk_size: 8,
            region_chunks: 2,
            warmup_threads: 0,
            ..WorldSettings::with_seed(42)
        }
    }

    /// Ocean west of x = 0, plains to the east; identity from z.
    fn split_world(_seed: WorldSeed, x: i32, z: i32) -> Result<Sample, SamplerError> {
        let terrain = if x < 0 { TerrainCategory::Ocean } else { TerrainCategory::Plains };
        let height = if x < 0 { 0.1 } else { 0.5 };
        let identity = if z < 0 { 0.0 } else { 0.9 };
        Ok(Sample::new(height, terrain, BiomeType::Grassland, identity))
    }

    fn split_provider() -> BiomeProvider {
        let settings = Arc::new(settings());
        let cache = Arc::new(TileCache::new(settings, Arc::new(split_world)).unwrap());

        let table = BiomeTable::builder()
            .extend(CategoryKey::Terrain(TerrainCategory::Ocean), [Biome::Ocean])
            .extend(CategoryKey::Climate(BiomeType::Grassland), [Biome::Plains, Biome::Forest])
            .build(DefaultBiomeRule::default());

        BiomeProvider::new(
            WorldLookup::new(cache),
            BiomeClassifier::new(Arc::new(table)),
        )
    }

    #[test]
    fn test_biome_at() {
        let provider = split_provider();

        assert_eq!(provider.biome_at(-5, 3).unwrap(), Biome::Ocean.id());
        assert_eq!(provider.biome_at(5, -3).unwrap(), Biome::Plains.id());
        assert_eq!(provider.biome_at(5, 3).unwrap(), Biome::Forest.id());
        assert_eq!(provider.noise_biome(-1, 0).unwrap(), Biome::Ocean.id());
    }

    #[test]
    fn test_noise_biome_does_not_generate() {
        let provider = split_provider();

        assert_eq!(provider.noise_biome(-3, -3).unwrap(), Biome::Ocean.id());
        assert_eq!(provider.noise_biome(10, 10).unwrap(), Biome::Forest.id());

        let stats = provider.lookup().cache().stats();
        assert_eq!(stats.generated, 0, "Quarter queries must not generate regions");
        assert!(provider.lookup().cache().is_empty());

        // Matches the populated path once the region exists.
        assert_eq!(provider.biome_at(40, 40).unwrap(), provider.noise_biome(10, 10).unwrap());
        assert_eq!(provider.lookup().cache().stats().generated, 1);
    }

    #[test]
    fn test_biomes_in_radius() {
        let provider = split_provider();

        let near = provider.biomes_in_radius(100, 100, 16).unwrap();
        assert_eq!(near.len(), 1);
        assert!(near.contains(&Biome::Forest.id()));

        let around_origin = provider.biomes_in_radius(0, 0, 16).unwrap();
        assert_eq!(around_origin.len(), 3, "Found: {around_origin:?}");
    }

    #[test]
    fn test_locate_biome() {
        let provider = split_provider();
        let targets = [Biome::Ocean.id()];

        let found = provider
            .locate_biome_seeded(0, 0, 32, &targets, 7)
            .unwrap()
            .expect("Ocean lies west of the origin");
        assert!(found.0 < 0, "Located position {found:?} must be in the ocean");
        assert_eq!(found.0 % 4, 0);
        assert_eq!(found.1 % 4, 0);

        let again = provider.locate_biome_seeded(0, 0, 32, &targets, 7).unwrap();
        assert_eq!(again, Some(found), "Same seed picks the same position");

        let missing = provider
            .locate_biome_seeded(500, 0, 32, &targets, 7)
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_locate_biome_spreads() {
        let provider = split_provider();
        let targets = [Biome::Forest.id()];

        let picks: BTreeSet<_> = (0..32)
            .filter_map(|seed| {
                provider
                    .locate_biome_seeded(64, 64, 24, &targets, seed)
                    .unwrap()
            })
            .collect();

        assert!(picks.len() > 4, "Reservoir sampling should vary with the seed");
    }

    #[test]
    fn test_heightmaps() {
        let provider = split_provider();
        let levels = provider.lookup().settings().levels;

        // height 0.1 -> y 25 + 1, under water
        assert_eq!(provider.height_at(-10, 0, HeightmapKind::OceanFloor).unwrap(), 26);
        assert_eq!(
            provider.height_at(-10, 0, HeightmapKind::Surface).unwrap(),
            levels.water_level
        );

        // height 0.5 -> y 128 + 1
        assert_eq!(provider.height_at(10, 0, HeightmapKind::Surface).unwrap(), 129);
        assert_eq!(provider.height_at(10, 0, HeightmapKind::OceanFloor).unwrap(), 129);
    }

    #[test]
    fn test_can_spawn_at() {
        let mut cell = Cell::new();

        cell.set_terrain(TerrainCategory::Ocean);
        assert!(!BiomeProvider::can_spawn_at(&cell));

        cell.set_terrain(TerrainCategory::DeepOcean);
        assert!(!BiomeProvider::can_spawn_at(&cell));

        cell.set_terrain(TerrainCategory::Beach);
        assert!(BiomeProvider::can_spawn_at(&cell));
    }

    #[test]
    fn test_default_stack() {
        let provider = BiomeProvider::from_settings(settings()).unwrap();

        let first = provider.biome_at(123, -456).unwrap();
        let second = provider.biome_at(123, -456).unwrap();
        assert_eq!(first, second);
        println!("Biome at (123, -456): {first}");

        let bad = WorldSettings {
            cache_capacity: 0,
            ..settings()
        };
        assert!(BiomeProvider::from_settings(bad).is_err());
    }
}
