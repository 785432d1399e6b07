//! # Biome Classification
//!
//! Maps a generated cell to a concrete biome.
//!
//! Every cell belongs to one category: its terrain category when the
//! terrain overrides climate (oceans, rivers, mountains...), otherwise its
//! climate type. Each category owns a list of candidate biomes sorted by
//! id, and the cell's identity picks one:
//!
//! ```text
//! index = floor(identity * (len - 1) + 0.5)
//! ```
//!
//! Halves round up. An empty list falls back to a temperature-keyed
//! default. The table is immutable once built and shared read-only.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::{BiomeType, Cell, TerrainCategory};
use crate::error::SettingsResult;

/// Numeric biome identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BiomeId(pub u16);

impl BiomeId {
    /// Returns the built-in biome with this id, if any.
    #[must_use]
    pub fn biome(self) -> Option<Biome> {
        Biome::from_id(self)
    }
}

impl fmt::Display for BiomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.biome() {
            Some(biome) => write!(f, "{}#{}", biome.name(), self.0),
            None => write!(f, "biome#{}", self.0),
        }
    }
}

/// Built-in biomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Biome {
    /// Deep ocean
    DeepOcean = 0,
    /// Temperate ocean
    Ocean = 1,
    /// Warm, shallow ocean
    WarmOcean = 2,
    /// Ice-covered ocean
    FrozenOcean = 3,
    /// Sandy beach
    Beach = 4,
    /// Rocky coastline
    StoneShore = 5,
    /// River channel
    River = 6,
    /// Inland lake
    Lake = 7,
    /// Swamp/wetland
    Swamp = 8,
    /// Plains/grassland
    Plains = 9,
    /// Forest
    Forest = 10,
    /// Birch forest
    BirchForest = 11,
    /// Dense jungle
    Jungle = 12,
    /// Arid desert
    Desert = 13,
    /// Savanna grassland
    Savanna = 14,
    /// Cold tundra
    Tundra = 15,
    /// Snowy taiga forest
    Taiga = 16,
    /// High mountains
    Mountains = 17,
    /// Snowy peaks
    SnowyPeaks = 18,
    /// Badlands
    Badlands = 19,
    /// Alpine meadow
    Meadow = 20,
}

impl Biome {
    /// Number of built-in biomes.
    pub const COUNT: usize = 21;

    /// Every built-in biome, in id order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::DeepOcean,
        Self::Ocean,
        Self::WarmOcean,
        Self::FrozenOcean,
        Self::Beach,
        Self::StoneShore,
        Self::River,
        Self::Lake,
        Self::Swamp,
        Self::Plains,
        Self::Forest,
        Self::BirchForest,
        Self::Jungle,
        Self::Desert,
        Self::Savanna,
        Self::Tundra,
        Self::Taiga,
        Self::Mountains,
        Self::SnowyPeaks,
        Self::Badlands,
        Self::Meadow,
    ];

    /// Numeric id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> BiomeId {
        BiomeId(self as u16)
    }

    /// Converts from a numeric id.
    #[must_use]
    pub fn from_id(id: BiomeId) -> Option<Self> {
        Self::ALL.get(usize::from(id.0)).copied()
    }

    /// Stable, lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DeepOcean => "deep_ocean",
            Self::Ocean => "ocean",
            Self::WarmOcean => "warm_ocean",
            Self::FrozenOcean => "frozen_ocean",
            Self::Beach => "beach",
            Self::StoneShore => "stone_shore",
            Self::River => "river",
            Self::Lake => "lake",
            Self::Swamp => "swamp",
            Self::Plains => "plains",
            Self::Forest => "forest",
            Self::BirchForest => "birch_forest",
            Self::Jungle => "jungle",
            Self::Desert => "desert",
            Self::Savanna => "savanna",
            Self::Tundra => "tundra",
            Self::Taiga => "taiga",
            Self::Mountains => "mountains",
            Self::SnowyPeaks => "snowy_peaks",
            Self::Badlands => "badlands",
            Self::Meadow => "meadow",
        }
    }
}

/// Category a cell is classified under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    /// Climate-driven category.
    Climate(BiomeType),
    /// Terrain-driven category.
    Terrain(TerrainCategory),
}

impl CategoryKey {
    /// Number of distinct keys.
    pub const COUNT: usize = BiomeType::COUNT + TerrainCategory::COUNT;

    /// Dense index: climate types first, then terrain categories.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Climate(biome_type) => biome_type.index(),
            Self::Terrain(terrain) => BiomeType::COUNT + terrain.index(),
        }
    }

    /// Key for a dense index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BiomeType::COUNT {
            BiomeType::from_index(index).map(Self::Climate)
        } else {
            TerrainCategory::from_index(index - BiomeType::COUNT).map(Self::Terrain)
        }
    }

    /// Key a cell is classified under.
    #[inline]
    #[must_use]
    pub fn for_cell(cell: &Cell) -> Self {
        let terrain = cell.terrain();
        if terrain.overrides_climate() {
            Self::Terrain(terrain)
        } else {
            Self::Climate(cell.biome_type())
        }
    }
}

/// Fallback biomes for categories with no candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultBiomeRule {
    /// Used below [`DefaultBiomeRule::COLD_BELOW`].
    pub cold: BiomeId,
    /// Used between the cold and hot thresholds.
    pub temperate: BiomeId,
    /// Used above [`DefaultBiomeRule::HOT_ABOVE`].
    pub hot: BiomeId,
}

impl DefaultBiomeRule {
    /// Normalized temperature below which the cold default applies.
    pub const COLD_BELOW: f32 = 0.25;
    /// Normalized temperature above which the hot default applies.
    pub const HOT_ABOVE: f32 = 0.75;

    /// Default biome for a temperature.
    #[must_use]
    pub fn biome_for(&self, temperature: f32) -> BiomeId {
        if temperature < Self::COLD_BELOW {
            self.cold
        } else if temperature > Self::HOT_ABOVE {
            self.hot
        } else {
            self.temperate
        }
    }
}

impl Default for DefaultBiomeRule {
    fn default() -> Self {
        Self {
            cold: Biome::Tundra.id(),
            temperate: Biome::Plains.id(),
            hot: Biome::Desert.id(),
        }
    }
}

/// Candidate biomes for one climate type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateEntry {
    /// Climate type.
    pub biome_type: BiomeType,
    /// Candidate biome ids.
    pub biomes: Vec<BiomeId>,
}

/// Candidate biomes for one terrain category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainEntry {
    /// Terrain category.
    pub terrain: TerrainCategory,
    /// Candidate biome ids.
    pub biomes: Vec<BiomeId>,
}

/// Serializable form of a [`BiomeTable`].
///
/// ```toml
/// [defaults]
/// cold = 15
/// temperate = 9
/// hot = 13
///
/// [[climate]]
/// biome_type = "taiga"
/// biomes = [16]
///
/// [[terrain]]
/// terrain = "river"
/// biomes = [6]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeTableConfig {
    /// Fallback rule.
    pub defaults: DefaultBiomeRule,
    /// Climate categories.
    pub climate: Vec<ClimateEntry>,
    /// Terrain categories.
    pub terrain: Vec<TerrainEntry>,
}

impl BiomeTableConfig {
    /// Parses a table configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SettingsError::Parse`] for malformed input.
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Serializes the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SettingsError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string(self)?)
    }
}

/// Builder for [`BiomeTable`].
#[derive(Clone, Debug)]
pub struct BiomeTableBuilder {
    entries: Vec<Vec<BiomeId>>,
}

impl BiomeTableBuilder {
    fn new() -> Self {
        Self {
            entries: vec![Vec::new(); CategoryKey::COUNT],
        }
    }

    /// Adds one candidate to a category.
    #[must_use]
    pub fn add(mut self, key: CategoryKey, biome: impl Into<BiomeId>) -> Self {
        self.entries[key.index()].push(biome.into());
        self
    }

    /// Adds several candidates to a category.
    #[must_use]
    pub fn extend<I>(mut self, key: CategoryKey, biomes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<BiomeId>,
    {
        self.entries[key.index()].extend(biomes.into_iter().map(Into::into));
        self
    }

    /// Finalizes the table. Candidate lists are deduplicated and sorted by
    /// id, so insertion order never affects classification.
    #[must_use]
    pub fn build(self, defaults: DefaultBiomeRule) -> BiomeTable {
        let entries = self
            .entries
            .into_iter()
            .map(|mut biomes| {
                biomes.sort_unstable();
                biomes.dedup();
                biomes.into_boxed_slice()
            })
            .collect();

        BiomeTable { entries, defaults }
    }
}

impl From<Biome> for BiomeId {
    fn from(biome: Biome) -> Self {
        biome.id()
    }
}

/// Immutable category -> candidate biomes table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BiomeTable {
    /// Indexed by [`CategoryKey::index`].
    entries: Box<[Box<[BiomeId]>]>,
    defaults: DefaultBiomeRule,
}

impl BiomeTable {
    /// Starts an empty table.
    #[must_use]
    pub fn builder() -> BiomeTableBuilder {
        BiomeTableBuilder::new()
    }

    /// The built-in table covering every category that can occur.
    #[must_use]
    pub fn standard() -> Self {
        use Biome as B;
        use BiomeType as C;
        use CategoryKey::{Climate, Terrain};
        use TerrainCategory as T;

        Self::builder()
            .extend(Climate(C::TropicalRainforest), [B::Jungle])
            .extend(Climate(C::Savanna), [B::Savanna])
            .extend(Climate(C::Desert), [B::Desert, B::Badlands])
            .extend(Climate(C::TemperateRainforest), [B::Forest, B::Jungle])
            .extend(Climate(C::TemperateForest), [B::Forest, B::BirchForest])
            .extend(Climate(C::Grassland), [B::Plains, B::Meadow])
            .extend(Climate(C::ColdSteppe), [B::Plains, B::Tundra])
            .extend(Climate(C::Steppe), [B::Plains, B::Savanna])
            .extend(Climate(C::Taiga), [B::Taiga])
            .extend(Climate(C::Tundra), [B::Tundra])
            .extend(Climate(C::Alpine), [B::Meadow, B::SnowyPeaks])
            .extend(Terrain(T::DeepOcean), [B::DeepOcean])
            .extend(Terrain(T::Ocean), [B::Ocean, B::WarmOcean, B::FrozenOcean])
            .extend(Terrain(T::Coast), [B::Ocean])
            .extend(Terrain(T::Beach), [B::Beach, B::StoneShore])
            .extend(Terrain(T::Lake), [B::Lake])
            .extend(Terrain(T::River), [B::River])
            .extend(Terrain(T::Wetland), [B::Swamp])
            .extend(Terrain(T::Mountains), [B::Mountains, B::SnowyPeaks])
            .build(DefaultBiomeRule::default())
    }

    /// Builds a table from its serialized form.
    #[must_use]
    pub fn from_config(config: &BiomeTableConfig) -> Self {
        let mut builder = Self::builder();
        for entry in &config.climate {
            builder = builder.extend(CategoryKey::Climate(entry.biome_type), entry.biomes.iter().copied());
        }
        for entry in &config.terrain {
            builder = builder.extend(CategoryKey::Terrain(entry.terrain), entry.biomes.iter().copied());
        }
        builder.build(config.defaults)
    }

    /// Serializable copy of the table. Categories appear in index order and
    /// empty categories are omitted.
    #[must_use]
    pub fn snapshot(&self) -> BiomeTableConfig {
        let climate = BiomeType::ALL
            .iter()
            .filter_map(|&biome_type| {
                let biomes = self.candidates(CategoryKey::Climate(biome_type));
                (!biomes.is_empty()).then(|| ClimateEntry {
                    biome_type,
                    biomes: biomes.to_vec(),
                })
            })
            .collect();

        let terrain = TerrainCategory::ALL
            .iter()
            .filter_map(|&terrain| {
                let biomes = self.candidates(CategoryKey::Terrain(terrain));
                (!biomes.is_empty()).then(|| TerrainEntry {
                    terrain,
                    biomes: biomes.to_vec(),
                })
            })
            .collect();

        BiomeTableConfig {
            defaults: self.defaults,
            climate,
            terrain,
        }
    }

    /// Candidate biomes for a category, sorted by id.
    #[inline]
    #[must_use]
    pub fn candidates(&self, key: CategoryKey) -> &[BiomeId] {
        match self.entries.get(key.index()) {
            Some(biomes) => biomes,
            None => &[],
        }
    }

    /// Fallback rule.
    #[inline]
    #[must_use]
    pub const fn defaults(&self) -> &DefaultBiomeRule {
        &self.defaults
    }
}

/// Deterministic cell -> biome mapping over a shared table.
#[derive(Clone, Debug)]
pub struct BiomeClassifier {
    table: Arc<BiomeTable>,
}

impl BiomeClassifier {
    /// Creates a classifier over a table.
    #[must_use]
    pub fn new(table: Arc<BiomeTable>) -> Self {
        Self { table }
    }

    /// Creates a classifier over [`BiomeTable::standard`].
    #[must_use]
    pub fn standard() -> Self {
        Self::new(Arc::new(BiomeTable::standard()))
    }

    /// The classification table.
    #[inline]
    #[must_use]
    pub fn table(&self) -> &BiomeTable {
        &self.table
    }

    /// Classifies a cell.
    #[must_use]
    pub fn classify(&self, cell: &Cell) -> BiomeId {
        self.classify_raw(CategoryKey::for_cell(cell), cell.identity(), cell.temperature())
    }

    /// Classifies raw values without a cell.
    ///
    /// An identity outside `[0, 1)` that lands past the end of the list is
    /// logged and resolved to the default biome.
    #[must_use]
    pub fn classify_raw(&self, key: CategoryKey, identity: f32, temperature: f32) -> BiomeId {
        let biomes = self.table.candidates(key);
        let defaults = self.table.defaults();

        if biomes.is_empty() {
            return defaults.biome_for(temperature);
        }

        let max_index = (biomes.len() - 1) as f32;
        let index = (max_index * identity + 0.5).floor();

        if index >= 0.0 {
            if let Some(&biome) = biomes.get(index as usize) {
                return biome;
            }
        }

        tracing::warn!(
            "Biome index {} out of range for {:?} ({} candidates, identity {})",
            index,
            key,
            biomes.len(),
            identity
        );
        defaults.biome_for(temperature)
    }
}
