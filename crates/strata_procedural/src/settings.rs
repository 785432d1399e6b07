//! # World Settings
//!
//! Generation settings are loaded once at startup and injected into the
//! cache and lookup. Nothing here is global.
//!
//! ```toml
//! seed = 42
//! chunk_size = 16
//! region_chunks = 8
//! cache_capacity = 64
//!
//! [levels]
//! world_height = 256
//! water_level = 63
//! ```
//!
//! Every field has a default, so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};
use crate::noise::WorldSeed;

/// Largest region edge, in cells.
const MAX_REGION_SIZE: u32 = 4096;

/// Vertical layout of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Levels {
    /// Number of block layers.
    pub world_height: i32,
    /// Y of the sea surface.
    pub water_level: i32,
    /// Y of the average ground surface.
    pub ground_level: i32,
}

impl Default for Levels {
    fn default() -> Self {
        Self {
            world_height: 256,
            water_level: 63,
            ground_level: 64,
        }
    }
}

impl Levels {
    /// Converts a normalized height into a block Y.
    ///
    /// Values at or above 1 map to the top layer.
    #[inline]
    #[must_use]
    pub fn scale(&self, value: f32) -> i32 {
        if value >= 1.0 {
            return self.world_height - 1;
        }
        (value.max(0.0) * self.world_height as f32) as i32
    }

    /// Sea level as a normalized height.
    #[inline]
    #[must_use]
    pub fn water_height(&self) -> f32 {
        self.water_level as f32 / self.world_height as f32
    }

    /// Ground level as a normalized height.
    #[inline]
    #[must_use]
    pub fn ground_height(&self) -> f32 {
        self.ground_level as f32 / self.world_height as f32
    }
}

/// Settings shared by every generation component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// World seed.
    pub seed: WorldSeed,
    /// Chunk edge in cells. Power of two.
    pub chunk_size: u32,
    /// Region edge in chunks. Power of two.
    pub region_chunks: u32,
    /// Maximum number of cached regions.
    pub cache_capacity: usize,
    /// Background warm-up workers. 0 disables warm-up.
    pub warmup_threads: usize,
    /// Pending warm-up hints before new ones are dropped.
    pub warmup_queue: usize,
    /// Idle cells kept by the lookup pool.
    pub pool_soft_cap: usize,
    /// Vertical layout.
    pub levels: Levels,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            seed: WorldSeed::default(),
            chunk_size: 16,
            region_chunks: 8,
            cache_capacity: 64,
            warmup_threads: 2,
            warmup_queue: 256,
            pool_soft_cap: 256,
            levels: Levels::default(),
        }
    }
}

impl WorldSettings {
    /// Creates default settings for a seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: WorldSeed::new(seed),
            ..Self::default()
        }
    }

    /// Region edge in cells (`region_chunks * chunk_size`).
    #[inline]
    #[must_use]
    pub const fn region_size(&self) -> i32 {
        (self.region_chunks * self.chunk_size) as i32
    }

    /// Chunk edge in cells as a signed coordinate.
    #[inline]
    #[must_use]
    pub const fn chunk_edge(&self) -> i32 {
        self.chunk_size as i32
    }

    /// Parses and validates settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] for malformed TOML and
    /// [`SettingsError::Invalid`] if validation fails.
    pub fn from_toml_str(text: &str) -> SettingsResult<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serializes the settings as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Serialize`] if serialization fails.
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Loads and validates settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, otherwise
    /// as [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;

        tracing::info!(
            path = %path.display(),
            seed = settings.seed.value(),
            region_size = settings.region_size(),
            cache_capacity = settings.cache_capacity,
            "Loaded world settings"
        );

        Ok(settings)
    }

    /// Checks structural constraints.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] naming the first violated rule.
    pub fn validate(&self) -> SettingsResult<()> {
        if !self.chunk_size.is_power_of_two() {
            return Err(invalid(format!(
                "chunk_size must be a power of two, got {}",
                self.chunk_size
            )));
        }
        if !self.region_chunks.is_power_of_two() {
            return Err(invalid(format!(
                "region_chunks must be a power of two, got {}",
                self.region_chunks
            )));
        }
        match self.chunk_size.checked_mul(self.region_chunks) {
            Some(size) if size <= MAX_REGION_SIZE => {}
            _ => {
                return Err(invalid(format!(
                    "region edge must not exceed {MAX_REGION_SIZE} cells"
                )))
            }
        }
        if self.cache_capacity == 0 {
            return Err(invalid("cache_capacity must be at least 1".to_string()));
        }
        if self.warmup_threads > 0 && self.warmup_queue == 0 {
            return Err(invalid(
                "warmup_queue must be at least 1 when warm-up is enabled".to_string(),
            ));
        }

        let levels = &self.levels;
        if levels.world_height <= 0 {
            return Err(invalid(format!(
                "world_height must be positive, got {}",
                levels.world_height
            )));
        }
        if !(0..levels.world_height).contains(&levels.water_level) {
            return Err(invalid(format!(
                "water_level {} must lie inside the world height {}",
                levels.water_level, levels.world_height
            )));
        }
        if !(0..levels.world_height).contains(&levels.ground_level) {
            return Err(invalid(format!(
                "ground_level {} must lie inside the world height {}",
                levels.ground_level, levels.world_height
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> SettingsError {
    SettingsError::Invalid(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = WorldSettings::default();
        settings.validate().expect("Defaults must validate");
        assert_eq!(settings.region_size(), 128);
    }

    #[test]
    fn test_partial_toml() {
        let settings = WorldSettings::from_toml_str(
            r"
            seed = 42
            chunk_size = 4
            region_chunks = 1

            [levels]
            water_level = 40
            ",
        )
        .expect("Partial settings should parse");

        assert_eq!(settings.seed, WorldSeed::new(42));
        assert_eq!(settings.region_size(), 4);
        assert_eq!(settings.levels.water_level, 40);
        assert_eq!(settings.levels.world_height, 256, "Missing fields use defaults");
        assert_eq!(settings.cache_capacity, 64);
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        let result = WorldSettings::from_toml_str("chunk_size = 12");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));

        let result = WorldSettings::from_toml_str("region_chunks = 3");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let result = WorldSettings::from_toml_str("cache_capacity = 0");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_levels() {
        let result = WorldSettings::from_toml_str("[levels]\nwater_level = 300");
        assert!(matches!(result, Err(SettingsError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = WorldSettings::from_toml_str("seed = [");
        assert!(matches!(result, Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let mut settings = WorldSettings::with_seed(7);
        settings.cache_capacity = 3;

        let text = settings.to_toml_string().unwrap();
        let parsed = WorldSettings::from_toml_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_level_scale() {
        let levels = Levels::default();

        assert_eq!(levels.scale(0.0), 0);
        assert_eq!(levels.scale(0.5), 128);
        assert_eq!(levels.scale(1.0), 255, "Top of the world clamps to the last layer");
        assert_eq!(levels.scale(2.0), 255);
        assert_eq!(levels.scale(-1.0), 0);
    }

    #[test]
    fn test_load_missing_file() {
        let result = WorldSettings::load("/definitely/not/here/world.toml");
        assert!(matches!(result, Err(SettingsError::Io(_))));
    }
}
