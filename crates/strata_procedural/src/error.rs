//! # Generation Error Types
//!
//! All errors that can occur while generating, caching or configuring
//! terrain.

use thiserror::Error;

use crate::region::RegionCoord;

/// Error raised by a sampler for a single column.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SamplerError {
    message: String,
}

impl SamplerError {
    /// Creates a sampler error with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors that can occur while producing a region.
///
/// Cloneable so one failure can be handed to every caller that waited on
/// the same region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The sampler failed for one column of the region.
    #[error("sampler failed at ({x}, {z}) in region {region}: {source}")]
    Sampler {
        /// Region being generated.
        region: RegionCoord,
        /// World X of the failing column.
        x: i32,
        /// World Z of the failing column.
        z: i32,
        /// Underlying sampler error.
        #[source]
        source: SamplerError,
    },

    /// Generation was abandoned (the generating thread panicked).
    #[error("generation of region {0} was aborted")]
    Aborted(RegionCoord),
}

impl GenerationError {
    /// Region the error belongs to.
    #[must_use]
    pub const fn region(&self) -> RegionCoord {
        match self {
            Self::Sampler { region, .. } | Self::Aborted(region) => *region,
        }
    }
}

/// Result type for generation operations.
pub type GenResult<T> = Result<T, GenerationError>;

/// Errors that can occur while loading settings or biome tables.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for this schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// The settings could not be written as TOML.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The settings parsed but violate a constraint.
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sampler_error_display() {
        let error = GenerationError::Sampler {
            region: RegionCoord::new(1, -2),
            x: 40,
            z: -70,
            source: SamplerError::new("boom"),
        };

        let text = error.to_string();
        assert!(text.contains("[1, -2]"), "Message should name the region: {text}");
        assert!(text.contains("boom"), "Message should carry the cause: {text}");
        assert_eq!(error.region(), RegionCoord::new(1, -2));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let error = GenerationError::Sampler {
            region: RegionCoord::new(0, 0),
            x: 0,
            z: 0,
            source: SamplerError::new("inner"),
        };
        let source = error.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("inner"));
    }
}
