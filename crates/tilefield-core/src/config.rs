use crate::influence::InfluenceModel;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Tuning for the quadrant tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// A leaf splits once it holds more than this many handles.
    pub split_threshold: usize,
    /// Leaves whose smaller side is at or below this never split.
    pub min_split_size: f64,
    /// Nodes at this depth are always leaves.
    pub max_depth: u32,
}

impl IndexConfig {
    pub const MAX_SUPPORTED_DEPTH: u32 = 24;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.split_threshold == 0 {
            return Err(ConfigError::ZeroSplitThreshold);
        }
        if !self.min_split_size.is_finite() || self.min_split_size < 0.0 {
            return Err(ConfigError::InvalidMinSplitSize(self.min_split_size));
        }
        if self.max_depth > Self::MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::MaxDepthTooLarge {
                max: Self::MAX_SUPPORTED_DEPTH,
                actual: self.max_depth,
            });
        }
        Ok(())
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            split_threshold: 8,
            min_split_size: 2.0,
            max_depth: 8,
        }
    }
}

/// Settings for one world and its field passes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub world_length: usize,
    pub world_width: usize,
    pub index: IndexConfig,
    pub influence: InfluenceModel,
    /// Run per-tile queries on the rayon pool once the index is built.
    pub parallel: bool,
}

impl FieldConfig {
    pub const MAX_WORLD_DIMENSION: usize = 16_384;

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("world_length", self.world_length),
            ("world_width", self.world_width),
        ] {
            if value > Self::MAX_WORLD_DIMENSION {
                return Err(ConfigError::WorldTooLarge {
                    name,
                    max: Self::MAX_WORLD_DIMENSION,
                    actual: value,
                });
            }
        }
        self.index.validate()
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            world_length: 120,
            world_width: 120,
            index: IndexConfig::default(),
            influence: InfluenceModel::default(),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroSplitThreshold,
    InvalidMinSplitSize(f64),
    MaxDepthTooLarge {
        max: u32,
        actual: u32,
    },
    WorldTooLarge {
        name: &'static str,
        max: usize,
        actual: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroSplitThreshold => write!(f, "split_threshold must be at least 1"),
            ConfigError::InvalidMinSplitSize(v) => {
                write!(f, "min_split_size must be finite and non-negative (got {v})")
            }
            ConfigError::MaxDepthTooLarge { max, actual } => {
                write!(f, "max_depth ({actual}) exceeds supported maximum ({max})")
            }
            ConfigError::WorldTooLarge { name, max, actual } => {
                write!(f, "{name} ({actual}) exceeds supported maximum ({max})")
            }
        }
    }
}

impl Error for ConfigError {}
