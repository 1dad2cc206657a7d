pub mod metrics;
pub mod pass;

pub use metrics::*;

use crate::config::{ConfigError, FieldConfig};
use crate::field::FieldStats;
use crate::geometry::Aabb;
use crate::spatial::QuadTree;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// On-disk world layout: grid dimensions plus the generated tiles.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldFile {
    pub length: usize,
    pub width: usize,
    pub tiles: Vec<Tile>,
}

/// A generated tile grid plus the derived state of its most recent field pass.
pub struct TileWorld {
    pub(crate) tiles: Vec<Tile>,
    pub(crate) bounds: Aabb,
    pub(crate) config: FieldConfig,
    /// Index from the last pass; replaced at the start of the next one.
    pub(crate) index: Option<QuadTree>,
    pub(crate) last_stats: Option<FieldStats>,
    pub(crate) last_timings: Option<PassTimings>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(ConfigError),
    TooManyTiles { max: usize, actual: usize },
    TileOutOfBounds { index: usize, position: [f64; 2] },
    NonFiniteTile { index: usize },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::TooManyTiles { max, actual } => {
                write!(f, "tile count ({actual}) exceeds supported maximum ({max})")
            }
            WorldInitError::TileOutOfBounds { index, position } => write!(
                f,
                "tile {index} at {position:?} lies outside the world bounds"
            ),
            WorldInitError::NonFiniteTile { index } => {
                write!(f, "tile {index} has a non-finite position or influence")
            }
        }
    }
}

impl From<ConfigError> for WorldInitError {
    fn from(err: ConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl TileWorld {
    pub const MAX_TILES: usize = 4_000_000;

    pub fn new(tiles: Vec<Tile>, config: FieldConfig) -> Self {
        Self::try_new(tiles, config).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(tiles: Vec<Tile>, config: FieldConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let bounds = Aabb::from_grid(config.world_length, config.world_width);
        Self::validate_tiles(&tiles, &bounds)?;
        Ok(Self {
            tiles,
            bounds,
            config,
            index: None,
            last_stats: None,
            last_timings: None,
        })
    }

    /// Build from a world file; its grid dimensions override the config's.
    pub fn from_file(file: WorldFile, mut config: FieldConfig) -> Result<Self, WorldInitError> {
        config.world_length = file.length;
        config.world_width = file.width;
        Self::try_new(file.tiles, config)
    }

    fn validate_tiles(tiles: &[Tile], bounds: &Aabb) -> Result<(), WorldInitError> {
        if tiles.len() > Self::MAX_TILES {
            return Err(WorldInitError::TooManyTiles {
                max: Self::MAX_TILES,
                actual: tiles.len(),
            });
        }
        for (index, tile) in tiles.iter().enumerate() {
            if !tile.is_well_formed() {
                return Err(WorldInitError::NonFiniteTile { index });
            }
            // Query points must stay inside the root box.
            if !bounds.contains_point(tile.position) {
                return Err(WorldInitError::TileOutOfBounds {
                    index,
                    position: tile.position,
                });
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Index built by the last pass, if any.
    pub fn index(&self) -> Option<&QuadTree> {
        self.index.as_ref()
    }

    pub fn last_stats(&self) -> Option<&FieldStats> {
        self.last_stats.as_ref()
    }

    /// Global field maximum of the last pass; zero before the first pass.
    pub fn largest_field_strength(&self) -> f64 {
        self.last_stats
            .as_ref()
            .map(|s| s.max_magnitude)
            .unwrap_or(0.0)
    }

    /// Swap in a freshly generated tile set. Derived pass state is discarded.
    pub fn replace_tiles(&mut self, tiles: Vec<Tile>) -> Result<(), WorldInitError> {
        Self::validate_tiles(&tiles, &self.bounds)?;
        self.tiles = tiles;
        self.index = None;
        self.last_stats = None;
        self.last_timings = None;
        Ok(())
    }

    /// Candidate tiles the last pass's index returns for `point`.
    ///
    /// Empty before the first pass and for points outside the world.
    pub fn candidates_at(&self, point: [f64; 2]) -> Vec<&Tile> {
        let Some(index) = &self.index else {
            return Vec::new();
        };
        if !self.bounds.contains_point(point) {
            return Vec::new();
        }
        index
            .query(point)
            .iter()
            .filter_map(|&id| self.tiles.get(id))
            .collect()
    }
}
