use super::TileWorld;
use crate::field::FieldStats;
use crate::geometry;
use crate::spatial::QuadTree;
use crate::tile::{Tile, TileKind};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PassTimings {
    pub index_build_us: u64,
    pub field_us: u64,
    pub total_us: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub depth: u32,
    pub node_count: usize,
    pub leaf_count: usize,
    pub max_leaf_len: usize,
}

impl IndexStats {
    pub fn of(tree: &QuadTree) -> Self {
        Self {
            depth: tree.depth(),
            node_count: tree.node_count(),
            leaf_count: tree.leaf_count(),
            max_leaf_len: tree.max_leaf_len(),
        }
    }
}

/// Per-tile output handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileField {
    pub position: [f64; 2],
    pub kind: TileKind,
    pub field: [f64; 2],
    pub magnitude: f64,
}

impl TileField {
    pub fn of(tile: &Tile) -> Self {
        Self {
            position: tile.position,
            kind: tile.kind,
            field: tile.field,
            magnitude: tile.field_magnitude(),
        }
    }

    /// Display colour for field view: the unit direction mapped into the red
    /// and green channels.
    pub fn normalised_colour(&self) -> [f32; 3] {
        let dir = geometry::normalised(self.field);
        [
            (0.5 + dir[0] / 2.0) as f32,
            (0.5 + dir[1] / 2.0) as f32,
            0.0,
        ]
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PassSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub world_length: usize,
    pub world_width: usize,
    pub tile_count: usize,
    pub obstacle_count: usize,
    pub max_magnitude: f64,
    #[serde(default)]
    pub stats: FieldStats,
    #[serde(default)]
    pub index: IndexStats,
    #[serde(default)]
    pub timings: PassTimings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileField>,
}

impl TileWorld {
    pub fn summary(&self) -> PassSummary {
        let stats = self.last_stats.clone().unwrap_or_default();
        PassSummary {
            schema_version: 1,
            world_length: self.config.world_length,
            world_width: self.config.world_width,
            tile_count: self.tiles.len(),
            obstacle_count: self.tiles.iter().filter(|t| t.is_obstacle()).count(),
            max_magnitude: stats.max_magnitude,
            stats,
            index: self.index.as_ref().map(IndexStats::of).unwrap_or_default(),
            timings: self.last_timings.clone().unwrap_or_default(),
            tiles: self.tiles.iter().map(TileField::of).collect(),
        }
    }
}
