//! Tile worlds, a quadrant spatial index over tile influence boxes, and the
//! per-tile field pass that consumes it.

pub mod config;
pub mod field;
pub mod geometry;
pub mod influence;
pub mod spatial;
pub mod tile;
pub mod world;

pub use config::{ConfigError, FieldConfig, IndexConfig};
pub use field::{FieldAggregator, FieldStats};
pub use geometry::Aabb;
pub use influence::{Influence, InfluenceModel};
pub use spatial::{build_index, QuadTree};
pub use tile::{Tile, TileId, TileKind};
pub use world::{PassSummary, TileWorld, WorldFile, WorldInitError};
