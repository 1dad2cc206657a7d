use crate::geometry::{self, Aabb};
use serde::{Deserialize, Serialize};

/// Handle into the caller's tile slice. The index stores these instead of
/// references, so identity is slot identity.
pub type TileId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    #[default]
    Free,
    Obstructed,
    Undesirable,
    Desirable,
}

impl TileKind {
    pub const ALL: [TileKind; 4] = [
        TileKind::Free,
        TileKind::Obstructed,
        TileKind::Undesirable,
        TileKind::Desirable,
    ];

    /// Obstacles never get a field of their own.
    pub fn is_obstacle(self) -> bool {
        matches!(self, TileKind::Obstructed)
    }

    /// Stock (strength, range) per kind. Negative strength attracts.
    pub fn default_influence(self) -> (f64, f64) {
        match self {
            TileKind::Free => (0.0, 0.0),
            TileKind::Obstructed => (4.0, 5.0),
            TileKind::Undesirable => (3.0, 10.0),
            TileKind::Desirable => (-10.0, 60.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub kind: TileKind,
    pub position: [f64; 2],
    pub field_strength: f64,
    pub field_range: f64,
    /// Accumulated field from the last pass. Left as-is for obstacles.
    #[serde(default)]
    pub field: [f64; 2],
}

impl Tile {
    pub fn new(kind: TileKind, position: [f64; 2]) -> Self {
        let (field_strength, field_range) = kind.default_influence();
        Self::with_influence(kind, position, field_strength, field_range)
    }

    pub fn with_influence(
        kind: TileKind,
        position: [f64; 2],
        field_strength: f64,
        field_range: f64,
    ) -> Self {
        Self {
            kind,
            position,
            field_strength,
            field_range,
            field: [0.0, 0.0],
        }
    }

    pub fn is_obstacle(&self) -> bool {
        self.kind.is_obstacle()
    }

    /// Box covering every point this tile can influence. Negative ranges are
    /// treated as zero.
    pub fn extent(&self) -> Aabb {
        Aabb::around(self.position, self.field_range.max(0.0))
    }

    pub fn field_magnitude(&self) -> f64 {
        geometry::magnitude(self.field)
    }

    pub fn field_direction(&self) -> [f64; 2] {
        geometry::normalised(self.field)
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.field_strength.is_finite()
            && self.field_range.is_finite()
    }
}
