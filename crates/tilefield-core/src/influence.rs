use crate::geometry::distance_sq;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};

/// Pairwise field contribution of `source` at `target`'s position.
///
/// Implementations must return a finite vector for distinct positions and
/// `[0.0, 0.0]` when the positions coincide.
pub trait Influence: Sync {
    fn contribution(&self, source: &Tile, target: &Tile) -> [f64; 2];
}

impl<F> Influence for F
where
    F: Fn(&Tile, &Tile) -> [f64; 2] + Sync,
{
    fn contribution(&self, source: &Tile, target: &Tile) -> [f64; 2] {
        self(source, target)
    }
}

/// Built-in falloff shapes, selectable from config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InfluenceModel {
    /// `strength * (1 - d / range)`, reaching zero at the range edge.
    #[default]
    LinearFalloff,
    /// `strength / d^2` inside the range, zero outside.
    InverseSquare,
}

impl Influence for InfluenceModel {
    fn contribution(&self, source: &Tile, target: &Tile) -> [f64; 2] {
        let range = source.field_range;
        if range <= 0.0 || source.field_strength == 0.0 {
            return [0.0, 0.0];
        }
        let d_sq = distance_sq(source.position, target.position);
        if d_sq == 0.0 || d_sq > range * range {
            return [0.0, 0.0];
        }
        let d = d_sq.sqrt();
        let scale = match self {
            InfluenceModel::LinearFalloff => source.field_strength * (1.0 - d / range),
            InfluenceModel::InverseSquare => source.field_strength / d_sq,
        };
        // Displacement runs source -> target, so positive strength pushes away.
        finite_or_zero([
            (target.position[0] - source.position[0]) / d * scale,
            (target.position[1] - source.position[1]) / d * scale,
        ])
    }
}

/// Replace any non-finite vector with zero so it cannot poison a sum.
pub fn finite_or_zero(v: [f64; 2]) -> [f64; 2] {
    if v[0].is_finite() && v[1].is_finite() {
        v
    } else {
        [0.0, 0.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileKind;

    fn source(strength: f64, range: f64) -> Tile {
        Tile::with_influence(TileKind::Undesirable, [0.0, 0.0], strength, range)
    }

    fn at(x: f64, y: f64) -> Tile {
        Tile::new(TileKind::Free, [x, y])
    }

    #[test]
    fn linear_falloff_points_away_and_fades() {
        let s = source(4.0, 10.0);
        let near = InfluenceModel::LinearFalloff.contribution(&s, &at(2.0, 0.0));
        assert!((near[0] - 3.2).abs() < 1e-12);
        assert_eq!(near[1], 0.0);

        let edge = InfluenceModel::LinearFalloff.contribution(&s, &at(0.0, 10.0));
        assert!(edge[1].abs() < 1e-12);

        let outside = InfluenceModel::LinearFalloff.contribution(&s, &at(8.0, 8.0));
        assert_eq!(outside, [0.0, 0.0]);
    }

    #[test]
    fn negative_strength_attracts() {
        let s = source(-10.0, 60.0);
        let v = InfluenceModel::InverseSquare.contribution(&s, &at(0.0, 5.0));
        assert!(v[1] < 0.0);
        assert!((v[1] + 10.0 / 25.0).abs() < 1e-12);
    }

    #[test]
    fn coincident_and_rangeless_sources_contribute_nothing() {
        for model in [InfluenceModel::LinearFalloff, InfluenceModel::InverseSquare] {
            assert_eq!(model.contribution(&source(5.0, 3.0), &at(0.0, 0.0)), [0.0, 0.0]);
            assert_eq!(model.contribution(&source(5.0, 0.0), &at(1.0, 0.0)), [0.0, 0.0]);
        }
    }

    #[test]
    fn closures_are_influences() {
        let constant = |_: &Tile, _: &Tile| [1.0, -1.0];
        assert_eq!(constant.contribution(&at(0.0, 0.0), &at(1.0, 1.0)), [1.0, -1.0]);
    }

    #[test]
    fn non_finite_vectors_are_zeroed() {
        assert_eq!(finite_or_zero([f64::INFINITY, 0.0]), [0.0, 0.0]);
        assert_eq!(finite_or_zero([1.0, f64::NAN]), [0.0, 0.0]);
        assert_eq!(finite_or_zero([1.0, 2.0]), [1.0, 2.0]);
    }
}
