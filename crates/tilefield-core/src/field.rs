use crate::geometry;
use crate::influence::{finite_or_zero, Influence};
use crate::spatial::QuadTree;
use crate::tile::{Tile, TileId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Largest field magnitude produced this pass; the renderer normalises by it.
    pub max_magnitude: f64,
    pub tiles_updated: usize,
    pub candidates_examined: usize,
    /// Contributions discarded because the influence returned a non-finite vector.
    pub dropped_contributions: usize,
}

#[derive(Clone, Copy, Debug, Default)]
struct Accumulated {
    field: [f64; 2],
    examined: usize,
    dropped: usize,
}

/// Sums pairwise influence over the index's candidate set for every
/// non-obstacle tile.
pub struct FieldAggregator<'a, I: Influence + ?Sized> {
    influence: &'a I,
}

impl<'a, I: Influence + ?Sized> FieldAggregator<'a, I> {
    pub fn new(influence: &'a I) -> Self {
        Self { influence }
    }

    /// Field at `target` from every candidate the index returns for its
    /// position, excluding the target's own handle and obstacles.
    fn accumulate(&self, tiles: &[Tile], target: TileId, index: &QuadTree) -> Accumulated {
        let tile = &tiles[target];
        let mut acc = Accumulated::default();
        for &candidate in index.query(tile.position) {
            if candidate == target {
                continue;
            }
            let Some(source) = tiles.get(candidate) else {
                warn!(
                    candidate,
                    tiles = tiles.len(),
                    "index handle out of range for tile slice; skipped"
                );
                continue;
            };
            if source.is_obstacle() {
                continue;
            }
            acc.examined += 1;
            let raw = self.influence.contribution(source, tile);
            let v = finite_or_zero(raw);
            if v != raw {
                acc.dropped += 1;
            }
            acc.field[0] += v[0];
            acc.field[1] += v[1];
        }
        acc
    }

    /// Recompute fields in tile order. Obstacles keep whatever field they had.
    pub fn run(&self, tiles: &mut [Tile], index: &QuadTree) -> FieldStats {
        let mut stats = FieldStats::default();
        for id in 0..tiles.len() {
            if tiles[id].is_obstacle() {
                continue;
            }
            tiles[id].field = [0.0, 0.0];
            let acc = self.accumulate(tiles, id, index);
            tiles[id].field = acc.field;
            Self::record(&mut stats, &acc);
        }
        Self::finish(&stats);
        stats
    }

    /// Same result as [`run`](Self::run), with the read-only query phase spread
    /// over the rayon pool. Fields are written back afterwards in tile order.
    pub fn run_parallel(&self, tiles: &mut [Tile], index: &QuadTree) -> FieldStats {
        let shared: &[Tile] = tiles;
        let results: Vec<Option<Accumulated>> = shared
            .par_iter()
            .enumerate()
            .map(|(id, tile)| (!tile.is_obstacle()).then(|| self.accumulate(shared, id, index)))
            .collect();

        let mut stats = FieldStats::default();
        for (tile, acc) in tiles.iter_mut().zip(results) {
            let Some(acc) = acc else {
                continue;
            };
            tile.field = acc.field;
            Self::record(&mut stats, &acc);
        }
        Self::finish(&stats);
        stats
    }

    fn record(stats: &mut FieldStats, acc: &Accumulated) {
        stats.tiles_updated += 1;
        stats.candidates_examined += acc.examined;
        stats.dropped_contributions += acc.dropped;
        let magnitude = geometry::magnitude(acc.field);
        if magnitude > stats.max_magnitude {
            stats.max_magnitude = magnitude;
        }
    }

    fn finish(stats: &FieldStats) {
        if stats.dropped_contributions > 0 {
            warn!(
                dropped = stats.dropped_contributions,
                "influence returned non-finite contributions; treated as zero"
            );
        }
        debug!(
            tiles = stats.tiles_updated,
            candidates = stats.candidates_examined,
            max_magnitude = stats.max_magnitude,
            "field aggregation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::geometry::{distance_sq, Aabb};
    use crate::influence::InfluenceModel;
    use crate::spatial::build_index;
    use crate::tile::TileKind;
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn small_index() -> IndexConfig {
        IndexConfig {
            split_threshold: 3,
            min_split_size: 1.0,
            max_depth: 10,
        }
    }

    fn random_world(seed: u64, side: usize) -> Vec<Tile> {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let mut tiles = Vec::with_capacity(side * side);
        for x in 0..side {
            for y in 0..side {
                let kind = TileKind::ALL[rng.random_range(0..TileKind::ALL.len())];
                let (strength, _) = kind.default_influence();
                let range = rng.random_range(0.0..6.0);
                tiles.push(Tile::with_influence(
                    kind,
                    [x as f64, y as f64],
                    strength,
                    range,
                ));
            }
        }
        tiles
    }

    /// Exact O(n^2) field over every other non-obstacle tile.
    fn brute_force(tiles: &[Tile], model: &InfluenceModel) -> Vec<[f64; 2]> {
        tiles
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let mut f = [0.0, 0.0];
                for (j, source) in tiles.iter().enumerate() {
                    if i == j || source.is_obstacle() {
                        continue;
                    }
                    let v = model.contribution(source, target);
                    f[0] += v[0];
                    f[1] += v[1];
                }
                f
            })
            .collect()
    }

    fn close(a: [f64; 2], b: [f64; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9
    }

    #[test]
    fn indexed_field_matches_brute_force() {
        let mut tiles = random_world(5, 24);
        let bounds = Aabb::from_grid(24, 24);
        let index = build_index(&tiles, bounds, &small_index());
        let model = InfluenceModel::LinearFalloff;
        let expected = brute_force(&tiles, &model);

        FieldAggregator::new(&model).run(&mut tiles, &index);
        for (tile, want) in tiles.iter().zip(expected) {
            if tile.is_obstacle() {
                assert_eq!(tile.field, [0.0, 0.0]);
            } else {
                assert!(close(tile.field, want), "{:?} != {:?}", tile.field, want);
            }
        }
    }

    #[test]
    fn parallel_run_matches_serial() {
        let mut serial = random_world(9, 20);
        let mut parallel = serial.clone();
        let index = build_index(&serial, Aabb::from_grid(20, 20), &small_index());
        let model = InfluenceModel::InverseSquare;
        let aggregator = FieldAggregator::new(&model);

        let a = aggregator.run(&mut serial, &index);
        let b = aggregator.run_parallel(&mut parallel, &index);
        assert_eq!(a, b);
        for (s, p) in serial.iter().zip(&parallel) {
            assert!(close(s.field, p.field));
        }
    }

    #[test]
    fn tile_never_influences_itself_even_when_stacked() {
        let mut tiles = vec![
            Tile::with_influence(TileKind::Undesirable, [2.0, 2.0], 5.0, 4.0),
            Tile::with_influence(TileKind::Undesirable, [2.0, 2.0], 5.0, 4.0),
        ];
        let index = build_index(&tiles, Aabb::from_grid(4, 4), &IndexConfig::default());
        let self_counter = |source: &Tile, target: &Tile| {
            if std::ptr::eq(source, target) {
                [f64::NAN, f64::NAN]
            } else {
                [1.0, 0.0]
            }
        };
        let stats = FieldAggregator::new(&self_counter).run(&mut tiles, &index);
        assert_eq!(stats.dropped_contributions, 0);
        assert_eq!(tiles[0].field, [1.0, 0.0]);
        assert_eq!(tiles[1].field, [1.0, 0.0]);

        FieldAggregator::new(&InfluenceModel::LinearFalloff).run(&mut tiles, &index);
        assert_eq!(tiles[0].field, [0.0, 0.0], "coincident pair yields zero");
    }

    #[test]
    fn obstacles_keep_their_previous_field() {
        let mut tiles = vec![
            Tile::new(TileKind::Obstructed, [1.0, 1.0]),
            Tile::new(TileKind::Undesirable, [2.0, 1.0]),
            Tile::new(TileKind::Free, [1.0, 2.0]),
        ];
        tiles[0].field = [7.0, 7.0];
        let index = build_index(&tiles, Aabb::from_grid(4, 4), &IndexConfig::default());
        let stats =
            FieldAggregator::new(&InfluenceModel::LinearFalloff).run(&mut tiles, &index);
        assert_eq!(tiles[0].field, [7.0, 7.0]);
        assert_eq!(stats.tiles_updated, 2);
        assert!(tiles[2].field_magnitude() > 0.0);
    }

    #[test]
    fn obstacles_exert_no_field() {
        let mut tiles = vec![
            Tile::new(TileKind::Obstructed, [1.0, 1.0]),
            Tile::new(TileKind::Free, [2.0, 1.0]),
        ];
        assert!(tiles[0].field_strength > 0.0 && tiles[0].field_range > 1.0);
        let index = build_index(&tiles, Aabb::from_grid(4, 4), &IndexConfig::default());
        let model = InfluenceModel::LinearFalloff;
        let stats = FieldAggregator::new(&model).run(&mut tiles, &index);
        assert_eq!(tiles[1].field, [0.0, 0.0]);
        assert_eq!(stats.candidates_examined, 0);

        let unit = |_: &Tile, _: &Tile| [1.0, 0.0];
        let mut walled: Vec<Tile> = (0..4)
            .map(|y| Tile::new(TileKind::Obstructed, [0.0, y as f64]))
            .collect();
        walled.push(Tile::new(TileKind::Free, [1.0, 1.0]));
        let index = build_index(&walled, Aabb::from_grid(4, 4), &small_index());
        FieldAggregator::new(&unit).run_parallel(&mut walled, &index);
        assert_eq!(walled[4].field, [0.0, 0.0]);
    }

    #[test]
    fn handles_past_the_slice_are_skipped() {
        let all = vec![
            Tile::new(TileKind::Undesirable, [1.0, 1.0]),
            Tile::new(TileKind::Free, [2.0, 1.0]),
            Tile::new(TileKind::Undesirable, [3.0, 1.0]),
        ];
        let bounds = Aabb::from_grid(4, 4);
        let model = InfluenceModel::LinearFalloff;

        let mut expected = all[..2].to_vec();
        let index = build_index(&expected, bounds, &IndexConfig::default());
        FieldAggregator::new(&model).run(&mut expected, &index);

        let mut truncated = all[..2].to_vec();
        let index = build_index(&all, bounds, &IndexConfig::default());
        FieldAggregator::new(&model).run(&mut truncated, &index);
        assert_eq!(truncated[1].field, expected[1].field);
        assert!(truncated[1].field[0] > 0.0);
    }

    #[test]
    fn single_tile_has_zero_max_magnitude() {
        let mut tiles = vec![Tile::new(TileKind::Desirable, [3.0, 3.0])];
        let index = build_index(&tiles, Aabb::from_grid(8, 8), &IndexConfig::default());
        let stats =
            FieldAggregator::new(&InfluenceModel::LinearFalloff).run(&mut tiles, &index);
        assert_eq!(stats.max_magnitude, tiles[0].field_magnitude());
        assert_eq!(stats.max_magnitude, 0.0);
    }

    #[test]
    fn max_magnitude_is_the_largest_tile_field() {
        let mut tiles = random_world(17, 16);
        let index = build_index(&tiles, Aabb::from_grid(16, 16), &small_index());
        let stats =
            FieldAggregator::new(&InfluenceModel::LinearFalloff).run(&mut tiles, &index);
        let largest = tiles
            .iter()
            .filter(|t| !t.is_obstacle())
            .map(Tile::field_magnitude)
            .fold(0.0f64, f64::max);
        assert_eq!(stats.max_magnitude, largest);
        assert!(stats.candidates_examined > 0);
    }

    #[test]
    fn non_finite_contributions_are_dropped() {
        let mut tiles = vec![
            Tile::new(TileKind::Free, [1.0, 1.0]),
            Tile::new(TileKind::Free, [1.5, 1.0]),
        ];
        let index = build_index(&tiles, Aabb::from_grid(4, 4), &IndexConfig::default());
        let broken = |_: &Tile, _: &Tile| [f64::INFINITY, 1.0];
        let stats = FieldAggregator::new(&broken).run(&mut tiles, &index);
        assert_eq!(stats.dropped_contributions, 2);
        assert!(tiles.iter().all(|t| t.field == [0.0, 0.0]));
    }

    #[test]
    fn contributions_outside_range_are_ignored() {
        let mut tiles = vec![
            Tile::with_influence(TileKind::Undesirable, [0.0, 0.0], 3.0, 2.0),
            Tile::new(TileKind::Free, [5.0, 5.0]),
        ];
        assert!(distance_sq(tiles[0].position, tiles[1].position) > 4.0);
        let index = build_index(&tiles, Aabb::from_grid(8, 8), &IndexConfig::default());
        FieldAggregator::new(&InfluenceModel::LinearFalloff).run(&mut tiles, &index);
        assert_eq!(tiles[1].field, [0.0, 0.0]);
    }
}
