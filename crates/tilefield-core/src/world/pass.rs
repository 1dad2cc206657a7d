use super::metrics::PassTimings;
use super::TileWorld;
use crate::field::{FieldAggregator, FieldStats};
use crate::influence::Influence;
use crate::spatial;
use std::time::Instant;
use tracing::debug;

impl TileWorld {
    /// Run one field pass with the configured influence model.
    pub fn calculate_field(&mut self) -> PassTimings {
        let influence = self.config.influence;
        self.calculate_field_with(&influence)
    }

    /// Run one field pass with a caller-supplied influence function.
    ///
    /// The previous pass's index is dropped before the new one is built and
    /// the new one stays alive for [`candidates_at`](TileWorld::candidates_at)
    /// until the next pass.
    pub fn calculate_field_with<I: Influence + ?Sized>(&mut self, influence: &I) -> PassTimings {
        let total_start = Instant::now();
        self.index = None;
        self.last_stats = None;

        let t0 = Instant::now();
        let tree = spatial::build_index(&self.tiles, self.bounds, &self.config.index);
        let index_build_us = t0.elapsed().as_micros() as u64;

        let t1 = Instant::now();
        let aggregator = FieldAggregator::new(influence);
        let stats: FieldStats = if self.config.parallel {
            aggregator.run_parallel(&mut self.tiles, &tree)
        } else {
            aggregator.run(&mut self.tiles, &tree)
        };
        let field_us = t1.elapsed().as_micros() as u64;

        let timings = PassTimings {
            index_build_us,
            field_us,
            total_us: total_start.elapsed().as_micros() as u64,
        };
        debug!(
            tiles = self.tiles.len(),
            depth = tree.depth(),
            nodes = tree.node_count(),
            max_magnitude = stats.max_magnitude,
            index_build_us,
            field_us,
            "field pass complete"
        );

        self.index = Some(tree);
        self.last_stats = Some(stats);
        self.last_timings = Some(timings.clone());
        timings
    }
}
