use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::time::Instant;
use tilefield_core::geometry::distance_sq;
use tilefield_core::{build_index, Aabb, IndexConfig, Tile, TileKind};

fn create_tiles(length: usize, width: usize, seed: u64) -> Vec<Tile> {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let mut tiles = Vec::with_capacity(length * width);
    for x in 0..length {
        for y in 0..width {
            let kind = TileKind::ALL[rng.random_range(0..TileKind::ALL.len())];
            tiles.push(Tile::new(kind, [x as f64, y as f64]));
        }
    }
    tiles
}

fn in_range(source: &Tile, target: &Tile) -> bool {
    let r = source.field_range;
    r > 0.0 && distance_sq(source.position, target.position) <= r * r
}

fn main() {
    let (length, width) = (120, 120);
    let tiles = create_tiles(length, width, 42);
    let bounds = Aabb::from_grid(length, width);
    println!("Benchmarking with {} tiles on a {length}x{width} grid", tiles.len());

    for split_threshold in [4usize, 8, 16, 32] {
        let config = IndexConfig {
            split_threshold,
            ..IndexConfig::default()
        };
        let start = Instant::now();
        let tree = build_index(&tiles, bounds, &config);
        let build = start.elapsed();

        let start = Instant::now();
        let mut candidates = 0usize;
        for tile in &tiles {
            candidates += tree.query(tile.position).len();
        }
        let query = start.elapsed();
        println!(
            "quadtree threshold={split_threshold:>2}: build {build:?}, query {query:?}, \
             depth {}, nodes {}, avg candidates {:.1}",
            tree.depth(),
            tree.node_count(),
            candidates as f64 / tiles.len() as f64
        );
    }

    let start = Instant::now();
    let rtree = RTree::bulk_load(
        tiles
            .iter()
            .enumerate()
            .map(|(id, t)| {
                let e = t.extent();
                GeomWithData::new(Rectangle::from_corners(e.min, e.max), id)
            })
            .collect::<Vec<_>>(),
    );
    let mut hits = 0usize;
    for tile in &tiles {
        hits += rtree
            .locate_in_envelope_intersecting(&AABB::from_point(tile.position))
            .count();
    }
    println!("rstar bulk load + query: {:?}, avg hits {:.1}", start.elapsed(), hits as f64 / tiles.len() as f64);

    // Exhaustive scan over a sample; the full O(n^2) pass is too slow to be useful here.
    let sample = 500;
    let start = Instant::now();
    let mut exact = 0usize;
    for target in tiles.iter().take(sample) {
        exact += tiles.iter().filter(|s| in_range(s, target)).count();
    }
    let scan = start.elapsed();
    println!(
        "brute force over {sample} targets: {scan:?} (extrapolated {:?}), avg in range {:.1}",
        scan * (tiles.len() / sample) as u32,
        exact as f64 / sample as f64
    );
}
