//! Fixtures shared by the unit tests.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bbox::sq_dist;
use crate::rtree::Neighbor;

/// `num_points` uniformly distributed points in the unit square, as a flat buffer.
pub(crate) fn random_points(num_points: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num_points * 2).map(|_| rng.gen()).collect()
}

/// The nearest point to `(x, y)` by linear scan.
pub(crate) fn brute_force_nearest(coords: &[f64], x: f64, y: f64) -> Option<Neighbor<f64>> {
    coords
        .chunks_exact(2)
        .map(|p| Neighbor {
            x: p[0],
            y: p[1],
            dist_squared: sq_dist(x, y, p[0], p[1]),
        })
        .min_by(|a, b| a.dist_squared.partial_cmp(&b.dist_squared).unwrap())
}

/// Route `log` output through the test harness. Safe to call from every test.
pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
