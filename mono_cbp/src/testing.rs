//! Reproducible noise for tests.
//!
//! Shared by the unit tests and, through `#[path]`, by `tests/support`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// `n` draws of zero-mean Gaussian noise with standard deviation `sigma`.
pub fn gaussian_noise(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
    let normal = Normal::new(0.0, sigma).expect("sigma must be finite and non-negative");
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}
