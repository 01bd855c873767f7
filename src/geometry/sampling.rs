//! Seed point distributions on the unit sphere.

use std::f64::consts::PI;

use glam::DVec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Generates `n` points on the unit sphere along a Fibonacci spiral.
///
/// The spiral gives a near-uniform, deterministic covering of the sphere.
pub fn fibonacci_points(n: usize) -> Vec<DVec3> {
    let golden_ratio = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let angle_increment = 2.0 * PI / golden_ratio;

    (0..n)
        .map(|i| {
            // Height evenly spaced in (-1, 1)
            let z = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let radius = (1.0 - z * z).sqrt();
            let theta = angle_increment * i as f64;
            DVec3::new(radius * theta.cos(), radius * theta.sin(), z)
        })
        .collect()
}

/// Generates `n` uniformly distributed random points on the unit sphere.
///
/// # Arguments
/// * `n` - Number of points
/// * `seed` - Random seed for reproducible sampling
pub fn random_points(n: usize, seed: u64) -> Vec<DVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    (0..n)
        .map(|_| {
            let u: f64 = rng.random();
            let v: f64 = rng.random();
            let theta = 2.0 * PI * u;
            let z = 2.0 * v - 1.0;
            let radius = (1.0 - z * z).max(0.0).sqrt();
            DVec3::new(radius * theta.cos(), radius * theta.sin(), z)
        })
        .collect()
}
