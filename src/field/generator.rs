//! Procedural point sampling for energy fields.
//!
//! Points are spread uniformly through a ball of radius [`BALL_RADIUS`] and
//! then pushed by a jitter in `[0, JITTER)` on every axis. The jitter is
//! never negative, so the cloud sits slightly off-centre toward +x/+y/+z.
//! That skew is part of the look and is kept.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Radius of the sampling ball before jitter.
pub const BALL_RADIUS: f32 = 0.7;

/// Upper bound (exclusive) of the per-axis jitter.
pub const JITTER: f32 = 0.2;

/// Furthest any sample can land from the origin.
pub fn max_extent() -> f32 {
    BALL_RADIUS + JITTER * 3.0f32.sqrt()
}

/// One generated point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldSample {
    pub position: Vec3,
    /// Distance from the origin before jitter, at most [`BALL_RADIUS`].
    pub radius: f32,
    /// Size multiplier in `[0.2, 1.0)`.
    pub size: f32,
    /// Phase along the curve in `[0, 1)`.
    pub phase_offset: f32,
}

/// Generate `count` samples from `rng`.
///
/// The result depends only on the RNG stream and `count`. Positions are drawn
/// for every point first, then sizes and phases.
pub fn generate<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<FieldSample> {
    let mut samples: Vec<FieldSample> = (0..count)
        .map(|_| {
            let theta = TAU * rng.gen::<f32>();
            let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();
            // Cube root for uniform volume distribution
            let radius = rng.gen::<f32>().cbrt() * BALL_RADIUS;

            let direction = Vec3::new(phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos());
            let jitter = Vec3::new(
                rng.gen::<f32>() * JITTER,
                rng.gen::<f32>() * JITTER,
                rng.gen::<f32>() * JITTER,
            );

            FieldSample {
                position: direction * radius + jitter,
                radius,
                size: 0.0,
                phase_offset: 0.0,
            }
        })
        .collect();

    for sample in &mut samples {
        sample.size = 0.2 + rng.gen::<f32>() * 0.8;
        sample.phase_offset = rng.gen();
    }
    samples
}

/// Generate from a fresh entropy-seeded stream.
pub fn generate_fresh(count: usize) -> Vec<FieldSample> {
    generate(count, &mut SmallRng::from_entropy())
}
