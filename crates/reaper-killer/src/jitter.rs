//! Randomized threshold offsets.
//!
//! Workers in a pool see roughly the same traffic, so identical thresholds
//! would make them all restart at once. Each worker draws its own offset.

use rand::Rng;

/// Random value in `[0, |magnitude|]`.
///
/// Zero and non-finite magnitudes yield 0.
pub fn jitter(magnitude: f64) -> f64 {
    jitter_with(&mut rand::thread_rng(), magnitude)
}

pub fn jitter_with<R: Rng + ?Sized>(rng: &mut R, magnitude: f64) -> f64 {
    let bound = magnitude.abs();
    if !bound.is_finite() || bound == 0.0 {
        return 0.0;
    }
    rng.gen_range(0.0..=bound)
}

/// Uniform draw from `[min, max]` inclusive. Bounds are swapped if inverted.
pub fn draw_budget(min: u64, max: u64) -> u64 {
    draw_budget_with(&mut rand::thread_rng(), min, max)
}

pub fn draw_budget_with<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}
