//! Noise generation for seeding terrain.
//!
//! Uses simdnoise for high-performance SIMD-accelerated noise generation.
//! The erosion model never depends on this module; it only consumes the
//! `(x, y, seed) -> f32` function produced by [`FractalNoiseConfig::seed_fn`].

mod fractal;

pub use fractal::{sample_fractal_noise, FractalNoiseConfig};
