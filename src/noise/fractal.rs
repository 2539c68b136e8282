//! Multi-octave fractal Brownian motion (fBm) noise for seeding height fields.

use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

/// Configuration for multi-octave fractal noise generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FractalNoiseConfig {
    /// Number of noise octaves (4-8 typical).
    pub octaves: u8,
    /// Base frequency over the unit square.
    pub frequency: f32,
    /// Frequency multiplier per octave (typically 2.0).
    pub lacunarity: f32,
    /// Amplitude decay per octave (0.4-0.6 typical).
    pub persistence: f32,
    /// Integer seed mixed into every octave.
    pub seed: i32,
}

impl Default for FractalNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 8,
            frequency: 4.0,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 42,
        }
    }
}

impl FractalNoiseConfig {
    /// Creates a new noise configuration with the given seed.
    pub fn with_seed(seed: i32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Fewer octaves and a lower frequency: broad valleys, little fine detail.
    pub fn rolling(seed: i32) -> Self {
        Self {
            octaves: 4,
            frequency: 2.0,
            lacunarity: 2.0,
            persistence: 0.4,
            seed,
        }
    }

    /// Borrows this configuration as a `(x, y, seed) -> height` function for
    /// [`Model::build`](crate::terrain::Model::build).
    pub fn seed_fn(&self) -> impl Fn(f32, f32, f32) -> f32 + Sync + '_ {
        move |x, y, z| sample_fractal_noise(x, y, z, self)
    }
}

/// Samples fractal noise at a point of the unit square.
///
/// `z` selects a slice of the 3D noise volume, so distinct `z` values give
/// unrelated terrains from the same configuration.
///
/// # Returns
/// A noise value in approximately [-1, 1] range (normalized by amplitude sum)
pub fn sample_fractal_noise(x: f32, y: f32, z: f32, config: &FractalNoiseConfig) -> f32 {
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves {
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);

        let noise_value = NoiseBuilder::fbm_3d_offset(x * frequency, 1, y * frequency, 1, z * frequency, 1)
            .with_seed(octave_seed)
            .with_freq(1.0)
            .with_octaves(1)
            .generate()
            .0[0];

        total += noise_value * amplitude;
        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    if max_amplitude > 0.0 {
        total / max_amplitude
    } else {
        0.0
    }
}
