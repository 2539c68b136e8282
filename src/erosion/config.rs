//! Erosion configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::FieldError;

/// Invalid simulation or model configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Step count must be positive")]
    ZeroSteps,
    #[error("Particle count per step must be positive")]
    ZeroParticles,
    #[error("Learning rate must lie in (0, 1], got {0}")]
    LearningRate(f32),
    #[error("Parameter '{name}' must be finite and non-negative, got {value}")]
    InvalidParameter { name: &'static str, value: f32 },
    #[error("Exit-fraction threshold must lie in [0, 1], got {0}")]
    ExitThreshold(f32),
    #[error("Erosion model requires a 2D shape, got {0} dimensions")]
    NotTwoDimensional(usize),
    #[error("Seed value must be finite, got {0}")]
    NonFiniteSeed(f32),
    #[error("Seed function produced a non-finite height at cell {index}")]
    NonFiniteHeight { index: usize },
    #[error(transparent)]
    Field(#[from] FieldError),
}

pub(crate) fn check_param(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter { name, value })
    }
}

/// Physical constants of a single water drop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// Maximum number of interactions before a drop settles.
    pub max_age: u32,
    /// Fraction of volume lost per interaction (scaled up by resistance).
    pub evap_rate: f32,
    /// Rate at which the sediment deficit/excess is exchanged with the bed.
    pub deposition_rate: f32,
    /// Volume below which a drop settles.
    pub min_volume: f32,
    /// Capacity boost from smoothed discharge.
    pub entrainment: f32,
    /// Strength of the downhill force.
    pub gravity: f32,
    /// Strength of the pull toward the persistent momentum field.
    pub momentum_transfer: f32,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            max_age: 1024,
            evap_rate: 0.001,
            deposition_rate: 0.1,
            min_volume: 0.001,
            entrainment: 10.0,
            gravity: 1.0,
            momentum_transfer: 1.0,
        }
    }
}

impl DropConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_param("evap_rate", self.evap_rate)?;
        check_param("deposition_rate", self.deposition_rate)?;
        check_param("min_volume", self.min_volume)?;
        check_param("entrainment", self.entrainment)?;
        check_param("gravity", self.gravity)?;
        check_param("momentum_transfer", self.momentum_transfer)?;
        if self.evap_rate >= 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "evap_rate",
                value: self.evap_rate,
            });
        }
        if self.deposition_rate > 1.0 {
            return Err(ConfigError::InvalidParameter {
                name: "deposition_rate",
                value: self.deposition_rate,
            });
        }
        Ok(())
    }
}

/// Parameters for a particle erosion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Number of simulation steps.
    pub steps: usize,
    /// Drops spawned per step.
    pub particles: usize,
    /// Exponential smoothing rate for discharge and momentum.
    pub learning_rate: f32,
    /// Seed for the spawn-position generator.
    pub seed: u64,
    /// Stop early once a step's exit fraction reaches this value. Off by default.
    pub stop_at_exit_fraction: Option<f32>,
    /// Drop physics.
    pub drop: DropConfig,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            steps: 512,
            particles: 512,
            learning_rate: 0.1,
            seed: 0,
            stop_at_exit_fraction: None,
            drop: DropConfig::default(),
        }
    }
}

impl ErosionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if self.particles == 0 {
            return Err(ConfigError::ZeroParticles);
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ConfigError::LearningRate(self.learning_rate));
        }
        if let Some(threshold) = self.stop_at_exit_fraction {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::ExitThreshold(threshold));
            }
        }
        self.drop.validate()
    }

    /// Number of steps for the smoothing weight of a sample to halve.
    pub fn halflife(&self) -> f32 {
        0.5f32.ln() / (1.0 - self.learning_rate).ln()
    }
}
