//! Particle-based hydraulic erosion.
//!
//! Drops are spawned at random positions, descend the height field while eroding and
//! depositing sediment, and either leave the grid or settle. The [`Simulation`] driver
//! runs them in batches and folds their paths into smoothed discharge and momentum.

pub(crate) mod config;
mod cascade;
mod driver;
mod drop;

use thiserror::Error;

use crate::field::FieldError;

pub use cascade::cascade;
pub use config::{ConfigError, DropConfig, ErosionConfig};
pub use driver::{run, Simulation, StepReport};
pub use drop::{Drop, DropState};

/// Errors raised while running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErosionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Field access failed: {0}")]
    Field(#[from] FieldError),
}
