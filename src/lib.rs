//! Particle-based hydraulic erosion on regular grids.
//!
//! This crate provides N-dimensional shapes and typed fields, layers that keep
//! exponentially smoothed statistics, and a water-drop erosion model driven in
//! batches over a 2D height field.

pub mod geometry;
pub mod field;
pub mod terrain;
pub mod erosion;
pub mod noise;
pub mod export;

pub use geometry::Shape;
pub use field::{Field, FieldError, Layer};
pub use terrain::{Model, ModelParams};
pub use erosion::{Drop, DropState, ErosionConfig, ErosionError, Simulation, StepReport};
pub use noise::FractalNoiseConfig;
