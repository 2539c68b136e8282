//! Terrain model.
//!
//! Provides the [`Model`] holding the height field, the smoothed flow
//! statistics derived from drops, and the bed parameters.

mod model;
mod heightmap;

pub use model::{Model, ModelParams};
