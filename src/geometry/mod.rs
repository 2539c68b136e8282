//! Regular-grid geometry.
//!
//! Provides the N-dimensional [`Shape`] used to address every field in the
//! simulation, and neighbourhood helpers for 2D grids.

mod shape;
pub mod neighbors;

pub use shape::{Shape, ShapeIter};
