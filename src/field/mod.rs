//! Typed grid storage.
//!
//! A [`Field`] is a flat buffer addressed through a [`Shape`](crate::geometry::Shape);
//! a [`Layer`] wraps either a field or a broadcast constant as a named simulation
//! quantity and implements the exponential tracking fold.

mod buffer;
mod element;
mod layer;

use thiserror::Error;

pub use buffer::{Field, FieldIndex};
pub use element::{Element, ElementKind};
pub use layer::{Layer, LayerSource};

/// Errors raised by direct shape and field access.
///
/// These signal programming or configuration mistakes; normal simulation outcomes
/// (a particle leaving the grid, a particle settling) are never reported this way.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("Shape mismatch: expected {expected} elements, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("Index {index:?} out of bounds for extents {extents:?}")]
    IndexOutOfBounds { index: Vec<usize>, extents: Vec<usize> },
    #[error("Coordinate has {found} components, shape has {expected} dimensions")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Invalid shape {0:?}: extents must be non-empty and positive")]
    InvalidShape(Vec<usize>),
    #[error("Layer '{0}' is a constant and cannot be written or tracked")]
    ConstantLayer(&'static str),
}
