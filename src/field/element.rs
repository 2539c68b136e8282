//! Element types storable in a [`Field`](super::Field).

use std::fmt::Debug;
use std::ops::{Add, Mul};

use glam::Vec2;

/// Runtime tag for the element type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Float32,
    Vec2,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Float32 => "float32",
            ElementKind::Vec2 => "vec2",
        }
    }
}

/// Scalar or vector value held per grid cell.
///
/// Only `f32` and [`Vec2`] implement this; the tracking fold relies on the
/// componentwise `Add` and `Mul<f32>`.
pub trait Element:
    Copy + Default + PartialEq + Debug + Send + Sync + Add<Output = Self> + Mul<f32, Output = Self> + 'static
{
    const KIND: ElementKind;

    /// Exponential blend toward `target`: `self * (1 - rate) + target * rate`.
    #[inline]
    fn blend(self, target: Self, rate: f32) -> Self {
        self * (1.0 - rate) + target * rate
    }
}

impl Element for f32 {
    const KIND: ElementKind = ElementKind::Float32;
}

impl Element for Vec2 {
    const KIND: ElementKind = ElementKind::Vec2;
}
