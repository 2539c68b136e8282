//! Named simulation quantities backed by a field or a constant.

use rayon::prelude::*;

use super::{Element, Field, FieldError, FieldIndex};
use crate::geometry::Shape;

/// Storage behind a [`Layer`].
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSource<T: Element> {
    /// A single value broadcast to every cell. Immutable for the duration of a run.
    Constant(T),
    /// Owned per-cell state.
    Field(Field<T>),
}

/// A named simulation quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<T: Element> {
    name: &'static str,
    source: LayerSource<T>,
}

impl<T: Element> Layer<T> {
    pub fn constant(name: &'static str, value: T) -> Self {
        Self {
            name,
            source: LayerSource::Constant(value),
        }
    }

    pub fn field(name: &'static str, field: Field<T>) -> Self {
        Self {
            name,
            source: LayerSource::Field(field),
        }
    }

    /// A field layer of `shape` initialised to `T::default()`.
    pub fn zeroed(name: &'static str, shape: Shape) -> Self {
        Self::field(name, Field::new(shape))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn source(&self) -> &LayerSource<T> {
        &self.source
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.source, LayerSource::Constant(_))
    }

    pub fn as_field(&self) -> Option<&Field<T>> {
        match &self.source {
            LayerSource::Field(field) => Some(field),
            LayerSource::Constant(_) => None,
        }
    }

    /// Mutable access to the backing field. Constants are read-only.
    pub fn field_mut(&mut self) -> Result<&mut Field<T>, FieldError> {
        match &mut self.source {
            LayerSource::Field(field) => Ok(field),
            LayerSource::Constant(_) => Err(FieldError::ConstantLayer(self.name)),
        }
    }

    /// Bounds-checked read. Constants ignore the index.
    pub fn get(&self, index: impl FieldIndex) -> Result<T, FieldError> {
        match &self.source {
            LayerSource::Constant(value) => Ok(*value),
            LayerSource::Field(field) => field.get(index),
        }
    }

    /// Unchecked-by-`Result` read at a flat index already known to be inside the grid.
    ///
    /// # Panics
    /// Panics if `index` is out of range for a field-backed layer.
    #[inline]
    pub fn at(&self, index: usize) -> T {
        match &self.source {
            LayerSource::Constant(value) => *value,
            LayerSource::Field(field) => field.as_slice()[index],
        }
    }

    /// Folds a per-step accumulation into this layer by exponential smoothing:
    ///
    /// `self[i] = self[i] * (1 - rate) + accumulation[i] * rate`
    ///
    /// `rate = 1.0` degenerates to a copy.
    pub fn track(&mut self, accumulation: &Field<T>, rate: f32) -> Result<(), FieldError> {
        let field = self.field_mut()?;
        if field.elem() != accumulation.elem() {
            return Err(FieldError::ShapeMismatch {
                expected: field.elem(),
                found: accumulation.elem(),
            });
        }

        field
            .as_mut_slice()
            .par_iter_mut()
            .zip(accumulation.as_slice().par_iter())
            .for_each(|(p, &a)| *p = p.blend(a, rate));
        Ok(())
    }
}
