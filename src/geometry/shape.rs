//! N-dimensional extent descriptor and coordinate/index conversion.

use serde::{Deserialize, Serialize};

use crate::field::FieldError;

/// Ordered set of positive extents describing a regular grid.
///
/// Flattening is row-major: the last dimension varies fastest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Shape {
    extents: Vec<usize>,
    strides: Vec<usize>,
}

impl Shape {
    /// Creates a shape from its extents.
    ///
    /// Fails with [`FieldError::InvalidShape`] if `extents` is empty, any extent is zero,
    /// or the cell count overflows `usize`.
    pub fn new(extents: impl Into<Vec<usize>>) -> Result<Self, FieldError> {
        let extents = extents.into();
        if extents.is_empty() || extents.iter().any(|&e| e == 0) {
            return Err(FieldError::InvalidShape(extents));
        }

        let mut strides = vec![1usize; extents.len()];
        for d in (0..extents.len() - 1).rev() {
            match strides[d + 1].checked_mul(extents[d + 1]) {
                Some(stride) => strides[d] = stride,
                None => return Err(FieldError::InvalidShape(extents)),
            }
        }
        if strides[0].checked_mul(extents[0]).is_none() {
            return Err(FieldError::InvalidShape(extents));
        }

        Ok(Self { extents, strides })
    }

    /// Shorthand for a two-dimensional shape.
    pub fn new_2d(nx: usize, ny: usize) -> Result<Self, FieldError> {
        Self::new(vec![nx, ny])
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.extents.len()
    }

    /// Extent along dimension `d`.
    ///
    /// # Panics
    /// Panics if `d >= self.dims()`.
    pub fn extent(&self, d: usize) -> usize {
        self.extents[d]
    }

    /// Total number of cells.
    pub fn elem(&self) -> usize {
        self.extents.iter().product()
    }

    /// Converts a coordinate into a flat index.
    pub fn flat(&self, coord: &[usize]) -> Result<usize, FieldError> {
        if coord.len() != self.dims() {
            return Err(FieldError::DimensionMismatch {
                expected: self.dims(),
                found: coord.len(),
            });
        }

        let mut index = 0;
        for (d, (&c, &e)) in coord.iter().zip(&self.extents).enumerate() {
            if c >= e {
                return Err(FieldError::IndexOutOfBounds {
                    index: coord.to_vec(),
                    extents: self.extents.clone(),
                });
            }
            index += c * self.strides[d];
        }
        Ok(index)
    }

    /// Inverse of [`Shape::flat`].
    pub fn unflat(&self, index: usize) -> Result<Vec<usize>, FieldError> {
        if index >= self.elem() {
            return Err(FieldError::IndexOutOfBounds {
                index: vec![index],
                extents: vec![self.elem()],
            });
        }

        let mut rest = index;
        Ok(self
            .strides
            .iter()
            .map(|&stride| {
                let c = rest / stride;
                rest %= stride;
                c
            })
            .collect())
    }

    /// True iff any component lies outside `[0, extent)` or the dimensionality differs.
    pub fn oob(&self, coord: &[i64]) -> bool {
        coord.len() != self.dims()
            || coord
                .iter()
                .zip(&self.extents)
                .any(|(&c, &e)| c < 0 || c >= e as i64)
    }

    /// Bounds test for a continuous position.
    ///
    /// Components are truncated toward zero before comparison, so `-0.5` maps to cell 0
    /// and counts as inside. Non-finite components are always out of bounds.
    pub fn oob_pos(&self, pos: &[f32]) -> bool {
        pos.len() != self.dims()
            || pos
                .iter()
                .zip(&self.extents)
                .any(|(&p, &e)| !p.is_finite() || p.trunc() < 0.0 || p.trunc() >= e as f32)
    }

    /// Flat index of the cell containing a continuous 2D position, or `None` outside.
    pub fn cell(&self, pos: glam::Vec2) -> Option<usize> {
        if self.dims() != 2 || self.oob_pos(&[pos.x, pos.y]) {
            return None;
        }
        let x = pos.x.trunc() as usize;
        let y = pos.y.trunc() as usize;
        Some(x * self.strides[0] + y)
    }

    /// Every valid coordinate exactly once, in flattening order.
    pub fn iter(&self) -> ShapeIter<'_> {
        ShapeIter {
            shape: self,
            next: 0,
        }
    }
}

impl TryFrom<Vec<usize>> for Shape {
    type Error = FieldError;

    fn try_from(extents: Vec<usize>) -> Result<Self, Self::Error> {
        Shape::new(extents)
    }
}

impl From<Shape> for Vec<usize> {
    fn from(shape: Shape) -> Self {
        shape.extents
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.extents.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Lazy iterator over the coordinates of a [`Shape`].
///
/// Cheap to create; call [`Shape::iter`] again to restart.
#[derive(Debug, Clone)]
pub struct ShapeIter<'a> {
    shape: &'a Shape,
    next: usize,
}

impl Iterator for ShapeIter<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let coord = self.shape.unflat(self.next).ok()?;
        self.next += 1;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.shape.elem().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for ShapeIter<'_> {}
