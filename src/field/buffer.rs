//! Flat, shape-addressed field buffers.

use glam::Vec2;

use super::{Element, ElementKind, FieldError};
use crate::geometry::Shape;

/// Anything that can address a cell of a [`Field`]: a flat index or a coordinate.
pub trait FieldIndex {
    fn to_flat(&self, shape: &Shape) -> Result<usize, FieldError>;
}

impl FieldIndex for usize {
    fn to_flat(&self, shape: &Shape) -> Result<usize, FieldError> {
        if *self < shape.elem() {
            Ok(*self)
        } else {
            Err(FieldError::IndexOutOfBounds {
                index: vec![*self],
                extents: vec![shape.elem()],
            })
        }
    }
}

impl FieldIndex for &[usize] {
    fn to_flat(&self, shape: &Shape) -> Result<usize, FieldError> {
        shape.flat(self)
    }
}

impl FieldIndex for &Vec<usize> {
    fn to_flat(&self, shape: &Shape) -> Result<usize, FieldError> {
        shape.flat(self)
    }
}

impl<const N: usize> FieldIndex for [usize; N] {
    fn to_flat(&self, shape: &Shape) -> Result<usize, FieldError> {
        shape.flat(self)
    }
}

/// A contiguous buffer of one element type, laid out by a [`Shape`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T: Element> {
    shape: Shape,
    data: Vec<T>,
}

impl<T: Element> Field<T> {
    /// Creates a field with every cell set to `T::default()`.
    pub fn new(shape: Shape) -> Self {
        Self::filled(shape, T::default())
    }

    /// Creates a field with every cell set to `value`.
    pub fn filled(shape: Shape, value: T) -> Self {
        let data = vec![value; shape.elem()];
        Self { shape, data }
    }

    /// Wraps an existing buffer. Its length must equal `shape.elem()`.
    pub fn from_vec(shape: Shape, data: Vec<T>) -> Result<Self, FieldError> {
        if data.len() != shape.elem() {
            return Err(FieldError::ShapeMismatch {
                expected: shape.elem(),
                found: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Builds a field by evaluating `f` at every coordinate, in flattening order.
    pub fn from_fn(shape: Shape, f: impl Fn(&[usize]) -> T) -> Self {
        let data = shape.iter().map(|coord| f(&coord)).collect();
        Self { shape, data }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Number of cells.
    pub fn elem(&self) -> usize {
        self.data.len()
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> usize {
        self.elem() * std::mem::size_of::<T>()
    }

    pub fn fill(&mut self, value: T) -> &mut Self {
        self.data.fill(value);
        self
    }

    pub fn zero(&mut self) -> &mut Self {
        self.fill(T::default())
    }

    pub fn get(&self, index: impl FieldIndex) -> Result<T, FieldError> {
        let i = index.to_flat(&self.shape)?;
        Ok(self.data[i])
    }

    pub fn get_mut(&mut self, index: impl FieldIndex) -> Result<&mut T, FieldError> {
        let i = index.to_flat(&self.shape)?;
        Ok(&mut self.data[i])
    }

    pub fn set(&mut self, index: impl FieldIndex, value: T) -> Result<(), FieldError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Reinterprets the buffer under a new shape with the same element count.
    ///
    /// The buffer is not reallocated.
    pub fn reshape(&mut self, shape: Shape) -> Result<&mut Self, FieldError> {
        if shape.elem() != self.shape.elem() {
            return Err(FieldError::ShapeMismatch {
                expected: self.shape.elem(),
                found: shape.elem(),
            });
        }
        self.shape = shape;
        Ok(self)
    }

    /// Copies the contents of `other` into `self`. Shapes must hold the same element count.
    pub fn copy_from(&mut self, other: &Field<T>) -> Result<(), FieldError> {
        if other.elem() != self.elem() {
            return Err(FieldError::ShapeMismatch {
                expected: self.elem(),
                found: other.elem(),
            });
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl Field<f32> {
    /// Returns `(min, max)` over all cells.
    pub fn range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }

    /// Sum of all cells, accumulated in `f64`.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }

    /// Bilinear sample at a continuous 2D position.
    ///
    /// Positions are clamped to the grid, so edge cells extend outward.
    /// The field must be two-dimensional.
    pub fn sample(&self, pos: Vec2) -> f32 {
        debug_assert_eq!(self.shape.dims(), 2);
        let nx = self.shape.extent(0);
        let ny = self.shape.extent(1);

        let x = pos.x.clamp(0.0, (nx - 1) as f32);
        let y = pos.y.clamp(0.0, (ny - 1) as f32);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let h00 = self.data[x0 * ny + y0];
        let h01 = self.data[x0 * ny + y1];
        let h10 = self.data[x1 * ny + y0];
        let h11 = self.data[x1 * ny + y1];

        let a = h00 * (1.0 - fy) + h01 * fy;
        let b = h10 * (1.0 - fy) + h11 * fy;
        a * (1.0 - fx) + b * fx
    }

    /// Central-difference gradient of the bilinear surface at `pos`.
    ///
    /// Differences are taken one cell to either side, shortened at the grid edge.
    pub fn gradient(&self, pos: Vec2) -> Vec2 {
        debug_assert_eq!(self.shape.dims(), 2);
        let max_x = (self.shape.extent(0) - 1) as f32;
        let max_y = (self.shape.extent(1) - 1) as f32;
        let p = Vec2::new(pos.x.clamp(0.0, max_x), pos.y.clamp(0.0, max_y));

        let axis = |lo: Vec2, hi: Vec2, span: f32| {
            if span <= 0.0 {
                0.0
            } else {
                (self.sample(hi) - self.sample(lo)) / span
            }
        };

        let x_lo = (p.x - 1.0).max(0.0);
        let x_hi = (p.x + 1.0).min(max_x);
        let y_lo = (p.y - 1.0).max(0.0);
        let y_hi = (p.y + 1.0).min(max_y);

        Vec2::new(
            axis(Vec2::new(x_lo, p.y), Vec2::new(x_hi, p.y), x_hi - x_lo),
            axis(Vec2::new(p.x, y_lo), Vec2::new(p.x, y_hi), y_hi - y_lo),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(extents: &[usize]) -> Shape {
        Shape::new(extents.to_vec()).unwrap()
    }

    #[test]
    fn test_fill_and_zero() {
        let mut field: Field<f32> = Field::new(shape(&[3, 3, 3]));
        field.fill(3.14);
        assert!(field.iter().all(|&v| v == 3.14));
        field.zero();
        assert!(field.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_size_in_bytes() {
        let scalar: Field<f32> = Field::new(shape(&[3, 3, 3]));
        assert_eq!(scalar.elem(), 27);
        assert_eq!(scalar.size(), 27 * 4);
        assert_eq!(scalar.kind(), ElementKind::Float32);

        let vector: Field<Vec2> = Field::new(shape(&[4, 4]));
        assert_eq!(vector.size(), 16 * 8);
        assert_eq!(vector.kind(), ElementKind::Vec2);
    }

    #[test]
    fn test_get_set_by_flat_and_coord() {
        let mut field: Field<f32> = Field::new(shape(&[3, 4]));
        field.set([1, 2], 5.0).unwrap();
        assert_eq!(field.get(6).unwrap(), 5.0);
        assert_eq!(field.get([1, 2]).unwrap(), 5.0);

        *field.get_mut(0).unwrap() += 1.0;
        assert_eq!(field.get(&[0usize, 0][..]).unwrap(), 1.0);
    }

    #[test]
    fn test_out_of_bounds_access_is_reported() {
        let mut field: Field<f32> = Field::new(shape(&[3, 4]));
        assert!(matches!(field.get(12), Err(FieldError::IndexOutOfBounds { .. })));
        assert!(matches!(field.get([3, 0]), Err(FieldError::IndexOutOfBounds { .. })));
        assert!(field.set([0, 4], 1.0).is_err());
    }

    #[test]
    fn test_reshape_preserves_elements() {
        let mut field: Field<f32> = Field::new(shape(&[3, 3, 3]));
        field.set(10, 2.5).unwrap();
        field.reshape(shape(&[3, 9])).unwrap();
        assert_eq!(field.shape().extents(), &[3, 9]);
        assert_eq!(field.elem(), 27);
        assert_eq!(field.get([1, 1]).unwrap(), 2.5);
    }

    #[test]
    fn test_copy_from_requires_matching_count() {
        let mut dst: Field<f32> = Field::new(Shape::new_2d(2, 3).unwrap());
        let src = Field::from_vec(Shape::new(vec![6]).unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.as_slice(), src.as_slice());
        assert_eq!(dst.shape().extents(), &[2, 3]);

        let short: Field<f32> = Field::new(Shape::new(vec![5]).unwrap());
        assert_eq!(
            dst.copy_from(&short),
            Err(FieldError::ShapeMismatch { expected: 6, found: 5 })
        );
    }

    #[test]
    fn test_reshape_mismatch_fails() {
        let mut field: Field<f32> = Field::new(shape(&[3, 3]));
        let err = field.reshape(shape(&[4, 4])).unwrap_err();
        assert_eq!(err, FieldError::ShapeMismatch { expected: 9, found: 16 });
        assert_eq!(field.shape().extents(), &[3, 3]);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Field::from_vec(shape(&[2, 2]), vec![0.0f32; 4]).is_ok());
        assert!(Field::from_vec(shape(&[2, 2]), vec![0.0f32; 3]).is_err());
    }

    #[test]
    fn test_range_and_sum() {
        let field = Field::from_fn(shape(&[2, 2]), |c| (c[0] * 2 + c[1]) as f32 - 1.0);
        assert_eq!(field.range(), (-1.0, 2.0));
        assert_eq!(field.sum(), 2.0);
    }

    #[test]
    fn test_bilinear_sample() {
        let field = Field::from_fn(shape(&[2, 2]), |c| (c[0] * 10 + c[1]) as f32);
        assert_eq!(field.sample(Vec2::new(0.0, 0.0)), 0.0);
        assert_eq!(field.sample(Vec2::new(1.0, 1.0)), 11.0);
        assert!((field.sample(Vec2::new(0.5, 0.5)) - 5.5).abs() < 1e-5);
        // Clamped outside the grid.
        assert_eq!(field.sample(Vec2::new(5.0, -3.0)), 10.0);
    }

    #[test]
    fn test_gradient_of_linear_ramp() {
        let field = Field::from_fn(shape(&[4, 4]), |c| 10.0 * (3.0 - c[0] as f32));
        for pos in [Vec2::new(0.0, 0.0), Vec2::new(1.4, 2.0), Vec2::new(3.0, 3.0)] {
            let g = field.gradient(pos);
            assert!((g.x + 10.0).abs() < 1e-4, "gradient {:?} at {:?}", g, pos);
            assert!(g.y.abs() < 1e-4);
        }
    }

    #[test]
    fn test_gradient_of_flat_field_is_zero() {
        let field: Field<f32> = Field::new(shape(&[8, 8]));
        assert_eq!(field.gradient(Vec2::new(3.3, 4.7)), Vec2::ZERO);
    }
}
