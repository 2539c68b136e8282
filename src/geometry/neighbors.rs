//! Grid neighbourhoods on a 2D [`Shape`].
//!
//! Used by the cascade relaxation; the order of `MOORE` is fixed so that
//! relaxation is deterministic.

use std::f32::consts::SQRT_2;

use super::Shape;

/// A neighbour offset and the distance to it in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub dx: i64,
    pub dy: i64,
    pub distance: f32,
}

const fn offset(dx: i64, dy: i64, distance: f32) -> Offset {
    Offset { dx, dy, distance }
}

/// The 8-neighbourhood (Moore), cardinals first.
pub const MOORE: [Offset; 8] = [
    offset(1, 0, 1.0),
    offset(-1, 0, 1.0),
    offset(0, 1, 1.0),
    offset(0, -1, 1.0),
    offset(1, 1, SQRT_2),
    offset(-1, -1, SQRT_2),
    offset(1, -1, SQRT_2),
    offset(-1, 1, SQRT_2),
];

/// Returns the flat index of the neighbour of cell `index` at `off`, or `None` if it falls
/// outside the shape.
///
/// `shape` must be two-dimensional.
pub fn neighbor(shape: &Shape, index: usize, off: Offset) -> Option<usize> {
    debug_assert_eq!(shape.dims(), 2);
    let ny = shape.extent(1);
    let x = (index / ny) as i64 + off.dx;
    let y = (index % ny) as i64 + off.dy;
    if shape.oob(&[x, y]) {
        return None;
    }
    Some(x as usize * ny + y as usize)
}

/// Iterates the in-bounds Moore neighbours of `index` as `(flat_index, distance)`.
pub fn moore_neighbors(shape: &Shape, index: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
    MOORE
        .iter()
        .filter_map(move |&off| neighbor(shape, index, off).map(|n| (n, off.distance)))
}
