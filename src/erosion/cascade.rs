//! Slope relaxation around a cell.

use crate::field::FieldError;
use crate::geometry::neighbors::moore_neighbors;
use crate::terrain::Model;

/// Relaxes height differences between cell `index` and its Moore neighbours.
///
/// A difference larger than `maxdiff * distance` sheds `settling * excess / 2` from the
/// higher cell to the lower one. Neighbours are visited lowest first. Mass is conserved.
pub fn cascade(model: &mut Model, index: usize) -> Result<(), FieldError> {
    let Model {
        shape,
        height,
        maxdiff,
        settling,
        ..
    } = model;
    let heights = height.field_mut()?.as_mut_slice();

    let mut neighbors: Vec<(usize, f32)> = moore_neighbors(shape, index).collect();
    neighbors.sort_by(|a, b| heights[a.0].total_cmp(&heights[b.0]));

    for (n, distance) in neighbors {
        let diff = heights[index] - heights[n];
        if diff == 0.0 {
            continue;
        }

        let excess = diff.abs() - distance * maxdiff.at(n);
        if excess <= 0.0 {
            continue;
        }

        let transfer = settling.at(n) * excess / 2.0;
        if diff > 0.0 {
            heights[index] -= transfer;
            heights[n] += transfer;
        } else {
            heights[index] += transfer;
            heights[n] -= transfer;
        }
    }

    Ok(())
}
