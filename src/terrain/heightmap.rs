//! Initial height field generation from an injected seed function.

use rayon::prelude::*;

use super::model::{Model, ModelParams};
use crate::erosion::ConfigError;
use crate::field::Field;
use crate::geometry::Shape;

impl Model {
    /// Builds a model whose height is seeded from `seed_fn`.
    ///
    /// `seed_fn(x, y, seed)` is evaluated once per cell with `x = i / nx` and `y = j / ny`
    /// in `[0, 1)`; the result is scaled by `params.height_scale`. The function is opaque
    /// to the model, any noise source satisfying the signature works.
    ///
    /// Cells are evaluated in parallel, so `seed_fn` must be `Sync`.
    pub fn build<F>(shape: Shape, seed_fn: F, seed: f32, params: ModelParams) -> Result<Self, ConfigError>
    where
        F: Fn(f32, f32, f32) -> f32 + Sync,
    {
        if shape.dims() != 2 {
            return Err(ConfigError::NotTwoDimensional(shape.dims()));
        }
        if !seed.is_finite() {
            return Err(ConfigError::NonFiniteSeed(seed));
        }

        let nx = shape.extent(0);
        let ny = shape.extent(1);
        let scale = params.height_scale;

        let mut heights = vec![0.0f32; shape.elem()];
        heights.par_iter_mut().enumerate().for_each(|(i, height)| {
            let x = (i / ny) as f32 / nx as f32;
            let y = (i % ny) as f32 / ny as f32;
            *height = scale * seed_fn(x, y, seed);
        });

        if let Some(index) = heights.iter().position(|h| !h.is_finite()) {
            return Err(ConfigError::NonFiniteHeight { index });
        }

        let field = Field::from_vec(shape, heights)?;
        let (min, max) = field.range();
        log::info!(
            "Seeded height field {} (seed {}), range [{:.3}, {:.3}]",
            field.shape(),
            seed,
            min,
            max
        );

        Self::from_height(field, params)
    }
}
