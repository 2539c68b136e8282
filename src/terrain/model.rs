//! The erosion model: a 2D shape plus its fixed set of layers.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::erosion::config::check_param;
use crate::erosion::ConfigError;
use crate::field::{Element, Field, FieldError, Layer};
use crate::geometry::Shape;

/// Scalar parameters broadcast as constant layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Bed resistance in [0, 1]; damps erosion and speeds up volume loss.
    pub resistance: f32,
    /// Height difference per cell tolerated before material slides (and drops stall).
    pub maxdiff: f32,
    /// Fraction of excess slope relaxed per cascade.
    pub settling: f32,
    /// Multiplier applied to the seed function when building a height field.
    pub height_scale: f32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            resistance: 0.0,
            maxdiff: 0.8,
            settling: 1.0,
            height_scale: 80.0,
        }
    }
}

impl ModelParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_param("resistance", self.resistance)?;
        check_param("maxdiff", self.maxdiff)?;
        check_param("settling", self.settling)?;
        for (name, value) in [("resistance", self.resistance), ("settling", self.settling)] {
            if value > 1.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if !self.height_scale.is_finite() {
            return Err(ConfigError::InvalidParameter {
                name: "height_scale",
                value: self.height_scale,
            });
        }
        Ok(())
    }
}

/// Height, flow statistics and parameters for one erosion run.
///
/// All field-backed layers share the model's shape. The model is mutated in
/// place; use [`Model::snapshot_height`] for an explicit copy.
#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) shape: Shape,
    pub(crate) height: Layer<f32>,
    pub(crate) momentum: Layer<Vec2>,
    pub(crate) momentum_track: Layer<Vec2>,
    pub(crate) discharge: Layer<f32>,
    pub(crate) discharge_track: Layer<f32>,
    pub(crate) resistance: Layer<f32>,
    pub(crate) maxdiff: Layer<f32>,
    pub(crate) settling: Layer<f32>,
}

fn state<'a, T: Element>(layer: &'a Layer<T>) -> Result<&'a Field<T>, FieldError> {
    layer.as_field().ok_or(FieldError::ConstantLayer(layer.name()))
}

impl Model {
    /// Creates a model over a flat (all-zero) height field.
    pub fn new(shape: Shape, params: ModelParams) -> Result<Self, ConfigError> {
        Self::from_height(Field::new(shape), params)
    }

    /// Creates a model around an existing height field.
    pub fn from_height(height: Field<f32>, params: ModelParams) -> Result<Self, ConfigError> {
        let shape = height.shape().clone();
        if shape.dims() != 2 {
            return Err(ConfigError::NotTwoDimensional(shape.dims()));
        }
        params.validate()?;

        Ok(Self {
            height: Layer::field("height", height),
            momentum: Layer::zeroed("momentum", shape.clone()),
            momentum_track: Layer::zeroed("momentum_track", shape.clone()),
            discharge: Layer::zeroed("discharge", shape.clone()),
            discharge_track: Layer::zeroed("discharge_track", shape.clone()),
            resistance: Layer::constant("resistance", params.resistance),
            maxdiff: Layer::constant("maxdiff", params.maxdiff),
            settling: Layer::constant("settling", params.settling),
            shape,
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn height(&self) -> &Layer<f32> {
        &self.height
    }

    pub fn momentum(&self) -> &Layer<Vec2> {
        &self.momentum
    }

    pub fn momentum_track(&self) -> &Layer<Vec2> {
        &self.momentum_track
    }

    pub fn discharge(&self) -> &Layer<f32> {
        &self.discharge
    }

    pub fn discharge_track(&self) -> &Layer<f32> {
        &self.discharge_track
    }

    pub fn resistance(&self) -> &Layer<f32> {
        &self.resistance
    }

    pub fn maxdiff(&self) -> &Layer<f32> {
        &self.maxdiff
    }

    pub fn settling(&self) -> &Layer<f32> {
        &self.settling
    }

    /// Read-only view of the height field.
    pub fn height_field(&self) -> Result<&Field<f32>, FieldError> {
        state(&self.height)
    }

    /// Read-only view of the smoothed discharge field.
    pub fn discharge_field(&self) -> Result<&Field<f32>, FieldError> {
        state(&self.discharge)
    }

    /// Read-only view of the smoothed momentum field.
    pub fn momentum_field(&self) -> Result<&Field<Vec2>, FieldError> {
        state(&self.momentum)
    }

    /// Explicit copy of the current height field.
    pub fn snapshot_height(&self) -> Result<Field<f32>, FieldError> {
        self.height_field().cloned()
    }

    /// Overwrites the height field with a previously taken snapshot.
    pub fn restore_height(&mut self, snapshot: &Field<f32>) -> Result<(), FieldError> {
        if snapshot.shape() != &self.shape {
            return Err(FieldError::ShapeMismatch {
                expected: self.shape.elem(),
                found: snapshot.elem(),
            });
        }
        self.height.field_mut()?.copy_from(snapshot)
    }

    /// Bilinear height at a continuous position (clamped to the grid).
    pub fn height_at(&self, pos: Vec2) -> Result<f32, FieldError> {
        Ok(self.height_field()?.sample(pos))
    }

    /// Height gradient at a continuous position.
    pub fn gradient(&self, pos: Vec2) -> Result<Vec2, FieldError> {
        Ok(self.height_field()?.gradient(pos))
    }

    /// Unit surface normal of the height field at `pos` (z up).
    pub fn normal(&self, pos: Vec2) -> Result<Vec3, FieldError> {
        let g = self.gradient(pos)?;
        Ok(Vec3::new(-g.x, -g.y, 1.0).normalize())
    }

    /// Zeroes both per-step track buffers.
    pub fn clear_tracks(&mut self) -> Result<(), FieldError> {
        self.discharge_track.field_mut()?.zero();
        self.momentum_track.field_mut()?.zero();
        Ok(())
    }

    /// Folds the track buffers into the persistent discharge and momentum layers.
    pub fn fold_tracks(&mut self, rate: f32) -> Result<(), FieldError> {
        self.discharge.track(state(&self.discharge_track)?, rate)?;
        self.momentum.track(state(&self.momentum_track)?, rate)?;
        Ok(())
    }

    /// Minimum and maximum height.
    pub fn height_range(&self) -> Result<(f32, f32), FieldError> {
        Ok(self.height_field()?.range())
    }

    /// Total material in the height field.
    pub fn total_height(&self) -> Result<f64, FieldError> {
        Ok(self.height_field()?.sum())
    }
}
