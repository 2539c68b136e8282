//! Water drop particle and its transition operations.
//!
//! A descent is driven by the loop
//!
//! ```text
//! while drop.move_step(model)? {
//!     drop.track(model)?;
//!     if !drop.interact(model)? { break; }
//! }
//! ```
//!
//! Each operation is a single transition with an explicit continuation flag.
//! Whichever transition ends the descent inside the grid also drops the carried
//! sediment there, so this loop alone conserves material on a closed grid.
//! Errors are reserved for misuse (e.g. a constant-backed state layer).

use std::f32::consts::SQRT_2;

use glam::Vec2;

use super::cascade::cascade;
use super::DropConfig;
use crate::field::FieldError;
use crate::terrain::Model;

const MIN_SPEED_SQ: f32 = 1e-12;

/// Lifecycle of a drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropState {
    /// Created, not moved yet.
    Spawned,
    /// Completed a move, awaiting interaction.
    Moving,
    /// Completed an interaction, ready to move again.
    Interacting,
    /// Left the grid.
    Exited,
    /// Stalled, exhausted, or aged out inside the grid.
    Settled,
}

impl DropState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DropState::Exited | DropState::Settled)
    }
}

/// A single parcel of water descending the height field.
#[derive(Debug, Clone)]
pub struct Drop {
    pos: Vec2,
    speed: Vec2,
    volume: f32,
    sediment: f32,
    age: u32,
    last_cell: Option<usize>,
    state: DropState,
    config: DropConfig,
}

/// Saturating weight of smoothed discharge, `erf(0.4 * d)`.
pub(crate) fn discharge_weight(discharge: f32) -> f32 {
    erf(0.4 * discharge)
}

// Abramowitz & Stegun 7.1.26, |error| < 1.5e-7.
fn erf(x: f32) -> f32 {
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.327_591_1 * x);
    let poly = t
        * (0.254_829_6
            + t * (-0.284_496_74 + t * (1.421_413_7 + t * (-1.453_152_1 + t * 1.061_405_4))));
    sign * (1.0 - poly * (-x * x).exp())
}

impl Drop {
    /// A fresh drop with unit volume at `pos`.
    pub fn new(pos: Vec2, config: DropConfig) -> Self {
        Self {
            pos,
            speed: Vec2::ZERO,
            volume: 1.0,
            sediment: 0.0,
            age: 0,
            last_cell: None,
            state: DropState::Spawned,
            config,
        }
    }

    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    pub fn speed(&self) -> Vec2 {
        self.speed
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Carried sediment mass.
    pub fn sediment(&self) -> f32 {
        self.sediment
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn state(&self) -> DropState {
        self.state
    }

    /// Advances the drop one step downhill.
    ///
    /// Gravity pulls along the surface normal, the smoothed momentum field drags the
    /// drop along established flow, and the resulting step is normalised to one cell
    /// diagonal. Returns `false` when the drop leaves the grid (`Exited`) or when no
    /// viable descent exists (`Settled`): zero resulting speed, or a target whose height
    /// exceeds the current height by more than `maxdiff`. A drop that settles here
    /// deposits its carried sediment in its current cell.
    pub fn move_step(&mut self, model: &mut Model) -> Result<bool, FieldError> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        let Some(cell) = model.shape().cell(self.pos) else {
            self.state = DropState::Exited;
            return Ok(false);
        };

        let height = model.height_field()?;
        let h0 = height.sample(self.pos);
        let normal = model.normal(self.pos)?;
        let flow = model.momentum.at(cell);
        let discharge = discharge_weight(model.discharge.at(cell));

        self.speed += self.config.gravity * Vec2::new(normal.x, normal.y) / self.volume;

        if flow.length_squared() > 0.0 && self.speed.length_squared() > 0.0 {
            let alignment = flow.normalize().dot(self.speed.normalize());
            self.speed += self.config.momentum_transfer * alignment / (self.volume + discharge) * flow;
        }

        if self.speed.length_squared() < MIN_SPEED_SQ {
            self.speed = Vec2::ZERO;
            self.state = DropState::Settled;
            self.settle(model)?;
            return Ok(false);
        }

        self.speed = SQRT_2 * self.speed.normalize();
        let next = self.pos + self.speed;

        if model.shape().cell(next).is_none() {
            self.pos = next;
            self.state = DropState::Exited;
            return Ok(false);
        }

        if height.sample(next) - h0 > model.maxdiff.at(cell) {
            self.state = DropState::Settled;
            self.settle(model)?;
            return Ok(false);
        }

        self.last_cell = Some(cell);
        self.pos = next;
        self.state = DropState::Moving;
        Ok(true)
    }

    /// Exchanges sediment with the bed at the cell the drop just left, then loses volume.
    ///
    /// The carrying capacity grows with the height drop across the last step and with
    /// the smoothed discharge there. The deficit (or excess) is exchanged at
    /// `deposition_rate * (1 - resistance)`, followed by slope relaxation around the cell.
    /// Returns `false` once the drop runs out of volume or age (`Settled`); any carried
    /// sediment is then deposited where it stopped.
    ///
    /// Height is written directly, never buffered.
    pub fn interact(&mut self, model: &mut Model) -> Result<bool, FieldError> {
        if self.state.is_terminal() {
            return Ok(false);
        }
        let Some(here) = model.shape().cell(self.pos) else {
            self.state = DropState::Exited;
            return Ok(false);
        };
        let cell = self.last_cell.unwrap_or(here);

        let resistance = model.resistance.at(cell);
        let discharge = discharge_weight(model.discharge.at(cell));
        let h_here = model.height_at(self.pos)?;

        let heights = model.height.field_mut()?.as_mut_slice();
        let drop_height = heights[cell] - h_here;
        let capacity = ((1.0 + self.config.entrainment * discharge) * drop_height).max(0.0);
        let rate = (self.config.deposition_rate * (1.0 - resistance)).clamp(0.0, 1.0);
        let exchange = rate * (capacity - self.sediment);

        self.sediment += exchange;
        heights[cell] -= exchange;

        cascade(model, cell)?;

        let loss = (self.config.evap_rate * (1.0 + resistance)).min(1.0);
        self.volume *= 1.0 - loss;
        self.age += 1;

        if self.volume <= self.config.min_volume || self.age >= self.config.max_age {
            self.state = DropState::Settled;
            self.settle(model)?;
            return Ok(false);
        }

        self.state = DropState::Interacting;
        Ok(true)
    }

    /// Adds this drop's volume and momentum to the per-step track buffers at its cell.
    ///
    /// Contributions from several drops on the same cell sum.
    pub fn track(&self, model: &mut Model) -> Result<(), FieldError> {
        let Some(cell) = model.shape().cell(self.pos) else {
            return Ok(());
        };
        model.discharge_track.field_mut()?.as_mut_slice()[cell] += self.volume;
        model.momentum_track.field_mut()?.as_mut_slice()[cell] += self.speed * self.volume;
        Ok(())
    }

    // Sediment carried off the grid is lost with the drop.
    fn settle(&mut self, model: &mut Model) -> Result<(), FieldError> {
        if self.sediment == 0.0 {
            return Ok(());
        }
        if let Some(cell) = model.shape().cell(self.pos) {
            model.height.field_mut()?.as_mut_slice()[cell] += self.sediment;
            self.sediment = 0.0;
        }
        Ok(())
    }

    /// Runs the full move / track / interact loop until the drop terminates.
    pub fn descend(&mut self, model: &mut Model) -> Result<DropState, FieldError> {
        while self.move_step(model)? {
            self.track(model)?;
            if !self.interact(model)? {
                break;
            }
        }
        Ok(self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::geometry::Shape;
    use crate::terrain::ModelParams;

    fn model_from(nx: usize, ny: usize, f: impl Fn(f32, f32) -> f32) -> Model {
        model_with(nx, ny, ModelParams::default(), f)
    }

    fn model_with(nx: usize, ny: usize, params: ModelParams, f: impl Fn(f32, f32) -> f32) -> Model {
        let shape = Shape::new_2d(nx, ny).unwrap();
        let height = Field::from_fn(shape, |c| f(c[0] as f32, c[1] as f32));
        Model::from_height(height, params).unwrap()
    }

    fn bowl(n: usize, k: f32) -> Model {
        let c = (n as f32 - 1.0) / 2.0;
        model_from(n, n, |x, y| k * ((x - c).powi(2) + (y - c).powi(2)))
    }

    #[test]
    fn test_erf_matches_reference_values() {
        assert!(erf(0.0).abs() < 1e-6);
        assert!((erf(0.5) - 0.520_499_9).abs() < 1e-5);
        assert!((erf(-1.0) + 0.842_700_8).abs() < 1e-5);
        assert!((erf(3.0) - 0.999_977_9).abs() < 1e-5);
    }

    #[test]
    fn test_flat_field_has_no_descent() {
        let mut model = model_from(8, 8, |_, _| 0.0);
        let mut drop = Drop::new(Vec2::new(3.5, 4.5), DropConfig::default());
        assert!(!drop.move_step(&mut model).unwrap());
        assert_eq!(drop.state(), DropState::Settled);
        assert_eq!(drop.pos(), Vec2::new(3.5, 4.5));
        assert!(!drop.interact(&mut model).unwrap());
    }

    #[test]
    fn test_move_follows_the_slope() {
        let mut model = model_from(8, 8, |x, _| 20.0 - 2.0 * x);
        let mut drop = Drop::new(Vec2::new(1.0, 4.0), DropConfig::default());
        assert!(drop.move_step(&mut model).unwrap());
        assert_eq!(drop.state(), DropState::Moving);
        assert!((drop.pos().x - (1.0 + SQRT_2)).abs() < 1e-4);
        assert!((drop.pos().y - 4.0).abs() < 1e-4);
        assert!((drop.speed().length() - SQRT_2).abs() < 1e-5);
    }

    #[test]
    fn test_move_off_the_edge_exits() {
        let mut model = model_from(4, 4, |x, _| 10.0 * x);
        let mut drop = Drop::new(Vec2::new(0.3, 2.0), DropConfig::default());
        assert!(!drop.move_step(&mut model).unwrap());
        assert_eq!(drop.state(), DropState::Exited);
        assert!(model.shape().oob_pos(&[drop.pos().x, drop.pos().y]));
    }

    #[test]
    fn test_climbing_beyond_maxdiff_is_blocked() {
        let mut model = model_from(8, 8, |x, _| if x < 4.0 { 0.0 } else { 50.0 });
        model.momentum.field_mut().unwrap().fill(Vec2::new(5.0, 0.0));
        let mut drop = Drop::new(Vec2::new(2.9, 4.0), DropConfig::default());
        drop.speed = Vec2::new(SQRT_2, 0.0);
        assert!(!drop.move_step(&mut model).unwrap());
        assert_eq!(drop.state(), DropState::Settled);
        assert_eq!(drop.pos(), Vec2::new(2.9, 4.0));
    }

    #[test]
    fn test_track_accumulates_across_drops() {
        let mut model = model_from(4, 4, |_, _| 0.0);
        let cell = model.shape().flat(&[1, 2]).unwrap();
        let mut a = Drop::new(Vec2::new(1.2, 2.7), DropConfig::default());
        a.speed = Vec2::new(1.0, 0.0);
        let mut b = Drop::new(Vec2::new(1.9, 2.1), DropConfig::default());
        b.speed = Vec2::new(0.0, 1.0);
        b.volume = 0.5;

        a.track(&mut model).unwrap();
        b.track(&mut model).unwrap();

        let discharge = model.discharge_track().get(cell).unwrap();
        let momentum = model.momentum_track().get(cell).unwrap();
        assert!((discharge - 1.5).abs() < 1e-6);
        assert_eq!(momentum, Vec2::new(1.0, 0.5));
        let total: f32 = model.discharge_track().as_field().unwrap().iter().sum();
        assert!((total - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_interact_erodes_the_cell_left_behind() {
        let mut model = model_from(8, 8, |x, _| 20.0 - 0.5 * x);
        let start = model.shape().flat(&[1, 4]).unwrap();
        let before = model.height().get(start).unwrap();

        let mut drop = Drop::new(Vec2::new(1.0, 4.0), DropConfig::default());
        assert!(drop.move_step(&mut model).unwrap());
        assert!(drop.interact(&mut model).unwrap());

        assert_eq!(drop.state(), DropState::Interacting);
        assert!(drop.sediment() > 0.0);
        assert!(model.height().get(start).unwrap() < before);
        assert!(drop.volume() < 1.0);
    }

    #[test]
    fn test_settling_drop_conserves_material() {
        let mut model = bowl(16, 0.5);
        let before = model.total_height().unwrap();

        let mut drop = Drop::new(Vec2::new(2.3, 3.1), DropConfig::default());
        let state = drop.descend(&mut model).unwrap();

        assert_eq!(state, DropState::Settled);
        assert_eq!(drop.sediment(), 0.0);
        let after = model.total_height().unwrap();
        assert!((after - before).abs() < 1e-2, "before {} after {}", before, after);
    }

    #[test]
    fn test_age_limit_settles_the_drop() {
        let mut model = model_from(64, 64, |x, _| 1000.0 - 0.2 * x);
        let config = DropConfig { max_age: 3, ..Default::default() };
        let mut drop = Drop::new(Vec2::new(1.0, 32.0), config);
        let state = drop.descend(&mut model).unwrap();
        assert_eq!(state, DropState::Settled);
        assert_eq!(drop.age(), 3);
    }

    #[test]
    fn test_terminal_drop_does_not_continue() {
        let mut model = model_from(4, 4, |_, _| 0.0);
        let mut drop = Drop::new(Vec2::new(1.0, 1.0), DropConfig::default());
        assert!(!drop.move_step(&mut model).unwrap());
        assert!(!drop.move_step(&mut model).unwrap());
        assert!(!drop.interact(&mut model).unwrap());
        assert_eq!(drop.state(), DropState::Settled);
    }

    #[test]
    fn test_min_volume_settles_the_drop() {
        let mut model = model_from(64, 64, |x, _| 1000.0 - 0.2 * x);
        let config = DropConfig { evap_rate: 0.5, min_volume: 0.3, ..Default::default() };
        let mut drop = Drop::new(Vec2::new(1.0, 32.0), config);

        let state = drop.descend(&mut model).unwrap();

        assert_eq!(state, DropState::Settled);
        assert_eq!(drop.age(), 2);
        assert!((drop.volume() - 0.25).abs() < 1e-6);
        assert_eq!(drop.sediment(), 0.0);
    }

    #[test]
    fn test_resistance_blocks_exchange_and_doubles_evaporation() {
        let params = ModelParams { resistance: 1.0, ..Default::default() };
        let mut model = model_with(8, 8, params, |x, _| 20.0 - 0.5 * x);
        let before = model.snapshot_height().unwrap();

        let mut drop = Drop::new(Vec2::new(1.0, 4.0), DropConfig::default());
        assert!(drop.move_step(&mut model).unwrap());
        assert!(drop.interact(&mut model).unwrap());

        assert_eq!(drop.sediment(), 0.0);
        assert_eq!(model.height_field().unwrap(), &before);
        assert!((drop.volume() - 0.998).abs() < 1e-6);
    }

    #[test]
    fn test_plain_loop_matches_descend() {
        let mut looped = bowl(16, 0.5);
        let mut descended = bowl(16, 0.5);
        let before = looped.total_height().unwrap();

        for i in 0..16 {
            let pos = Vec2::new(1.3 + 0.8 * i as f32, 13.7 - 0.7 * i as f32);

            let mut a = Drop::new(pos, DropConfig::default());
            while a.move_step(&mut looped).unwrap() {
                a.track(&mut looped).unwrap();
                if !a.interact(&mut looped).unwrap() {
                    break;
                }
            }

            let mut b = Drop::new(pos, DropConfig::default());
            let state = b.descend(&mut descended).unwrap();

            assert_eq!(a.state(), state);
            assert_eq!(a.sediment(), 0.0, "drop {} kept its sediment", i);
        }

        assert_eq!(looped.height_field().unwrap(), descended.height_field().unwrap());
        let after = looped.total_height().unwrap();
        assert!((after - before).abs() < 1e-2, "before {} after {}", before, after);
    }
}
