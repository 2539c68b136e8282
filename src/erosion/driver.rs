//! Per-step simulation driver.

use std::time::{Duration, Instant};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::drop::{Drop, DropState};
use super::{ErosionConfig, ErosionError};
use crate::terrain::Model;

/// Outcome of one simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Zero-based step index.
    pub step: usize,
    /// Fraction of this step's drops that left the grid.
    pub exit_fraction: f32,
    /// Number of drops that left the grid.
    pub exited: usize,
    /// Number of drops spawned.
    pub particles: usize,
    /// Wall time spent on the step.
    pub elapsed: Duration,
}

/// Runs batches of drops over a model it exclusively borrows.
///
/// Particles within a step are processed sequentially, so height updates from one drop
/// are visible to the next. Iterating yields one [`StepReport`] per step until the step
/// budget is spent, the optional exit-fraction threshold is reached, or a step fails.
pub struct Simulation<'m, R = ChaCha8Rng> {
    model: &'m mut Model,
    config: ErosionConfig,
    rng: R,
    step: usize,
    stopped: bool,
}

impl<'m> Simulation<'m, ChaCha8Rng> {
    /// Creates a driver whose spawn positions are seeded from `config.seed`.
    pub fn new(model: &'m mut Model, config: ErosionConfig) -> Result<Self, ErosionError> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(model, config, rng)
    }
}

impl<'m, R: Rng> Simulation<'m, R> {
    /// Creates a driver drawing spawn positions from `rng`.
    pub fn with_rng(model: &'m mut Model, config: ErosionConfig, rng: R) -> Result<Self, ErosionError> {
        config.validate()?;
        Ok(Self {
            model,
            config,
            rng,
            step: 0,
            stopped: false,
        })
    }

    /// Read-only view of the model between steps.
    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    /// Number of steps completed so far.
    pub fn steps_done(&self) -> usize {
        self.step
    }

    /// Runs one step: clear tracks, descend every drop, count exits, fold tracks.
    pub fn step(&mut self) -> Result<StepReport, ErosionError> {
        let start = Instant::now();
        let particles = self.config.particles;
        let nx = self.model.shape().extent(0) as f32;
        let ny = self.model.shape().extent(1) as f32;

        self.model.clear_tracks()?;

        let mut exited = 0;
        let mut settled = 0;
        for _ in 0..particles {
            let pos = Vec2::new(self.rng.gen::<f32>() * nx, self.rng.gen::<f32>() * ny);
            let mut drop = Drop::new(pos, self.config.drop);
            let state = drop.descend(self.model)?;

            let end = drop.pos();
            if self.model.shape().oob_pos(&[end.x, end.y]) {
                exited += 1;
            } else if state == DropState::Settled {
                settled += 1;
            }
        }

        self.model.fold_tracks(self.config.learning_rate)?;

        let report = StepReport {
            step: self.step,
            exit_fraction: exited as f32 / particles as f32,
            exited,
            particles,
            elapsed: start.elapsed(),
        };
        log::trace!("Step {}: {} exited, {} settled", report.step, exited, settled);
        log::debug!(
            "Step {} exit fraction {:.3} in {:?}",
            report.step,
            report.exit_fraction,
            report.elapsed
        );

        self.step += 1;
        Ok(report)
    }

    /// Runs all remaining steps, calling `on_step` with each report and the updated model.
    ///
    /// Returns the collected reports. The first failing step aborts the run.
    pub fn run_with_callback<F>(&mut self, mut on_step: F) -> Result<Vec<StepReport>, ErosionError>
    where
        F: FnMut(&StepReport, &Model),
    {
        let mut reports = Vec::new();
        while let Some(result) = self.next() {
            let report = result?;
            on_step(&report, self.model);
            reports.push(report);
        }
        Ok(reports)
    }

    fn reached_threshold(&self, report: &StepReport) -> bool {
        self.config
            .stop_at_exit_fraction
            .is_some_and(|threshold| report.exit_fraction >= threshold)
    }
}

impl<R: Rng> Iterator for Simulation<'_, R> {
    type Item = Result<StepReport, ErosionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped || self.step >= self.config.steps {
            return None;
        }
        match self.step() {
            Ok(report) => {
                if self.reached_threshold(&report) {
                    log::info!(
                        "Exit fraction {:.3} reached threshold after {} steps",
                        report.exit_fraction,
                        report.step + 1
                    );
                    self.stopped = true;
                }
                Some(Ok(report))
            }
            Err(e) => {
                self.stopped = true;
                Some(Err(e))
            }
        }
    }
}

/// Runs `steps` steps of `particles` drops with default drop physics.
///
/// The returned iterator is lazy: each item runs one step and yields its
/// `(step_index, exit_fraction)`. The model is readable again once it is dropped.
pub fn run(
    model: &mut Model,
    steps: usize,
    particles: usize,
    rate: f32,
) -> Result<impl Iterator<Item = Result<(usize, f32), ErosionError>> + '_, ErosionError> {
    let config = ErosionConfig {
        steps,
        particles,
        learning_rate: rate,
        ..Default::default()
    };
    let simulation = Simulation::new(model, config)?;
    Ok(simulation.map(|report| report.map(|r| (r.step, r.exit_fraction))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erosion::ConfigError;
    use crate::field::Field;
    use crate::geometry::Shape;
    use crate::terrain::ModelParams;

    fn ramp(n: usize) -> Model {
        let shape = Shape::new_2d(n, n).unwrap();
        let height = Field::from_fn(shape, |c| 2.0 * (n - 1 - c[0]) as f32);
        Model::from_height(height, ModelParams::default()).unwrap()
    }

    fn config(steps: usize, particles: usize) -> ErosionConfig {
        ErosionConfig {
            steps,
            particles,
            ..Default::default()
        }
    }

    #[test]
    fn test_runs_exactly_the_configured_steps() {
        let mut model = ramp(16);
        let sim = Simulation::new(&mut model, config(5, 32)).unwrap();
        let reports: Vec<StepReport> = sim.map(|r| r.unwrap()).collect();

        assert_eq!(reports.len(), 5);
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.step, i);
            assert_eq!(report.particles, 32);
            assert!((0.0..=1.0).contains(&report.exit_fraction));
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut model = ramp(8);
        let err = Simulation::new(&mut model, config(4, 0)).err().unwrap();
        assert!(matches!(err, ErosionError::Config(ConfigError::ZeroParticles)));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let mut a = ramp(16);
        let mut b = ramp(16);
        let fa: Vec<(usize, f32)> = run(&mut a, 3, 64, 0.1).unwrap().collect::<Result<_, _>>().unwrap();
        let fb: Vec<(usize, f32)> = run(&mut b, 3, 64, 0.1).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(fa, fb);
        assert_eq!(a.height_field().unwrap(), b.height_field().unwrap());
    }

    #[test]
    fn test_discharge_accumulates_on_a_ramp() {
        let mut model = ramp(16);
        let mut sim = Simulation::new(&mut model, config(2, 64)).unwrap();
        sim.step().unwrap();

        let discharge = sim.model().discharge_field().unwrap();
        assert!(discharge.iter().any(|&d| d > 0.0));
        assert!(discharge.iter().all(|&d| d >= 0.0));
        assert_eq!(sim.steps_done(), 1);
    }

    #[test]
    fn test_early_stop_at_threshold() {
        let mut model = ramp(16);
        let cfg = ErosionConfig {
            stop_at_exit_fraction: Some(0.0),
            ..config(10, 16)
        };
        let sim = Simulation::new(&mut model, cfg).unwrap();
        assert_eq!(sim.count(), 1);
    }

    #[test]
    fn test_run_with_callback_sees_every_step() {
        let mut model = ramp(12);
        let mut seen = Vec::new();
        let reports = Simulation::with_rng(&mut model, config(4, 16), ChaCha8Rng::seed_from_u64(7))
            .unwrap()
            .run_with_callback(|report, model| {
                assert_eq!(model.shape().extents(), &[12, 12]);
                seen.push(report.step);
            })
            .unwrap();

        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(reports.len(), 4);
    }

    #[test]
    fn test_flat_field_is_untouched() {
        let shape = Shape::new_2d(16, 16).unwrap();
        let mut model = Model::new(shape, ModelParams::default()).unwrap();
        let fractions: Vec<(usize, f32)> = run(&mut model, 2, 32, 0.1).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(fractions, vec![(0, 0.0), (1, 0.0)]);
        assert!(model.height_field().unwrap().iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_run_is_lazy_and_indexed() {
        let mut model = ramp(12);
        let first: Vec<(usize, f32)> = run(&mut model, 10, 16, 0.1)
            .unwrap()
            .take(2)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(first.iter().map(|&(step, _)| step).collect::<Vec<_>>(), vec![0, 1]);
        assert!(first.iter().all(|&(_, f)| (0.0..=1.0).contains(&f)));
        assert!(model.discharge_field().unwrap().iter().any(|&d| d > 0.0));
    }
}
