//! The main loop.

use tracing::{debug, info, warn};

use weft_core::{Generation, Model, World};

use crate::{
    Config, DerivativeEvaluator, Error, Failure, HookStage, Hooks, Layout, Schedule, Solution,
    Status, Termination, Trajectory, apply_explicits, integrate::integrate,
};

/// Drives a model's world forward in time.
///
/// A run alternates smooth intervals, integrated by the adaptive
/// Dormand–Prince scheme from `ode_solvers`, with discontinuities at which due Step and Event
/// firings are applied. Explicit targets are recomputed after every state
/// change, and the tracked variables are recorded at every accepted
/// integrator step and every discontinuity.
pub struct Runner<'m> {
    model: &'m Model,
    world: World,
    config: Config,
    termination: Termination,
    hooks: Hooks,
    generation: Generation,
}

impl<'m> Runner<'m> {
    #[must_use]
    pub fn new(model: &'m Model, world: World, config: Config) -> Self {
        Self {
            model,
            world,
            config,
            termination: Termination::default(),
            hooks: Hooks::default(),
            generation: Generation::default(),
        }
    }

    #[must_use]
    pub fn with_termination(self, termination: Termination) -> Self {
        Self {
            termination,
            ..self
        }
    }

    #[must_use]
    pub fn with_hooks(self, hooks: Hooks) -> Self {
        Self { hooks, ..self }
    }

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn into_world(self) -> World {
        self.world
    }

    /// Returns the generation of the most recent evaluation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns `true` if any termination predicate holds for its subject.
    #[must_use]
    pub fn terminate(&self) -> bool {
        self.termination.should_stop(&self.world)
    }

    /// Runs the model from `t0` to `t1`.
    ///
    /// No integrator step is longer than `max_step`, and no smooth interval
    /// crosses a pending discontinuity.
    ///
    /// # Errors
    ///
    /// Returns a [`Failure`] holding the error and everything recorded before
    /// it if the arguments are invalid, a process is misconfigured or fails,
    /// a hook fails, or the integrator gives up on an interval.
    pub fn run(&mut self, t0: f64, t1: f64, max_step: f64) -> Result<Solution, Failure> {
        let mut trajectory = Trajectory::new(self.model.tracked_variables());
        let mut t = t0;

        info!(t0, t1, max_step, "starting run");
        match self.drive(&mut trajectory, &mut t, t1, max_step) {
            Ok(status) => {
                info!(?status, samples = trajectory.len(), "run finished");
                Ok(Solution { status, trajectory })
            }
            Err(error) => {
                warn!(t, %error, "run aborted");
                Err(Failure {
                    error,
                    time: t,
                    trajectory,
                })
            }
        }
    }

    fn drive(
        &mut self,
        trajectory: &mut Trajectory,
        t: &mut f64,
        t1: f64,
        max_step: f64,
    ) -> Result<Status, Error> {
        let t0 = *t;
        if !(t0.is_finite() && t1.is_finite() && t1 >= t0) {
            return Err(Error::InvalidInterval { t0, t1 });
        }
        if max_step.is_nan() || max_step <= 0.0 {
            return Err(Error::InvalidMaxStep(max_step));
        }
        let mut schedule = Schedule::new(self.config.seed());

        self.apply_explicits(t0)?;
        self.hooks.run(HookStage::Pre, &mut self.world, t0)?;
        if schedule.adopt(self.model, &mut self.world, t0)? > 0 {
            self.apply_explicits(t0)?;
        }
        trajectory.record(self.model, &self.world, t0);

        let mut status = Status::Complete;
        while *t < t1 {
            if self.terminate() {
                info!(t = *t, "termination condition met");
                status = Status::Terminated { time: *t };
                break;
            }

            let discontinuity = schedule.next_time();
            let horizon = discontinuity.map_or(t1, |d| d.min(t1));
            let integrated = self.model.has_ode_processes()
                && self.integrate(trajectory, *t, horizon, max_step)?;
            *t = horizon;

            if discontinuity == Some(horizon) {
                let due = schedule.pop_due(horizon);
                debug!(t = horizon, count = due.len(), "applying discontinuities");
                for firing in due {
                    schedule.fire(self.model, &mut self.world, firing, horizon)?;
                }
                schedule.adopt(self.model, &mut self.world, horizon)?;
                self.apply_explicits(horizon)?;
                trajectory.record(self.model, &self.world, horizon);
            } else if !integrated {
                self.apply_explicits(horizon)?;
                trajectory.record(self.model, &self.world, horizon);
            }

            self.hooks.run(HookStage::Mid, &mut self.world, *t)?;
        }

        self.hooks.run(HookStage::Post, &mut self.world, *t)?;
        Ok(status)
    }

    /// Integrates the ODE-governed state over `[from, to]`, recording every
    /// accepted step.
    ///
    /// Returns `false` without integrating if no active instance carries
    /// ODE-governed state, or if the interval is too short for a step to
    /// advance time at `from`.
    fn integrate(
        &mut self,
        trajectory: &mut Trajectory,
        from: f64,
        to: f64,
        max_step: f64,
    ) -> Result<bool, Error> {
        let layout = Layout::build(self.model, &self.world);
        if layout.is_empty() || to - from <= 10.0 * f64::EPSILON * from.abs() {
            return Ok(false);
        }
        debug!(from, to, len = layout.len(), "integrating smooth interval");

        let mut rhs = DerivativeEvaluator::new(self.model, &mut self.world, &layout, self.generation);
        let result = integrate(
            self.model,
            &mut rhs,
            trajectory,
            &self.config,
            from,
            to,
            max_step,
        );
        self.generation = rhs.generation();

        let stats = result?;
        debug!(
            evaluations = stats.num_eval,
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            "interval integrated"
        );
        Ok(true)
    }

    fn apply_explicits(&mut self, time: f64) -> Result<(), Error> {
        self.generation = self.generation.next();
        apply_explicits(self.model, &mut self.world, time, self.generation)
    }
}
