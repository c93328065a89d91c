//! Integration of one smooth interval with `ode_solvers`.
//!
//! The solver owns its system, and [`System::system`] takes `&self`, so the
//! evaluator and everything the interval writes live behind a shared
//! [`RefCell`]. An evaluator error is stored there and the derivative is set
//! to NaN, which makes the solver reject steps until it gives up. The stored
//! error then takes precedence over the solver's own failure.

use std::cell::RefCell;

use ode_solvers::{
    DVector, Dopri5, System,
    dop_shared::{OutputType, Stats},
};
use tracing::trace;

use weft_core::{Model, OdeSystem};

use crate::{Config, DerivativeEvaluator, Error, Trajectory};

// Step-size control used by `Dopri5::new`.
const SAFETY_FACTOR: f64 = 0.9;
const BETA: f64 = 0.04;
const FAC_MIN: f64 = 0.2;
const FAC_MAX: f64 = 10.0;
const STIFFNESS_CHECK: u32 = 1000;

/// Everything an interval reads and writes while the solver runs.
struct Interval<'a, 'w> {
    rhs: &'a mut DerivativeEvaluator<'w>,
    trajectory: &'a mut Trajectory,
    failure: Option<Error>,
    last: Option<(f64, Vec<f64>)>,
}

struct Stepper<'s, 'a, 'w> {
    model: &'a Model,
    to: f64,
    interval: &'s RefCell<Interval<'a, 'w>>,
}

impl System<f64, DVector<f64>> for Stepper<'_, '_, '_> {
    fn system(&self, t: f64, y: &DVector<f64>, dy: &mut DVector<f64>) {
        let mut interval = self.interval.borrow_mut();
        if interval.failure.is_some() {
            dy.fill(f64::NAN);
            return;
        }
        if let Err(error) = interval.rhs.derivative(t, y.as_slice(), dy.as_mut_slice()) {
            dy.fill(f64::NAN);
            interval.failure = Some(error);
        }
    }

    fn solout(&mut self, t: f64, y: &DVector<f64>, _dy: &DVector<f64>) -> bool {
        let t = snap(t, self.to);
        let mut interval = self.interval.borrow_mut();
        let Interval {
            rhs,
            trajectory,
            failure,
            last,
        } = &mut *interval;
        if failure.is_some() {
            return true;
        }

        trace!(t, "accepted step");
        match rhs.settle(t, y.as_slice()) {
            Ok(()) => {
                trajectory.record(self.model, rhs.world(), t);
                *last = Some((t, y.as_slice().to_vec()));
                false
            }
            Err(error) => {
                *failure = Some(error);
                true
            }
        }
    }
}

/// Integrates `rhs` from `from` to `to`, recording every accepted step.
///
/// On success the world holds the state at `to` with Explicit targets
/// recomputed. Steps accepted before a failure stay recorded.
///
/// # Errors
///
/// Returns the first error raised while evaluating or settling the state,
/// otherwise [`Error::Integration`] if the solver gives up.
pub(crate) fn integrate(
    model: &Model,
    rhs: &mut DerivativeEvaluator<'_>,
    trajectory: &mut Trajectory,
    config: &Config,
    from: f64,
    to: f64,
    max_step: f64,
) -> Result<Stats, Error> {
    let y0 = DVector::from_vec(rhs.state());
    let interval = RefCell::new(Interval {
        rhs,
        trajectory,
        failure: None,
        last: None,
    });
    let stepper = Stepper {
        model,
        to,
        interval: &interval,
    };

    let span = to - from;
    let mut solver = Dopri5::from_param(
        stepper,
        from,
        to,
        span,
        y0,
        config.rel_tol(),
        config.abs_tol(),
        SAFETY_FACTOR,
        BETA,
        FAC_MIN,
        FAC_MAX,
        max_step.min(span),
        0.0,
        config.max_steps(),
        STIFFNESS_CHECK,
        OutputType::Dense,
    );
    let result = solver.integrate();
    drop(solver);

    let Interval {
        rhs, failure, last, ..
    } = interval.into_inner();
    if let Some(error) = failure {
        return Err(error);
    }
    let stats = result.map_err(|source| Error::Integration { from, to, source })?;

    // The solver may evaluate past the last accepted point.
    if let Some((t, y)) = last {
        rhs.settle(t, &y)?;
    }
    Ok(stats)
}

/// Maps the solver's final time onto the interval end it was aiming for.
fn snap(t: f64, to: f64) -> f64 {
    if (to - t).abs() <= 4.0 * f64::EPSILON * to.abs().max(1.0) {
        to
    } else {
        t.min(to)
    }
}
