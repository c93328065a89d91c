//! The discontinuity schedule for Step and Event processes.
//!
//! Pending firings are kept in a time-ordered map. Firings that share a time
//! fire in the order they were scheduled, so when two of them write the same
//! variable the later one wins.

use std::collections::{BTreeMap, HashSet};

use ordered_float::OrderedFloat;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::trace;

use weft_core::{
    EventTiming, Handler, InstanceId, Model, Process, ProcessId, ProcessKind, TimeFn, World,
};

use crate::{Error, Issue, invoke::call};

/// One pending (process, instance) occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Firing {
    pub process: ProcessId,
    pub instance: InstanceId,
}

/// A min-ordered queue of pending discontinuities.
#[derive(Debug)]
pub struct Schedule {
    pending: BTreeMap<OrderedFloat<f64>, Vec<Firing>>,
    scheduled: HashSet<Firing>,
    rng: StdRng,
}

enum Timing<'a> {
    Rate(f64),
    Function(&'a TimeFn),
}

impl Schedule {
    /// Creates an empty schedule.
    ///
    /// Rate-based Events draw their waiting times from a generator seeded
    /// with `seed`, or from the operating system if no seed is given.
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            pending: BTreeMap::new(),
            scheduled: HashSet::new(),
            rng,
        }
    }

    /// Time of the earliest pending firing.
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.pending.first_key_value().map(|(time, _)| time.into_inner())
    }

    /// Number of pending firings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Schedules every active (discrete process, instance) pair that has no
    /// pending firing yet.
    ///
    /// Events are scheduled before Steps, each in declaration order. A Step
    /// whose first stepping time equals `now` fires immediately and is then
    /// scheduled for its following time.
    ///
    /// Returns the number of Steps that fired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a rate is not positive or a time
    /// function does not return a time after `now`, and [`Error::Process`] if
    /// an immediately firing Step fails.
    pub fn adopt(&mut self, model: &Model, world: &mut World, now: f64) -> Result<usize, Error> {
        let discrete = model.event_processes().chain(model.step_processes());
        let mut fired = 0;

        for (id, process) in discrete {
            let Some((timing, handler)) = parts(process.kind()) else {
                continue;
            };
            let instances = world.instances(process.class()).to_vec();
            for instance in instances {
                let firing = Firing {
                    process: id,
                    instance,
                };
                if self.scheduled.contains(&firing) {
                    continue;
                }

                let immediate = match timing {
                    Timing::Function(next_time) if is_step(process) => {
                        next_time(world, instance, now) == now
                    }
                    _ => false,
                };
                if immediate {
                    trace!(process = process.name(), %instance, t = now, "step fires at start");
                    call(process, handler, world, instance, now)?;
                    fired += 1;
                }

                let next = self.next_occurrence(process, &timing, world, instance, now)?;
                self.insert(next, firing);
            }
        }
        Ok(fired)
    }

    /// Removes and returns every firing due at `time`, in scheduling order.
    pub fn pop_due(&mut self, time: f64) -> Vec<Firing> {
        let due = self.pending.remove(&OrderedFloat(time)).unwrap_or_default();
        for firing in &due {
            self.scheduled.remove(firing);
        }
        due
    }

    /// Runs a due firing's handler and schedules its next occurrence.
    ///
    /// Firings of instances that are no longer active are dropped; such an
    /// instance is adopted again once it is reactivated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Process`] if the handler fails, and
    /// [`Error::Configuration`] if the next occurrence is invalid.
    pub fn fire(
        &mut self,
        model: &Model,
        world: &mut World,
        firing: Firing,
        time: f64,
    ) -> Result<(), Error> {
        if !world.is_active(firing.instance) {
            trace!(instance = %firing.instance, t = time, "dropping firing of idle instance");
            return Ok(());
        }
        let process = model.process(firing.process);
        let Some((timing, handler)) = parts(process.kind()) else {
            return Ok(());
        };

        trace!(process = process.name(), instance = %firing.instance, t = time, "firing");
        call(process, handler, world, firing.instance, time)?;

        let next = self.next_occurrence(process, &timing, world, firing.instance, time)?;
        self.insert(next, firing);
        Ok(())
    }

    fn insert(&mut self, time: f64, firing: Firing) {
        self.pending.entry(OrderedFloat(time)).or_default().push(firing);
        self.scheduled.insert(firing);
    }

    fn next_occurrence(
        &mut self,
        process: &Process,
        timing: &Timing<'_>,
        world: &World,
        instance: InstanceId,
        now: f64,
    ) -> Result<f64, Error> {
        let invalid = |issue| Error::configuration(process, Some(instance), now, issue);
        match *timing {
            Timing::Rate(rate) => {
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(invalid(Issue::NonPositiveRate(rate)));
                }
                // A waiting time below the float spacing at `now` rounds away.
                let next = now + sample_waiting_time(&mut self.rng, rate);
                Ok(if next > now { next } else { now.next_up() })
            }
            Timing::Function(next_time) => {
                let next = next_time(world, instance, now);
                if next > now {
                    Ok(next)
                } else {
                    Err(invalid(Issue::NotInFuture { next }))
                }
            }
        }
    }
}

fn parts(kind: &ProcessKind) -> Option<(Timing<'_>, &Handler)> {
    match kind {
        ProcessKind::Step { next_time, handler } => Some((Timing::Function(next_time), handler)),
        ProcessKind::Event { timing, handler } => {
            let timing = match timing {
                EventTiming::Rate(rate) => Timing::Rate(*rate),
                EventTiming::Time(time_fn) => Timing::Function(time_fn),
            };
            Some((timing, handler))
        }
        ProcessKind::Explicit(_) | ProcessKind::Ode(_) => None,
    }
}

fn is_step(process: &Process) -> bool {
    matches!(process.kind(), ProcessKind::Step { .. })
}

/// Draws a waiting time from an exponential distribution with mean `1 / rate`.
pub fn sample_waiting_time<R: Rng + ?Sized>(rng: &mut R, rate: f64) -> f64 {
    let u: f64 = rng.random();
    -(1.0 - u).ln() / rate
}
