//! Hybrid scheduling and integration for process-based models.
//!
//! A [`Runner`] advances a [`World`](weft_core::World) through time by
//! interleaving four kinds of processes:
//!
//! - Explicit processes recompute closed-form targets after every state change
//! - ODE processes contribute derivatives that are integrated between
//!   discontinuities
//! - Step processes fire at times returned by their time function
//! - Event processes fire at deterministic times or at exponentially
//!   distributed waiting times
//!
//! Every accepted integrator step and every discontinuity is recorded into a
//! [`Trajectory`].

mod config;
mod derivative;
mod error;
mod explicit;
mod hooks;
mod integrate;
mod invoke;
mod layout;
mod runner;
mod schedule;
mod solution;
mod termination;
mod trajectory;

pub use config::{Config, ConfigError};
pub use derivative::DerivativeEvaluator;
pub use error::{Error, Failure, Issue};
pub use explicit::apply_explicits;
pub use hooks::{Hook, HookStage, Hooks};
pub use layout::{Layout, Slice};
pub use runner::Runner;
pub use schedule::{Firing, Schedule, sample_waiting_time};
pub use solution::{Solution, Status};
pub use termination::{Predicate, Termination};
pub use trajectory::{Series, Trajectory};
