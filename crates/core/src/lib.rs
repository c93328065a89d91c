//! Core traits and types for Weft.
//!
//! This crate defines the abstractions the runner builds on:
//!
//! - [`Model`] — the validated registry of classes, variables, links, and
//!   processes, declared through a [`ModelBuilder`]
//! - [`World`] — the mutable store of instances, values, derivative
//!   accumulators, and links
//! - [`Process`] — an Explicit, ODE, Step, or Event process with its
//!   [`ProcessSpec`]
//! - [`EvalContext`], [`Generation`], [`Memo`] — per-evaluation context for
//!   vectorized expressions
//! - [`OdeSystem`] — a right-hand side for ODE integrators

mod error;
mod eval;
mod ids;
mod model;
mod process;
mod problems;
mod world;

pub use error::ModelError;
pub use eval::{EvalContext, Generation, Memo};
pub use ids::{ClassId, InstanceId, LinkId, ProcessId, VariableId};
pub use model::{Class, ClassKind, Link, Model, ModelBuilder, Variable};
pub use problems::OdeSystem;
pub use process::{
    EventTiming, Expr, Handler, Process, ProcessKind, ProcessSpec, Target, TimeFn, expr,
};
pub use world::World;
