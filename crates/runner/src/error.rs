use ode_solvers::dop_shared::IntegrationError;
use thiserror::Error;

use weft_core::{InstanceId, ModelError, Process};

use crate::{HookStage, Trajectory};

/// The specific way a process definition is unusable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Issue {
    #[error("event rate must be finite and positive, got {0}")]
    NonPositiveRate(f64),

    #[error("next occurrence {next} is not after the current time")]
    NotInFuture { next: f64 },

    #[error("expected one expression per target ({expected}), got {found}")]
    ExpressionCount { expected: usize, found: usize },

    #[error("expression for target {target} produced {found} values for {expected} instances")]
    ValueCount {
        target: usize,
        expected: usize,
        found: usize,
    },
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid run interval [{t0}, {t1}]")]
    InvalidInterval { t0: f64, t1: f64 },

    #[error("max_step must be positive, got {0}")]
    InvalidMaxStep(f64),

    #[error("process `{process}`{} at t = {time}: {issue}", on(.instance))]
    Configuration {
        process: String,
        instance: Option<InstanceId>,
        time: f64,
        issue: Issue,
    },

    #[error("process `{process}`{} failed at t = {time}: {source}", on(.instance))]
    Process {
        process: String,
        instance: Option<InstanceId>,
        time: f64,
        source: ModelError,
    },

    #[error("{stage} hook failed at t = {time}: {source}")]
    Hook {
        stage: HookStage,
        time: f64,
        source: ModelError,
    },

    #[error("state vector does not match the array layout: {0}")]
    Layout(#[source] ModelError),

    #[error("integration failed on [{from}, {to}]: {source}")]
    Integration {
        from: f64,
        to: f64,
        source: IntegrationError,
    },
}

impl Error {
    pub(crate) fn configuration(
        process: &Process,
        instance: Option<InstanceId>,
        time: f64,
        issue: Issue,
    ) -> Self {
        Self::Configuration {
            process: process.name().to_owned(),
            instance,
            time,
            issue,
        }
    }

    pub(crate) fn process(
        process: &Process,
        instance: Option<InstanceId>,
        time: f64,
        source: ModelError,
    ) -> Self {
        Self::Process {
            process: process.name().to_owned(),
            instance,
            time,
            source,
        }
    }
}

fn on(instance: &Option<InstanceId>) -> String {
    instance.map_or_else(String::new, |i| format!(" on {i}"))
}

/// A run that ended in an error, with everything recorded before it.
#[derive(Debug, Error)]
#[error("run aborted at t = {time}")]
pub struct Failure {
    #[source]
    pub error: Error,

    /// Model time when the run aborted.
    pub time: f64,

    /// Trajectory recorded up to the failure.
    pub trajectory: Trajectory,
}
