//! Process declarations.
//!
//! A [`Process`] is owned by one class and is invoked once per active
//! instance of that class. Its [`ProcessKind`] decides how the runner treats
//! it: closed-form recomputation, derivative contribution, or a discrete
//! firing scheduled by a time function or a rate.

use std::fmt;

use crate::{ClassId, EvalContext, InstanceId, LinkId, ModelError, VariableId, World};

/// A vectorized expression evaluated over an ordered slice of instances.
///
/// The result holds one value per instance, in the same order.
pub type Expr = Box<dyn Fn(&EvalContext<'_>, &[InstanceId]) -> Result<Vec<f64>, ModelError>>;

/// A callable invoked once per instance with the current model time.
pub type Handler = Box<dyn Fn(&mut World, InstanceId, f64) -> Result<(), ModelError>>;

/// Returns the next occurrence time for an instance, given the current time.
pub type TimeFn = Box<dyn Fn(&World, InstanceId, f64) -> f64>;

/// Boxes a closure as an [`Expr`].
pub fn expr<F>(f: F) -> Expr
where
    F: Fn(&EvalContext<'_>, &[InstanceId]) -> Result<Vec<f64>, ModelError> + 'static,
{
    Box::new(f)
}

/// The variable a process writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// A variable of the process's owning class.
    Variable(VariableId),

    /// A variable of another class, reached from each owning instance
    /// through `link`.
    ///
    /// Several owning instances may share a linked instance, so evaluated
    /// values are broadcast onto the linked instances rather than aligned
    /// with them.
    Linked { link: LinkId, variable: VariableId },
}

impl Target {
    /// Returns the variable ultimately written by this target.
    #[must_use]
    pub fn variable(&self) -> VariableId {
        match *self {
            Self::Variable(variable) | Self::Linked { variable, .. } => variable,
        }
    }
}

/// How an Explicit or ODE process computes its values.
pub enum ProcessSpec {
    /// One expression per target, in target order.
    Vectorized(Vec<Expr>),

    /// A callable invoked once per owning instance that mutates the world
    /// directly (values for Explicit processes, derivative accumulators for
    /// ODE processes).
    Callable(Handler),
}

impl ProcessSpec {
    /// Creates a [`ProcessSpec::Callable`] from a closure.
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&mut World, InstanceId, f64) -> Result<(), ModelError> + 'static,
    {
        Self::Callable(Box::new(f))
    }
}

impl fmt::Debug for ProcessSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vectorized(exprs) => write!(f, "Vectorized({} exprs)", exprs.len()),
            Self::Callable(_) => f.write_str("Callable"),
        }
    }
}

/// How the occurrence times of an Event are produced.
pub enum EventTiming {
    /// Waiting times drawn from an exponential distribution with this rate.
    Rate(f64),

    /// Occurrence times computed by a deterministic function.
    Time(TimeFn),
}

impl fmt::Debug for EventTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(rate) => write!(f, "Rate({rate})"),
            Self::Time(_) => f.write_str("Time"),
        }
    }
}

/// The four process kinds the runner interleaves.
pub enum ProcessKind {
    Explicit(ProcessSpec),
    Ode(ProcessSpec),
    Step { next_time: TimeFn, handler: Handler },
    Event { timing: EventTiming, handler: Handler },
}

impl fmt::Debug for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(spec) => f.debug_tuple("Explicit").field(spec).finish(),
            Self::Ode(spec) => f.debug_tuple("Ode").field(spec).finish(),
            Self::Step { .. } => f.write_str("Step"),
            Self::Event { timing, .. } => f.debug_struct("Event").field("timing", timing).finish(),
        }
    }
}

/// A named process owned by a class.
#[derive(Debug)]
pub struct Process {
    name: String,
    class: ClassId,
    targets: Vec<Target>,
    kind: ProcessKind,
}

impl Process {
    /// Creates a process from its parts.
    pub fn new(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        kind: ProcessKind,
    ) -> Self {
        Self {
            name: name.into(),
            class,
            targets: targets.into_iter().collect(),
            kind,
        }
    }

    /// Creates an Explicit process.
    pub fn explicit(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        spec: ProcessSpec,
    ) -> Self {
        Self::new(name, class, targets, ProcessKind::Explicit(spec))
    }

    /// Creates an ODE process.
    pub fn ode(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        spec: ProcessSpec,
    ) -> Self {
        Self::new(name, class, targets, ProcessKind::Ode(spec))
    }

    /// Creates a Step process.
    ///
    /// `next_time` is asked for the next stepping time after each firing.
    pub fn step<T, H>(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        next_time: T,
        handler: H,
    ) -> Self
    where
        T: Fn(&World, InstanceId, f64) -> f64 + 'static,
        H: Fn(&mut World, InstanceId, f64) -> Result<(), ModelError> + 'static,
    {
        let kind = ProcessKind::Step {
            next_time: Box::new(next_time),
            handler: Box::new(handler),
        };
        Self::new(name, class, targets, kind)
    }

    /// Creates an Event whose waiting times are exponentially distributed.
    pub fn rate_event<H>(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        rate: f64,
        handler: H,
    ) -> Self
    where
        H: Fn(&mut World, InstanceId, f64) -> Result<(), ModelError> + 'static,
    {
        let kind = ProcessKind::Event {
            timing: EventTiming::Rate(rate),
            handler: Box::new(handler),
        };
        Self::new(name, class, targets, kind)
    }

    /// Creates an Event whose occurrence times come from a time function.
    pub fn timed_event<T, H>(
        name: impl Into<String>,
        class: ClassId,
        targets: impl IntoIterator<Item = Target>,
        time_fn: T,
        handler: H,
    ) -> Self
    where
        T: Fn(&World, InstanceId, f64) -> f64 + 'static,
        H: Fn(&mut World, InstanceId, f64) -> Result<(), ModelError> + 'static,
    {
        let kind = ProcessKind::Event {
            timing: EventTiming::Time(Box::new(time_fn)),
            handler: Box::new(handler),
        };
        Self::new(name, class, targets, kind)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the class whose instances this process is invoked for.
    #[must_use]
    pub fn class(&self) -> ClassId {
        self.class
    }

    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    #[must_use]
    pub fn kind(&self) -> &ProcessKind {
        &self.kind
    }
}
