use crate::Trajectory;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// The run reached its end time.
    Complete,

    /// A termination predicate held at the start of the cycle at `time`.
    Terminated { time: f64 },
}

/// The result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub status: Status,
    pub trajectory: Trajectory,
}
