//! Recorded time series.

use std::collections::BTreeMap;

use serde::Serialize;

use weft_core::{InstanceId, Model, VariableId, World};

/// Per-instance samples of one variable, aligned with [`Trajectory::times`].
///
/// `None` marks times at which the instance did not exist yet or was idle.
pub type Series = Vec<Option<f64>>;

/// The recorded output of a run.
///
/// Times are strictly increasing and every series has exactly one sample per
/// recorded time. It serializes as `{"t": [...], <variable>: {<instance>: [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    t: Vec<f64>,
    #[serde(flatten)]
    series: BTreeMap<VariableId, BTreeMap<InstanceId, Series>>,
}

impl Trajectory {
    /// Creates an empty trajectory that records `variables`.
    #[must_use]
    pub fn new(variables: &[VariableId]) -> Self {
        Self {
            t: Vec::new(),
            series: variables.iter().map(|&v| (v, BTreeMap::new())).collect(),
        }
    }

    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.t
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    #[must_use]
    pub fn last_time(&self) -> Option<f64> {
        self.t.last().copied()
    }

    /// Iterates over the recorded variables.
    pub fn variables(&self) -> impl Iterator<Item = VariableId> + '_ {
        self.series.keys().copied()
    }

    /// Returns every instance series recorded for `variable`.
    #[must_use]
    pub fn variable(&self, variable: VariableId) -> Option<&BTreeMap<InstanceId, Series>> {
        self.series.get(&variable)
    }

    /// Returns the series of one instance.
    #[must_use]
    pub fn series(&self, variable: VariableId, instance: InstanceId) -> Option<&[Option<f64>]> {
        self.series
            .get(&variable)
            .and_then(|by_instance| by_instance.get(&instance))
            .map(Vec::as_slice)
    }

    /// Samples every recorded variable at `time`.
    ///
    /// Active instances record their current value; idle instances record
    /// `None`. An instance seen for the first time is back-filled with `None`.
    /// Recording again at the last recorded time replaces that sample, so a
    /// discontinuity at the end of a smooth interval leaves only the
    /// post-firing values.
    ///
    /// # Panics
    ///
    /// Panics if `time` is earlier than the last recorded time.
    pub fn record(&mut self, model: &Model, world: &World, time: f64) {
        if let Some(last) = self.last_time() {
            assert!(time >= last, "recorded time {time} precedes {last}");
        }
        if self.last_time() != Some(time) {
            self.t.push(time);
        }
        let len = self.t.len();

        for (&variable, by_instance) in &mut self.series {
            let class = model.variable(variable).class;
            for &instance in world.instances(class) {
                let sample = Some(world.value(variable, instance));
                put(by_instance.entry(instance).or_default(), len, sample);
            }
            for &instance in world.idle_instances(class) {
                put(by_instance.entry(instance).or_default(), len, None);
            }
        }
    }
}

fn put(series: &mut Series, len: usize, sample: Option<f64>) {
    if series.len() == len {
        series[len - 1] = sample;
    } else {
        series.resize(len - 1, None);
        series.push(sample);
    }
}
