//! The instance and attribute store.
//!
//! A [`World`] owns every runtime instance of a [`Model`], the per-class
//! rosters of active and idle instances, variable values, derivative
//! accumulators, and links. Instance order within a roster is stable: spawned
//! and reactivated instances are appended, and removal preserves the relative
//! order of the remaining instances.

use std::collections::HashMap;

use crate::{ClassId, ClassKind, InstanceId, LinkId, Model, ModelError, VariableId};

#[derive(Debug, Clone, Default)]
struct Roster {
    active: Vec<InstanceId>,
    idle: Vec<InstanceId>,
}

/// Mutable instance state for one model.
///
/// Methods taking a [`VariableId`] or [`LinkId`] panic if the id was issued by
/// a different model than the one this world was created for.
#[derive(Debug, Clone)]
pub struct World {
    class_kinds: Vec<ClassKind>,
    rosters: Vec<Roster>,
    instance_classes: Vec<ClassId>,
    defaults: Vec<f64>,
    values: Vec<HashMap<InstanceId, f64>>,
    derivatives: Vec<HashMap<InstanceId, f64>>,
    links: Vec<HashMap<InstanceId, InstanceId>>,
}

impl World {
    /// Creates an empty world sized for `model`.
    #[must_use]
    pub fn new(model: &Model) -> Self {
        let variable_count = model.variables().len();
        Self {
            class_kinds: model.classes().iter().map(|c| c.kind).collect(),
            rosters: vec![Roster::default(); model.classes().len()],
            instance_classes: Vec::new(),
            defaults: model.variables().iter().map(|v| v.default).collect(),
            values: vec![HashMap::new(); variable_count],
            derivatives: vec![HashMap::new(); variable_count],
            links: vec![HashMap::new(); model.links().len()],
        }
    }

    /// Creates a new active instance of `class`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownClass`] if the class is not declared.
    pub fn spawn(&mut self, class: ClassId) -> Result<InstanceId, ModelError> {
        let roster = self
            .rosters
            .get_mut(class.index())
            .ok_or(ModelError::UnknownClass(class))?;
        let id = InstanceId::new(self.instance_classes.len());
        self.instance_classes.push(class);
        roster.active.push(id);
        Ok(id)
    }

    /// Returns the class an instance belongs to.
    #[must_use]
    pub fn class_of(&self, instance: InstanceId) -> Option<ClassId> {
        self.instance_classes.get(instance.index()).copied()
    }

    /// Returns the active instances of `class` in roster order.
    #[must_use]
    pub fn instances(&self, class: ClassId) -> &[InstanceId] {
        self.rosters
            .get(class.index())
            .map(|roster| roster.active.as_slice())
            .unwrap_or_default()
    }

    /// Returns the idle (deactivated) instances of `class` in roster order.
    #[must_use]
    pub fn idle_instances(&self, class: ClassId) -> &[InstanceId] {
        self.rosters
            .get(class.index())
            .map(|roster| roster.idle.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_active(&self, instance: InstanceId) -> bool {
        self.class_of(instance)
            .is_some_and(|class| self.instances(class).contains(&instance))
    }

    /// Moves an entity from the active to the idle roster.
    ///
    /// Deactivating an already idle entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is unknown or belongs to a process
    /// taxon.
    pub fn deactivate(&mut self, instance: InstanceId) -> Result<(), ModelError> {
        let class = self.entity_class_of(instance)?;
        let roster = &mut self.rosters[class.index()];
        if let Some(pos) = roster.active.iter().position(|&i| i == instance) {
            roster.active.remove(pos);
            roster.idle.push(instance);
        }
        Ok(())
    }

    /// Moves an entity from the idle back to the active roster.
    ///
    /// Activating an already active entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance is unknown or belongs to a process
    /// taxon.
    pub fn activate(&mut self, instance: InstanceId) -> Result<(), ModelError> {
        let class = self.entity_class_of(instance)?;
        let roster = &mut self.rosters[class.index()];
        if let Some(pos) = roster.idle.iter().position(|&i| i == instance) {
            roster.idle.remove(pos);
            roster.active.push(instance);
        }
        Ok(())
    }

    fn entity_class_of(&self, instance: InstanceId) -> Result<ClassId, ModelError> {
        let class = self
            .class_of(instance)
            .ok_or(ModelError::UnknownInstance(instance))?;
        match self.class_kinds[class.index()] {
            ClassKind::Entity => Ok(class),
            ClassKind::Taxon => Err(ModelError::TaxonDeactivation(instance)),
        }
    }

    /// Returns the value of `variable` for `instance`, or the variable's
    /// default if it was never written.
    #[must_use]
    pub fn value(&self, variable: VariableId, instance: InstanceId) -> f64 {
        self.values[variable.index()]
            .get(&instance)
            .copied()
            .unwrap_or(self.defaults[variable.index()])
    }

    /// Returns the values of `variable` for `instances`, in the same order.
    #[must_use]
    pub fn values(&self, variable: VariableId, instances: &[InstanceId]) -> Vec<f64> {
        instances.iter().map(|&i| self.value(variable, i)).collect()
    }

    pub fn set_value(&mut self, variable: VariableId, instance: InstanceId, value: f64) {
        self.values[variable.index()].insert(instance, value);
    }

    /// Writes one value per instance.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if the slices differ in length;
    /// nothing is written in that case.
    pub fn set_values(
        &mut self,
        variable: VariableId,
        instances: &[InstanceId],
        values: &[f64],
    ) -> Result<(), ModelError> {
        check_lengths(instances, values)?;
        let store = &mut self.values[variable.index()];
        for (&instance, &value) in instances.iter().zip(values) {
            store.insert(instance, value);
        }
        Ok(())
    }

    /// Resets the derivative accumulator of `variable` for every instance.
    pub fn clear_derivatives(&mut self, variable: VariableId) {
        self.derivatives[variable.index()].clear();
    }

    /// Adds a term to the derivative accumulator of one instance.
    pub fn add_derivative(&mut self, variable: VariableId, instance: InstanceId, term: f64) {
        *self.derivatives[variable.index()]
            .entry(instance)
            .or_insert(0.0) += term;
    }

    /// Adds one term per instance to the derivative accumulators.
    ///
    /// An instance may appear several times; its terms are summed.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if the slices differ in length;
    /// nothing is added in that case.
    pub fn add_derivatives(
        &mut self,
        variable: VariableId,
        instances: &[InstanceId],
        terms: &[f64],
    ) -> Result<(), ModelError> {
        check_lengths(instances, terms)?;
        for (&instance, &term) in instances.iter().zip(terms) {
            self.add_derivative(variable, instance, term);
        }
        Ok(())
    }

    /// Returns the accumulated derivative of `variable` for `instance`.
    #[must_use]
    pub fn derivative(&self, variable: VariableId, instance: InstanceId) -> f64 {
        self.derivatives[variable.index()]
            .get(&instance)
            .copied()
            .unwrap_or(0.0)
    }

    /// Returns the accumulated derivatives of `variable` for `instances`.
    #[must_use]
    pub fn derivatives(&self, variable: VariableId, instances: &[InstanceId]) -> Vec<f64> {
        instances
            .iter()
            .map(|&i| self.derivative(variable, i))
            .collect()
    }

    /// Returns the instance `from` refers to through `link`, if set.
    #[must_use]
    pub fn link(&self, link: LinkId, from: InstanceId) -> Option<InstanceId> {
        self.links[link.index()].get(&from).copied()
    }

    pub fn set_link(&mut self, link: LinkId, from: InstanceId, to: InstanceId) {
        self.links[link.index()].insert(from, to);
    }
}

fn check_lengths(instances: &[InstanceId], values: &[f64]) -> Result<(), ModelError> {
    if instances.len() == values.len() {
        Ok(())
    } else {
        Err(ModelError::LengthMismatch {
            expected: instances.len(),
            found: values.len(),
        })
    }
}
