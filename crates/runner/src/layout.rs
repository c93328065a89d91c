//! Mapping between instance variables and the flat integrator state.
//!
//! Each distinct ODE-governed variable owns one contiguous slice of the state
//! vector. Slices appear in the order their variables first appear among the
//! ODE processes' targets, and each slice holds one entry per active instance
//! of the variable's class, in roster order.

use std::ops::Range;

use weft_core::{ClassId, InstanceId, Model, ModelError, VariableId, World};

/// The state-vector slice assigned to one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub variable: VariableId,
    pub class: ClassId,
    pub instances: Vec<InstanceId>,
    pub range: Range<usize>,
}

/// An index assignment from `(variable, instance)` pairs to state positions.
///
/// The instance lists are snapshotted when the layout is built, so a layout
/// stays valid only while no instance is spawned or (de)activated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    slices: Vec<Slice>,
    len: usize,
}

impl Layout {
    /// Assigns slices for every variable targeted by an ODE process.
    #[must_use]
    pub fn build(model: &Model, world: &World) -> Self {
        let mut variables: Vec<VariableId> = Vec::new();
        for (_, process) in model.ode_processes() {
            for target in process.targets() {
                let variable = target.variable();
                if !variables.contains(&variable) {
                    variables.push(variable);
                }
            }
        }

        let mut len = 0;
        let slices = variables
            .into_iter()
            .map(|variable| {
                let class = model.variable(variable).class;
                let instances = world.instances(class).to_vec();
                let start = len;
                len += instances.len();
                Slice {
                    variable,
                    class,
                    instances,
                    range: start..len,
                }
            })
            .collect();

        Self { slices, len }
    }

    /// Total length of the state vector.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Returns the slice assigned to `variable`, if it is ODE-governed.
    #[must_use]
    pub fn slice(&self, variable: VariableId) -> Option<&Slice> {
        self.slices.iter().find(|s| s.variable == variable)
    }

    /// Reads the current values of every slice into a new state vector.
    #[must_use]
    pub fn pack(&self, world: &World) -> Vec<f64> {
        let mut state = Vec::with_capacity(self.len);
        for slice in &self.slices {
            state.extend(world.values(slice.variable, &slice.instances));
        }
        state
    }

    /// Writes a state vector back to the world and clears the derivative
    /// accumulators of every ODE-governed variable.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LengthMismatch`] if `state` does not have the
    /// layout's length; the world is left untouched in that case.
    pub fn unpack(&self, state: &[f64], world: &mut World) -> Result<(), ModelError> {
        if state.len() != self.len {
            return Err(ModelError::LengthMismatch {
                expected: self.len,
                found: state.len(),
            });
        }
        for slice in &self.slices {
            world.set_values(slice.variable, &slice.instances, &state[slice.range.clone()])?;
            world.clear_derivatives(slice.variable);
        }
        Ok(())
    }

    /// Adds the accumulated derivatives of every slice into `dydt`.
    pub(crate) fn gather(&self, world: &World, dydt: &mut [f64]) {
        for slice in &self.slices {
            let terms = world.derivatives(slice.variable, &slice.instances);
            for (d, term) in dydt[slice.range.clone()].iter_mut().zip(terms) {
                *d += term;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{Process, ProcessSpec, Target};

    use super::*;

    fn noop() -> ProcessSpec {
        ProcessSpec::callable(|_, _, _| Ok(()))
    }

    #[test]
    fn slices_follow_first_appearance_and_are_contiguous() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let region = builder.taxon("Region");
        let stock = builder.variable(cell, "stock", 0.0);
        let pool = builder.variable(region, "pool", 0.0);
        let home = builder.link(cell, "region", region);
        builder.process(Process::ode(
            "drain",
            cell,
            [
                Target::Linked {
                    link: home,
                    variable: pool,
                },
                Target::Variable(stock),
            ],
            noop(),
        ));
        builder.process(Process::ode("grow", cell, [Target::Variable(stock)], noop()));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        let cells: Vec<_> = (0..3).map(|_| world.spawn(cell).unwrap()).collect();
        let r = world.spawn(region).unwrap();

        let layout = Layout::build(&model, &world);
        assert_eq!(layout.len(), 4);
        let slices = layout.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].variable, pool);
        assert_eq!(slices[0].instances, vec![r]);
        assert_eq!(slices[0].range, 0..1);
        assert_eq!(slices[1].variable, stock);
        assert_eq!(slices[1].instances, cells);
        assert_eq!(slices[1].range, 1..4);
    }

    #[test]
    fn unpack_then_pack_reproduces_state_and_clears_accumulators() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let stock = builder.variable(cell, "stock", 0.0);
        builder.process(Process::ode("grow", cell, [Target::Variable(stock)], noop()));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        let a = world.spawn(cell).unwrap();
        let b = world.spawn(cell).unwrap();
        world.add_derivative(stock, a, 3.0);

        let layout = Layout::build(&model, &world);
        layout.unpack(&[1.5, -2.0], &mut world).unwrap();
        assert_eq!(world.value(stock, b), -2.0);
        assert_eq!(world.derivative(stock, a), 0.0);
        assert_eq!(layout.pack(&world), vec![1.5, -2.0]);

        let err = layout.unpack(&[1.0], &mut world).unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn model_without_ode_processes_has_empty_layout() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let x = builder.variable(cell, "x", 0.0);
        builder.process(Process::explicit("set", cell, [Target::Variable(x)], noop()));
        let model = builder.build().unwrap();
        let world = World::new(&model);

        let layout = Layout::build(&model, &world);
        assert!(layout.is_empty());
        assert!(layout.pack(&world).is_empty());
    }
}
