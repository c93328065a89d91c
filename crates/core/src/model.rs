//! The static model registry.
//!
//! Classes, variables, links, and processes are declared once through a
//! [`ModelBuilder`] at assembly time. The resulting [`Model`] is immutable and
//! hands out the read-only descriptors the runner needs; all mutable instance
//! state lives in a separate [`World`](crate::World).

use serde::Serialize;

use crate::{
    ClassId, LinkId, ModelError, Process, ProcessId, ProcessKind, Target, VariableId,
};

/// Whether instances of a class can be deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassKind {
    /// Entities may move between the active and idle rosters.
    Entity,

    /// Process taxa are always active.
    Taxon,
}

/// A declared class.
#[derive(Debug, Clone, PartialEq)]
pub struct Class {
    pub name: String,
    pub kind: ClassKind,
}

/// A variable descriptor shared by every instance of its class.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub class: ClassId,

    /// Value read for instances that never had this variable written.
    pub default: f64,
}

/// A reference attribute from instances of `from` to instances of `to`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub name: String,
    pub from: ClassId,
    pub to: ClassId,
}

/// An immutable, validated model definition.
#[derive(Debug)]
pub struct Model {
    classes: Vec<Class>,
    variables: Vec<Variable>,
    links: Vec<Link>,
    processes: Vec<Process>,
    tracked: Vec<VariableId>,
}

impl Model {
    /// Starts declaring a new model.
    #[must_use]
    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Returns the class descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different model.
    #[must_use]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.index()]
    }

    /// Returns the variable descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different model.
    #[must_use]
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.index()]
    }

    /// Returns the link descriptor.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different model.
    #[must_use]
    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.index()]
    }

    /// Returns the process.
    ///
    /// # Panics
    ///
    /// Panics if `id` was issued by a different model.
    #[must_use]
    pub fn process(&self, id: ProcessId) -> &Process {
        &self.processes[id.index()]
    }

    #[must_use]
    pub fn classes(&self) -> &[Class] {
        &self.classes
    }

    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Iterates over all processes in declaration order.
    pub fn processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> + '_ {
        self.processes
            .iter()
            .enumerate()
            .map(|(index, process)| (ProcessId::new(index), process))
    }

    /// Iterates over Explicit processes in declaration order.
    pub fn explicit_processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> + '_ {
        self.processes()
            .filter(|(_, p)| matches!(p.kind(), ProcessKind::Explicit(_)))
    }

    /// Iterates over ODE processes in declaration order.
    pub fn ode_processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> + '_ {
        self.processes()
            .filter(|(_, p)| matches!(p.kind(), ProcessKind::Ode(_)))
    }

    /// Iterates over Event processes in declaration order.
    pub fn event_processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> + '_ {
        self.processes()
            .filter(|(_, p)| matches!(p.kind(), ProcessKind::Event { .. }))
    }

    /// Iterates over Step processes in declaration order.
    pub fn step_processes(&self) -> impl Iterator<Item = (ProcessId, &Process)> + '_ {
        self.processes()
            .filter(|(_, p)| matches!(p.kind(), ProcessKind::Step { .. }))
    }

    #[must_use]
    pub fn has_ode_processes(&self) -> bool {
        self.ode_processes().next().is_some()
    }

    /// Returns every variable targeted by some process, deduplicated, in
    /// order of first appearance.
    #[must_use]
    pub fn tracked_variables(&self) -> &[VariableId] {
        &self.tracked
    }
}

/// Collects declarations and validates them into a [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    classes: Vec<Class>,
    variables: Vec<Variable>,
    links: Vec<Link>,
    processes: Vec<Process>,
}

impl ModelBuilder {
    /// Declares an entity class.
    pub fn entity_class(&mut self, name: impl Into<String>) -> ClassId {
        self.class(name, ClassKind::Entity)
    }

    /// Declares a process taxon.
    pub fn taxon(&mut self, name: impl Into<String>) -> ClassId {
        self.class(name, ClassKind::Taxon)
    }

    fn class(&mut self, name: impl Into<String>, kind: ClassKind) -> ClassId {
        self.classes.push(Class {
            name: name.into(),
            kind,
        });
        ClassId::new(self.classes.len() - 1)
    }

    /// Declares a variable on `class`.
    pub fn variable(&mut self, class: ClassId, name: impl Into<String>, default: f64) -> VariableId {
        self.variables.push(Variable {
            name: name.into(),
            class,
            default,
        });
        VariableId::new(self.variables.len() - 1)
    }

    /// Declares a link from instances of `from` to instances of `to`.
    pub fn link(&mut self, from: ClassId, name: impl Into<String>, to: ClassId) -> LinkId {
        self.links.push(Link {
            name: name.into(),
            from,
            to,
        });
        LinkId::new(self.links.len() - 1)
    }

    /// Declares a process.
    pub fn process(&mut self, process: Process) -> ProcessId {
        self.processes.push(process);
        ProcessId::new(self.processes.len() - 1)
    }

    /// Validates all declarations and freezes them into a [`Model`].
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if any declaration refers to an unknown id, if
    /// a plain target is not owned by its process's class, or if a linked
    /// target's link does not connect the process's class to the variable's
    /// class.
    pub fn build(self) -> Result<Model, ModelError> {
        let class_exists = |id: ClassId| id.index() < self.classes.len();

        for variable in &self.variables {
            if !class_exists(variable.class) {
                return Err(ModelError::UnknownClass(variable.class));
            }
        }
        for link in &self.links {
            for class in [link.from, link.to] {
                if !class_exists(class) {
                    return Err(ModelError::UnknownClass(class));
                }
            }
        }

        let mut tracked = Vec::new();
        for process in &self.processes {
            if !class_exists(process.class()) {
                return Err(ModelError::UnknownClass(process.class()));
            }
            for target in process.targets() {
                self.check_target(process, *target)?;
                if !tracked.contains(&target.variable()) {
                    tracked.push(target.variable());
                }
            }
        }

        Ok(Model {
            classes: self.classes,
            variables: self.variables,
            links: self.links,
            processes: self.processes,
            tracked,
        })
    }

    fn check_target(&self, process: &Process, target: Target) -> Result<(), ModelError> {
        let variable_id = target.variable();
        let variable = self
            .variables
            .get(variable_id.index())
            .ok_or(ModelError::UnknownVariable(variable_id))?;

        match target {
            Target::Variable(_) if variable.class != process.class() => {
                Err(ModelError::ForeignTarget {
                    process: process.name().to_owned(),
                    variable: variable_id,
                    class: process.class(),
                })
            }
            Target::Variable(_) => Ok(()),
            Target::Linked { link: link_id, .. } => {
                let link = self
                    .links
                    .get(link_id.index())
                    .ok_or(ModelError::UnknownLink(link_id))?;
                if link.from == process.class() && link.to == variable.class {
                    Ok(())
                } else {
                    Err(ModelError::MismatchedLink {
                        process: process.name().to_owned(),
                        link: link_id,
                        from: process.class(),
                        to: variable.class,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessSpec;

    fn noop() -> ProcessSpec {
        ProcessSpec::callable(|_, _, _| Ok(()))
    }

    #[test]
    fn tracked_variables_are_deduplicated_in_order() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let a = builder.variable(cell, "a", 0.0);
        let b = builder.variable(cell, "b", 0.0);
        let _unused = builder.variable(cell, "c", 0.0);

        builder.process(Process::explicit(
            "first",
            cell,
            [Target::Variable(b), Target::Variable(a)],
            noop(),
        ));
        builder.process(Process::ode("second", cell, [Target::Variable(a)], noop()));

        let model = builder.build().expect("valid model");
        assert_eq!(model.tracked_variables(), &[b, a]);
        assert!(model.has_ode_processes());
        assert_eq!(model.explicit_processes().count(), 1);
        assert_eq!(model.step_processes().count(), 0);
    }

    #[test]
    fn rejects_plain_target_of_another_class() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let world = builder.taxon("World");
        let x = builder.variable(world, "x", 0.0);
        builder.process(Process::ode("growth", cell, [Target::Variable(x)], noop()));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ModelError::ForeignTarget { .. }));
    }

    #[test]
    fn rejects_link_that_does_not_reach_variable_class() {
        let mut builder = Model::builder();
        let individual = builder.entity_class("Individual");
        let cell = builder.entity_class("Cell");
        let society = builder.entity_class("Society");
        let wealth = builder.variable(society, "wealth", 0.0);
        let home = builder.link(individual, "cell", cell);
        builder.process(Process::ode(
            "spend",
            individual,
            [Target::Linked {
                link: home,
                variable: wealth,
            }],
            noop(),
        ));

        let err = builder.build().unwrap_err();
        assert!(matches!(err, ModelError::MismatchedLink { .. }));
    }

    #[test]
    fn accepts_valid_linked_target() {
        let mut builder = Model::builder();
        let individual = builder.entity_class("Individual");
        let cell = builder.entity_class("Cell");
        let stock = builder.variable(cell, "stock", 1.0);
        let home = builder.link(individual, "cell", cell);
        builder.process(Process::ode(
            "harvest",
            individual,
            [Target::Linked {
                link: home,
                variable: stock,
            }],
            noop(),
        ));

        let model = builder.build().expect("valid model");
        assert_eq!(model.link(home).to, cell);
        assert_eq!(model.variable(stock).default, 1.0);
        assert_eq!(model.class(cell).kind, ClassKind::Entity);
    }
}
