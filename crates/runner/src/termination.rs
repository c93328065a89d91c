//! User-supplied stopping conditions.

use std::fmt;

use weft_core::{InstanceId, World};

/// A stopping predicate evaluated against one subject instance.
pub type Predicate = Box<dyn Fn(&World, InstanceId) -> bool>;

/// A list of `(predicate, subject)` pairs checked at the start of every
/// discontinuity cycle.
#[derive(Default)]
pub struct Termination {
    checks: Vec<(Predicate, InstanceId)>,
}

impl Termination {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate checked against `subject`.
    pub fn add<F>(&mut self, subject: InstanceId, predicate: F)
    where
        F: Fn(&World, InstanceId) -> bool + 'static,
    {
        self.checks.push((Box::new(predicate), subject));
    }

    /// Builder form of [`Termination::add`].
    #[must_use]
    pub fn with<F>(mut self, subject: InstanceId, predicate: F) -> Self
    where
        F: Fn(&World, InstanceId) -> bool + 'static,
    {
        self.add(subject, predicate);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Returns `true` as soon as any predicate holds for its subject.
    #[must_use]
    pub fn should_stop(&self, world: &World) -> bool {
        self.checks
            .iter()
            .any(|(predicate, subject)| predicate(world, *subject))
    }
}

impl fmt::Debug for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Termination({} checks)", self.checks.len())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use weft_core::Model;

    use super::*;

    #[test]
    fn short_circuits_on_first_match() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let x = builder.variable(cell, "x", 0.0);
        let model = builder.build().unwrap();
        let mut world = World::new(&model);
        let a = world.spawn(cell).unwrap();

        let later_calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&later_calls);
        let termination = Termination::new()
            .with(a, move |world, subject| world.value(x, subject) > 1.0)
            .with(a, move |_, _| {
                counter.set(counter.get() + 1);
                false
            });

        assert!(!termination.should_stop(&world));
        assert_eq!(later_calls.get(), 1);

        world.set_value(x, a, 2.0);
        assert!(termination.should_stop(&world));
        assert_eq!(later_calls.get(), 1);
        assert_eq!(termination.len(), 2);
    }

    #[test]
    fn empty_termination_never_stops() {
        let model = Model::builder().build().unwrap();
        assert!(!Termination::new().should_stop(&World::new(&model)));
    }
}
