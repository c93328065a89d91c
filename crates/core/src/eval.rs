//! Expression evaluation context.
//!
//! Every derivative evaluation starts a new [`Generation`]. Expressions that
//! share expensive intermediate results can cache them in a [`Memo`], which
//! recomputes its value whenever it is asked for under a newer generation.

use std::cell::RefCell;

use crate::World;

/// A monotonically increasing evaluation counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// Returns the generation that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Read access handed to vectorized expressions.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub world: &'a World,
    pub time: f64,
    pub generation: Generation,
}

impl<'a> EvalContext<'a> {
    #[must_use]
    pub fn new(world: &'a World, time: f64, generation: Generation) -> Self {
        Self {
            world,
            time,
            generation,
        }
    }
}

/// A single cached value tagged with the generation it was computed in.
#[derive(Debug, Default)]
pub struct Memo<T> {
    slot: RefCell<Option<(Generation, T)>>,
}

impl<T: Clone> Memo<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    /// Returns the cached value for `generation`, computing it with `f` if the
    /// cache is empty or was filled under another generation.
    pub fn get_or_compute(&self, generation: Generation, f: impl FnOnce() -> T) -> T {
        if let Some((cached, value)) = &*self.slot.borrow() {
            if *cached == generation {
                return value.clone();
            }
        }
        let value = f();
        *self.slot.borrow_mut() = Some((generation, value.clone()));
        value
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn memo_recomputes_only_on_new_generation() {
        let memo = Memo::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            calls.get() * 10
        };

        let first = Generation::default().next();
        assert_eq!(memo.get_or_compute(first, compute), 10);
        assert_eq!(memo.get_or_compute(first, compute), 10);
        assert_eq!(calls.get(), 1);

        let second = first.next();
        assert_eq!(memo.get_or_compute(second, compute), 20);
        assert_eq!(calls.get(), 2);
        assert_eq!(second.value(), 2);
    }
}
