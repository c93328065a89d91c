//! The right-hand side handed to the integrator.

use weft_core::{
    EvalContext, Generation, Model, OdeSystem, ProcessKind, ProcessSpec, Target, World,
};

use crate::{
    Error, Layout,
    explicit::apply_explicits,
    invoke::{call, check_expression_count, evaluate},
};

/// Computes `dy/dt` for the instance state described by a [`Layout`].
///
/// Each evaluation starts a new [`Generation`], writes the proposed state into
/// the world, recomputes Explicit targets against it, and then sums every ODE
/// process contribution. The result depends only on `(t, y)`: accumulators
/// are cleared before each evaluation and no summand survives into the next.
pub struct DerivativeEvaluator<'a> {
    model: &'a Model,
    world: &'a mut World,
    layout: &'a Layout,
    generation: Generation,
}

impl<'a> DerivativeEvaluator<'a> {
    /// Creates an evaluator that continues counting from `generation`.
    pub fn new(
        model: &'a Model,
        world: &'a mut World,
        layout: &'a Layout,
        generation: Generation,
    ) -> Self {
        Self {
            model,
            world,
            layout,
            generation,
        }
    }

    /// Returns the generation of the most recent evaluation.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn world(&self) -> &World {
        self.world
    }

    /// Packs the world's current instance state in layout order.
    #[must_use]
    pub fn state(&self) -> Vec<f64> {
        self.layout.pack(self.world)
    }

    /// Writes `y` into the world and recomputes Explicit targets at `t`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if `y` does not match the layout, or the
    /// first error raised by an Explicit process.
    pub fn settle(&mut self, t: f64, y: &[f64]) -> Result<(), Error> {
        self.generation = self.generation.next();
        self.layout.unpack(y, self.world).map_err(Error::Layout)?;
        apply_explicits(self.model, self.world, t, self.generation)
    }

    fn contribute(&mut self, t: f64, dydt: &mut [f64]) -> Result<(), Error> {
        let model = self.model;
        for (_, process) in model.ode_processes() {
            let ProcessKind::Ode(spec) = process.kind() else {
                continue;
            };
            let instances = self.world.instances(process.class()).to_vec();

            match spec {
                ProcessSpec::Vectorized(exprs) => {
                    check_expression_count(process, exprs, t)?;
                    for (index, (target, expr)) in
                        process.targets().iter().zip(exprs).enumerate()
                    {
                        let context = EvalContext::new(self.world, t, self.generation);
                        let terms = evaluate(process, index, expr, &context, &instances)?;
                        match *target {
                            Target::Variable(variable) => {
                                let Some(slice) = self.layout.slice(variable) else {
                                    continue;
                                };
                                for (d, term) in dydt[slice.range.clone()].iter_mut().zip(terms) {
                                    *d += term;
                                }
                            }
                            Target::Linked { link, variable } => {
                                for (&from, term) in instances.iter().zip(terms) {
                                    if let Some(to) = self.world.link(link, from) {
                                        self.world.add_derivative(variable, to, term);
                                    }
                                }
                            }
                        }
                    }
                }
                ProcessSpec::Callable(handler) => {
                    for &instance in &instances {
                        call(process, handler, self.world, instance, t)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl OdeSystem for DerivativeEvaluator<'_> {
    type Error = Error;

    fn derivative(&mut self, t: f64, y: &[f64], dydt: &mut [f64]) -> Result<(), Error> {
        self.settle(t, y)?;

        dydt.fill(0.0);
        self.contribute(t, dydt)?;
        self.layout.gather(self.world, dydt);
        Ok(())
    }
}
