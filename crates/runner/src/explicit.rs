//! Closed-form recomputation of Explicit process targets.

use weft_core::{EvalContext, Generation, Model, ProcessKind, ProcessSpec, Target, World};

use crate::{
    Error,
    invoke::{call, check_expression_count, evaluate},
};

/// Recomputes every Explicit process target at `time`.
///
/// Processes run in declaration order, so a later process sees the values an
/// earlier one just wrote. Vectorized expressions are evaluated over the
/// active instances of the owning class; linked targets broadcast each
/// owning instance's value onto the instance it links to, and owning
/// instances without a link are skipped. Callables run once per active
/// instance.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if a vectorized process has the wrong
/// number of expressions or an expression returns the wrong number of values,
/// and [`Error::Process`] if an expression or callable fails.
pub fn apply_explicits(
    model: &Model,
    world: &mut World,
    time: f64,
    generation: Generation,
) -> Result<(), Error> {
    for (_, process) in model.explicit_processes() {
        let ProcessKind::Explicit(spec) = process.kind() else {
            continue;
        };
        let instances = world.instances(process.class()).to_vec();

        match spec {
            ProcessSpec::Vectorized(exprs) => {
                check_expression_count(process, exprs, time)?;
                for (index, (target, expr)) in process.targets().iter().zip(exprs).enumerate() {
                    let context = EvalContext::new(world, time, generation);
                    let values = evaluate(process, index, expr, &context, &instances)?;
                    match *target {
                        Target::Variable(variable) => {
                            world
                                .set_values(variable, &instances, &values)
                                .map_err(|source| Error::process(process, None, time, source))?;
                        }
                        Target::Linked { link, variable } => {
                            for (&from, value) in instances.iter().zip(values) {
                                if let Some(to) = world.link(link, from) {
                                    world.set_value(variable, to, value);
                                }
                            }
                        }
                    }
                }
            }
            ProcessSpec::Callable(handler) => {
                for &instance in &instances {
                    call(process, handler, world, instance, time)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use weft_core::{ModelError, Process, expr};

    use super::*;
    use crate::Issue;

    #[test]
    fn later_processes_see_earlier_results() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let x = builder.variable(cell, "x", 2.0);
        let y = builder.variable(cell, "y", 0.0);
        let z = builder.variable(cell, "z", 0.0);
        builder.process(Process::explicit(
            "double",
            cell,
            [Target::Variable(y)],
            ProcessSpec::Vectorized(vec![expr(move |ctx, instances| {
                Ok(ctx.world.values(x, instances).iter().map(|v| 2.0 * v).collect())
            })]),
        ));
        builder.process(Process::explicit(
            "shift",
            cell,
            [Target::Variable(z)],
            ProcessSpec::callable(move |world, instance, time| {
                let shifted = world.value(y, instance) + time;
                world.set_value(z, instance, shifted);
                Ok(())
            }),
        ));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        let a = world.spawn(cell).unwrap();
        let b = world.spawn(cell).unwrap();
        world.set_value(x, b, 5.0);

        apply_explicits(&model, &mut world, 1.0, Generation::default()).unwrap();
        assert_eq!(world.values(y, &[a, b]), vec![4.0, 10.0]);
        assert_eq!(world.values(z, &[a, b]), vec![5.0, 11.0]);
    }

    #[test]
    fn linked_targets_broadcast_onto_linked_instances() {
        let mut builder = Model::builder();
        let person = builder.entity_class("Person");
        let cell = builder.entity_class("Cell");
        let wealth = builder.variable(person, "wealth", 0.0);
        let richest = builder.variable(cell, "richest", 0.0);
        let home = builder.link(person, "cell", cell);
        builder.process(Process::explicit(
            "report",
            person,
            [Target::Linked {
                link: home,
                variable: richest,
            }],
            ProcessSpec::Vectorized(vec![expr(move |ctx, instances| {
                Ok(ctx.world.values(wealth, instances))
            })]),
        ));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        let c = world.spawn(cell).unwrap();
        let p = world.spawn(person).unwrap();
        let homeless = world.spawn(person).unwrap();
        world.set_link(home, p, c);
        world.set_value(wealth, p, 7.0);
        world.set_value(wealth, homeless, 99.0);

        apply_explicits(&model, &mut world, 0.0, Generation::default()).unwrap();
        assert_eq!(world.value(richest, c), 7.0);
    }

    #[test]
    fn wrong_value_count_is_a_configuration_error() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let x = builder.variable(cell, "x", 0.0);
        builder.process(Process::explicit(
            "broken",
            cell,
            [Target::Variable(x)],
            ProcessSpec::Vectorized(vec![expr(|_, _| Ok(vec![1.0]))]),
        ));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        world.spawn(cell).unwrap();
        world.spawn(cell).unwrap();

        let err = apply_explicits(&model, &mut world, 0.0, Generation::default()).unwrap_err();
        match err {
            Error::Configuration { process, issue, .. } => {
                assert_eq!(process, "broken");
                assert_eq!(
                    issue,
                    Issue::ValueCount {
                        target: 0,
                        expected: 2,
                        found: 1
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn callable_failure_names_process_and_instance() {
        let mut builder = Model::builder();
        let cell = builder.entity_class("Cell");
        let x = builder.variable(cell, "x", 0.0);
        builder.process(Process::explicit(
            "fails",
            cell,
            [Target::Variable(x)],
            ProcessSpec::callable(|_, _, _| Err(ModelError::custom("boom"))),
        ));
        let model = builder.build().unwrap();

        let mut world = World::new(&model);
        let a = world.spawn(cell).unwrap();

        let err = apply_explicits(&model, &mut world, 3.0, Generation::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::Process { ref process, instance: Some(i), time, .. }
                if process == "fails" && i == a && time == 3.0
        ));
    }
}
