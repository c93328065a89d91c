//! Shared plumbing for invoking process expressions and handlers.

use weft_core::{EvalContext, Expr, Handler, InstanceId, Process, World};

use crate::{Error, Issue};

/// Checks that a vectorized process has one expression per target.
pub(crate) fn check_expression_count(
    process: &Process,
    exprs: &[Expr],
    time: f64,
) -> Result<(), Error> {
    let expected = process.targets().len();
    if exprs.len() == expected {
        Ok(())
    } else {
        let issue = Issue::ExpressionCount {
            expected,
            found: exprs.len(),
        };
        Err(Error::configuration(process, None, time, issue))
    }
}

/// Evaluates the expression for target `index` over `instances`.
///
/// The result is guaranteed to hold one value per instance.
pub(crate) fn evaluate(
    process: &Process,
    index: usize,
    expr: &Expr,
    context: &EvalContext<'_>,
    instances: &[InstanceId],
) -> Result<Vec<f64>, Error> {
    let values = expr(context, instances)
        .map_err(|source| Error::process(process, None, context.time, source))?;
    if values.len() == instances.len() {
        Ok(values)
    } else {
        let issue = Issue::ValueCount {
            target: index,
            expected: instances.len(),
            found: values.len(),
        };
        Err(Error::configuration(process, None, context.time, issue))
    }
}

/// Invokes a handler for one instance.
pub(crate) fn call(
    process: &Process,
    handler: &Handler,
    world: &mut World,
    instance: InstanceId,
    time: f64,
) -> Result<(), Error> {
    handler(world, instance, time)
        .map_err(|source| Error::process(process, Some(instance), time, source))
}

