//! `{"$fn.<name>": args}` invocations

use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::functions::Arg;
use crate::result::EvalResult;
use crate::tree::{check_supported_deep, Tree};
use crate::unresolvable::Unresolvable;

/// Arguments as handed to the function, kept to rebuild a partial call.
enum Bound<'a> {
    Positional(Vec<Arg<'a>>),
    Keyword(BTreeMap<String, Arg<'a>>),
    Single(Arg<'a>),
}

impl Bound<'_> {
    /// The arguments with every fully evaluated one replaced by its value.
    fn settled(&self) -> Tree {
        match self {
            Bound::Positional(args) => Tree::Sequence(args.iter().map(Arg::settled).collect()),
            Bound::Keyword(args) => Tree::Mapping(
                args.iter()
                    .map(|(key, arg)| (key.clone(), arg.settled()))
                    .collect(),
            ),
            Bound::Single(arg) => arg.settled(),
        }
    }
}

pub(super) fn visit(
    ev: &Evaluator,
    ctx: &Context,
    key: &str,
    name: &str,
    args: &Tree,
) -> Result<EvalResult> {
    let Some(descriptor) = ev.functions().descriptor(name) else {
        tracing::debug!(function = %name, "function not found");
        return Ok(EvalResult::partial(
            Tree::mapping([(key, args.clone())]),
            Unresolvable::invocation(name, Error::FunctionNotFound),
        ));
    };

    // The shape of the arguments picks the calling convention, but only once
    // it is known for certain.
    let shape = ev.evaluate(ctx, args, 1)?;
    let bound = if shape.complete() {
        match shape.value {
            Tree::Sequence(items) => {
                Bound::Positional(items.into_iter().map(|item| Arg::new(ev, item)).collect())
            }
            Tree::Mapping(fields) => Bound::Keyword(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Arg::new(ev, value)))
                    .collect(),
            ),
            other => Bound::Single(Arg::new(ev, other)),
        }
    } else {
        Bound::Single(Arg::new(ev, args.clone()))
    };

    let invoker = match &bound {
        Bound::Positional(args) => descriptor.positional_invoker(args.clone()),
        Bound::Keyword(args) => descriptor.keyword_invoker(args.clone()),
        Bound::Single(arg) => descriptor.positional_invoker(vec![arg.clone()]),
    }
    .map_err(|err| Error::invocation(name, err))?;

    let result = invoker
        .invoke(ctx)
        .map_err(|err| Error::invocation(name, err))?;

    if result.complete() {
        check_supported_deep(&result.value)?;
        return Ok(result);
    }

    tracing::debug!(function = %name, missing = result.unresolvable.len(), "invocation is incomplete");
    Ok(EvalResult::partial(
        Tree::mapping([(key, bound.settled())]),
        result.unresolvable,
    ))
}
