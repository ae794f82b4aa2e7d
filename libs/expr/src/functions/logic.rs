//! Logic functions: coalesce, equals, notEquals

use std::sync::Arc;

use super::{check_arity, evaluate_positional, invoker, pending, Arg, Descriptor, Invoker};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::result::EvalResult;
use crate::tree::Tree;
use crate::unresolvable::Unresolvable;

pub(crate) fn coalesce() -> Arc<dyn Descriptor> {
    Arc::new(Coalesce)
}

pub(crate) fn equals() -> Arc<dyn Descriptor> {
    Arc::new(Equality { negate: false })
}

pub(crate) fn not_equals() -> Arc<dyn Descriptor> {
    Arc::new(Equality { negate: true })
}

struct Coalesce;

impl Descriptor for Coalesce {
    fn description(&self) -> &'static str {
        "Returns the first argument that is resolved and not null"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        Ok(invoker(move |ctx: &Context| {
            let mut skipped = Unresolvable::default();
            for (index, arg) in args.iter().enumerate() {
                let result = arg
                    .evaluate_all(ctx)
                    .map_err(|err| Error::positional_arg(index, err))?;
                if !result.complete() {
                    tracing::debug!(index, "coalesce skipping unresolved argument");
                    skipped.extends(result.unresolvable);
                    continue;
                }
                if !result.value.is_null() {
                    return Ok(result);
                }
            }
            if skipped.is_empty() {
                Ok(EvalResult::new(Tree::Null))
            } else {
                Ok(pending(skipped))
            }
        }))
    }
}

struct Equality {
    negate: bool,
}

impl Descriptor for Equality {
    fn description(&self) -> &'static str {
        if self.negate {
            "Returns true if the two arguments are not deeply equal"
        } else {
            "Returns true if the two arguments are deeply equal"
        }
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(2, false, args.len())?;
        let negate = self.negate;
        Ok(invoker(move |ctx: &Context| {
            let (values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let equal = values[0] == values[1];
            Ok(EvalResult::new(Tree::Bool(equal != negate)))
        }))
    }
}
