use std::sync::Arc;

use super::{check_arity, evaluate_positional, invoker, pending, Arg, Descriptor, Invoker};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::result::EvalResult;
use crate::tree::Tree;

pub(crate) fn json_unmarshal() -> Arc<dyn Descriptor> {
    Arc::new(JsonUnmarshal)
}

struct JsonUnmarshal;

impl Descriptor for JsonUnmarshal {
    fn description(&self) -> &'static str {
        "Parses JSON text into a value"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(1, false, args.len())?;
        Ok(invoker(move |ctx: &Context| {
            let (values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let text = match &values[0] {
                Tree::String(s) => s,
                other => {
                    return Err(Error::positional_arg(
                        0,
                        Error::unexpected_type(&["string"], other.type_name()),
                    ))
                }
            };
            let tree: Tree = serde_json::from_str(text)
                .map_err(|err| Error::positional_arg(0, err.into()))?;
            Ok(EvalResult::new(tree))
        }))
    }
}
