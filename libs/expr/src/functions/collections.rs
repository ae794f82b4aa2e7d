//! Collection functions: append, merge

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    check_arity, check_keywords, evaluate_positional, invoker, pending, required_keyword, Arg,
    Descriptor, Invoker,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::result::EvalResult;
use crate::tree::Tree;

pub(crate) fn append() -> Arc<dyn Descriptor> {
    Arc::new(Append)
}

pub(crate) fn merge() -> Arc<dyn Descriptor> {
    Arc::new(Merge)
}

struct Append;

impl Descriptor for Append {
    fn description(&self) -> &'static str {
        "Returns a new sequence with the remaining arguments appended to the first"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(1, true, args.len())?;
        Ok(invoker(move |ctx: &Context| {
            let (mut values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let items = values.split_off(1);
            let mut sequence = match values.pop() {
                Some(Tree::Sequence(sequence)) => sequence,
                Some(other) => {
                    return Err(Error::positional_arg(
                        0,
                        Error::unexpected_type(&["sequence"], other.type_name()),
                    ))
                }
                None => Vec::new(),
            };
            sequence.extend(items);
            Ok(EvalResult::new(Tree::Sequence(sequence)))
        }))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeMode {
    Deep,
    Shallow,
}

impl std::str::FromStr for MergeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deep" => Ok(MergeMode::Deep),
            "shallow" => Ok(MergeMode::Shallow),
            other => Err(Error::Type(format!(
                "unknown merge mode {other:?}, expected \"deep\" or \"shallow\""
            ))),
        }
    }
}

/// Merge `overlay` into `base`. Later keys win; in deep mode nested mappings
/// present on both sides are merged instead of replaced.
pub fn merge_into(base: &mut BTreeMap<String, Tree>, overlay: BTreeMap<String, Tree>, mode: MergeMode) {
    for (key, value) in overlay {
        match (mode, value) {
            (MergeMode::Deep, Tree::Mapping(incoming)) => match base.get_mut(&key) {
                Some(Tree::Mapping(existing)) => merge_into(existing, incoming, mode),
                _ => {
                    base.insert(key, Tree::Mapping(incoming));
                }
            },
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn merge_all(objects: Vec<Tree>, mode: MergeMode, wrap: impl Fn(usize, Error) -> Error) -> Result<Tree> {
    let mut merged = BTreeMap::new();
    for (index, object) in objects.into_iter().enumerate() {
        match object {
            Tree::Mapping(fields) => merge_into(&mut merged, fields, mode),
            Tree::Null => {}
            other => {
                return Err(wrap(
                    index,
                    Error::unexpected_type(&["mapping", "null"], other.type_name()),
                ))
            }
        }
    }
    Ok(Tree::Mapping(merged))
}

struct Merge;

impl Descriptor for Merge {
    fn description(&self) -> &'static str {
        "Merges mappings key by key; later mappings win"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        Ok(invoker(move |ctx: &Context| {
            let (values, unresolvable) = evaluate_positional(ctx, &args)?;
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }
            let merged = merge_all(values, MergeMode::Deep, Error::positional_arg)?;
            Ok(EvalResult::new(merged))
        }))
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        check_keywords(&args, &["objects", "mode"])?;
        let objects = required_keyword(&args, "objects")?.clone();
        let mode = args.get("mode").cloned();

        Ok(invoker(move |ctx: &Context| {
            let objects_result = objects
                .evaluate_all(ctx)
                .map_err(|err| Error::keyword_arg("objects", err))?;
            let mut unresolvable = objects_result.unresolvable;

            let mode_value = match &mode {
                Some(arg) => {
                    let result = arg
                        .evaluate_all(ctx)
                        .map_err(|err| Error::keyword_arg("mode", err))?;
                    unresolvable.extends(result.unresolvable);
                    Some(result.value)
                }
                None => None,
            };
            if !unresolvable.is_empty() {
                return Ok(pending(unresolvable));
            }

            let mode = match mode_value {
                None | Some(Tree::Null) => MergeMode::Deep,
                Some(Tree::String(s)) => s
                    .parse::<MergeMode>()
                    .map_err(|err| Error::keyword_arg("mode", err))?,
                Some(other) => {
                    return Err(Error::keyword_arg(
                        "mode",
                        Error::unexpected_type(&["string"], other.type_name()),
                    ))
                }
            };

            let objects = match objects_result.value {
                Tree::Sequence(items) => items,
                other => {
                    return Err(Error::keyword_arg(
                        "objects",
                        Error::unexpected_type(&["sequence"], other.type_name()),
                    ))
                }
            };
            let merged = merge_all(objects, mode, |index, err| {
                Error::keyword_arg("objects", err.at_index(index))
            })?;
            Ok(EvalResult::new(merged))
        }))
    }
}
