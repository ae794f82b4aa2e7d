//! Function invocation protocol and the standard library
//!
//! A [`Descriptor`] turns call arguments into an [`Invoker`]. Arguments are
//! [`Arg`]s: unevaluated trees that each function evaluates lazily, as deep
//! as it needs. Full evaluations are memoized per argument so a partial call
//! can be rebuilt from what was already resolved.
//!
//! The standard library's names live in a compile-time perfect hash map;
//! [`FunctionMap`] is the runtime registry an evaluator consults.

use std::cell::OnceCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use phf::phf_map;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, DEPTH_FULL};
use crate::query::Language;
use crate::result::EvalResult;
use crate::tree::Tree;
use crate::unresolvable::Unresolvable;

pub mod collections;
pub mod json;
pub mod logic;
pub mod navigation;
pub mod strings;

/// A callable function.
pub trait Descriptor: Send + Sync {
    fn description(&self) -> &'static str;

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        let _ = args;
        Err(Error::PositionalArgsUnsupported)
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        let _ = args;
        Err(Error::KeywordArgsUnsupported)
    }
}

/// A function bound to its arguments.
pub trait Invoker {
    fn invoke(&self, ctx: &Context) -> Result<EvalResult>;
}

struct FnInvoker<F>(F);

impl<F> Invoker for FnInvoker<F>
where
    F: Fn(&Context) -> Result<EvalResult>,
{
    fn invoke(&self, ctx: &Context) -> Result<EvalResult> {
        (self.0)(ctx)
    }
}

/// Box a closure as an [`Invoker`].
pub fn invoker<'a, F>(f: F) -> Box<dyn Invoker + 'a>
where
    F: Fn(&Context) -> Result<EvalResult> + 'a,
{
    Box::new(FnInvoker(f))
}

/// A lazily evaluated function argument.
#[derive(Clone)]
pub struct Arg<'a> {
    ev: &'a Evaluator,
    tree: Tree,
    full: Rc<OnceCell<EvalResult>>,
}

impl<'a> Arg<'a> {
    pub fn new(ev: &'a Evaluator, tree: Tree) -> Self {
        Arg {
            ev,
            tree,
            full: Rc::new(OnceCell::new()),
        }
    }

    /// The argument as written, before any evaluation.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn evaluator(&self) -> &'a Evaluator {
        self.ev
    }

    pub fn evaluate(&self, ctx: &Context, depth: i32) -> Result<EvalResult> {
        if depth < 0 {
            return self.evaluate_all(ctx);
        }
        self.ev.evaluate(ctx, &self.tree, depth)
    }

    /// Full evaluation, computed at most once.
    pub fn evaluate_all(&self, ctx: &Context) -> Result<EvalResult> {
        if let Some(result) = self.full.get() {
            return Ok(result.clone());
        }
        let result = self.ev.evaluate(ctx, &self.tree, DEPTH_FULL)?;
        let _ = self.full.set(result.clone());
        Ok(result)
    }

    pub fn evaluate_query(&self, ctx: &Context, language: Language, query: &str) -> Result<EvalResult> {
        self.ev.evaluate_query(ctx, &self.tree, language, query)
    }

    /// The memoized full evaluation if there is one, otherwise the original.
    pub(crate) fn settled(&self) -> Tree {
        match self.full.get() {
            Some(result) => result.value.clone(),
            None => self.tree.clone(),
        }
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("tree", &self.tree)
            .field("evaluated", &self.full.get().is_some())
            .finish()
    }
}

/// Runtime registry of callable functions.
#[derive(Clone, Default)]
pub struct FunctionMap {
    descriptors: HashMap<String, Arc<dyn Descriptor>>,
}

impl FunctionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, descriptor: impl Descriptor + 'static) -> Self {
        self.insert(name, Arc::new(descriptor));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, descriptor: Arc<dyn Descriptor>) {
        self.descriptors.insert(name.into(), descriptor);
    }

    /// Add every function of `other`, replacing same-named entries.
    pub fn extend(&mut self, other: FunctionMap) {
        self.descriptors.extend(other.descriptors);
    }

    pub fn descriptor(&self, name: &str) -> Option<Arc<dyn Descriptor>> {
        self.descriptors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl fmt::Debug for FunctionMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionMap").field("names", &names).finish()
    }
}

/// Standard library entry
#[derive(Clone, Copy)]
pub struct FunctionMetadata {
    pub name: &'static str,
    pub constructor: fn() -> Arc<dyn Descriptor>,
}

/// Static compile-time function registry using perfect hash map
static LIBRARY: phf::Map<&'static str, FunctionMetadata> = phf_map! {
    // Collections
    "append" => FunctionMetadata { name: "append", constructor: collections::append },
    "merge" => FunctionMetadata { name: "merge", constructor: collections::merge },

    // Strings
    "concat" => FunctionMetadata { name: "concat", constructor: strings::concat },
    "toString" => FunctionMetadata { name: "toString", constructor: strings::to_string },
    "convertMarkdown" => FunctionMetadata { name: "convertMarkdown", constructor: strings::convert_markdown },

    // Logic
    "coalesce" => FunctionMetadata { name: "coalesce", constructor: logic::coalesce },
    "equals" => FunctionMetadata { name: "equals", constructor: logic::equals },
    "notEquals" => FunctionMetadata { name: "notEquals", constructor: logic::not_equals },

    // Navigation
    "path" => FunctionMetadata { name: "path", constructor: navigation::path },
    "exists" => FunctionMetadata { name: "exists", constructor: navigation::exists },

    // JSON
    "jsonUnmarshal" => FunctionMetadata { name: "jsonUnmarshal", constructor: json::json_unmarshal },
};

/// Look up standard library metadata by name
pub fn get_function_metadata(name: &str) -> Option<&'static FunctionMetadata> {
    LIBRARY.get(name)
}

/// A fresh map holding the whole standard library.
pub fn library() -> FunctionMap {
    let mut map = FunctionMap::new();
    for metadata in LIBRARY.values() {
        map.insert(metadata.name, (metadata.constructor)());
    }
    map
}

// ----------------------------------------------------------------------------
// Helpers shared by the library
// ----------------------------------------------------------------------------

/// Fail with `Arity` unless `got` is acceptable.
pub(crate) fn check_arity(wanted: usize, variadic: bool, got: usize) -> Result<()> {
    let ok = if variadic { got >= wanted } else { got == wanted };
    if ok {
        Ok(())
    } else {
        Err(Error::Arity {
            wanted,
            variadic,
            got,
        })
    }
}

/// Like [`check_arity`] for functions with optional trailing arguments.
pub(crate) fn check_arity_range(min: usize, max: usize, got: usize) -> Result<()> {
    if got < min {
        return Err(Error::Arity {
            wanted: min,
            variadic: true,
            got,
        });
    }
    if got > max {
        return Err(Error::Arity {
            wanted: max,
            variadic: false,
            got,
        });
    }
    Ok(())
}

/// Fully evaluate every positional argument. Values of unresolved arguments
/// are still returned, and their references collected.
pub(crate) fn evaluate_positional(
    ctx: &Context,
    args: &[Arg<'_>],
) -> Result<(Vec<Tree>, Unresolvable)> {
    let mut values = Vec::with_capacity(args.len());
    let mut unresolvable = Unresolvable::default();
    for (index, arg) in args.iter().enumerate() {
        let result = arg
            .evaluate_all(ctx)
            .map_err(|err| Error::positional_arg(index, err))?;
        unresolvable.extends(result.unresolvable);
        values.push(result.value);
    }
    Ok((values, unresolvable))
}

/// Reject keyword arguments the function does not know.
pub(crate) fn check_keywords(args: &BTreeMap<String, Arg<'_>>, known: &[&str]) -> Result<()> {
    match args.keys().find(|key| !known.contains(&key.as_str())) {
        Some(key) => Err(Error::keyword_arg(
            key.as_str(),
            Error::Type("unexpected argument".into()),
        )),
        None => Ok(()),
    }
}

pub(crate) fn required_keyword<'a, 'm>(
    args: &'m BTreeMap<String, Arg<'a>>,
    name: &str,
) -> Result<&'m Arg<'a>> {
    args.get(name).ok_or_else(|| {
        Error::keyword_arg(
            name,
            Error::MissingField {
                field: name.to_string(),
            },
        )
    })
}

/// A partial call result. The value is ignored by callers, which keep
/// their own representation of the unresolved call.
pub(crate) fn pending(unresolvable: Unresolvable) -> EvalResult {
    EvalResult::partial(Tree::Null, unresolvable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_contains_every_registered_name() {
        let map = library();
        assert_eq!(map.len(), LIBRARY.len());
        for name in LIBRARY.keys() {
            assert!(map.contains(name), "missing {name}");
            assert!(!map.descriptor(name).unwrap().description().is_empty());
        }
    }

    #[test]
    fn test_arity_checks() {
        assert!(check_arity(2, false, 2).is_ok());
        assert!(check_arity(1, true, 4).is_ok());
        assert!(matches!(
            check_arity(1, true, 0),
            Err(Error::Arity { wanted: 1, variadic: true, got: 0 })
        ));
        assert!(check_arity_range(2, 3, 3).is_ok());
        assert!(check_arity_range(2, 3, 4).is_err());
    }

    #[test]
    fn test_arg_memoizes_full_evaluation() {
        let ev = Evaluator::generic();
        let arg = Arg::new(&ev, Tree::from("x"));
        assert_eq!(arg.settled(), Tree::from("x"));
        let first = arg.evaluate_all(&Context::new()).unwrap();
        let cloned = arg.clone();
        assert_eq!(cloned.settled(), first.value);
    }
}
