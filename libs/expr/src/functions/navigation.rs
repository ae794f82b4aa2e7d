//! Navigation functions: path, exists
//!
//! Both run a path-language query against their `object` argument. The
//! object is never evaluated as a whole up front; the query only forces the
//! nodes it walks through.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    check_arity, check_arity_range, check_keywords, invoker, pending, required_keyword, Arg,
    Descriptor, Invoker,
};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::query::Language;
use crate::result::EvalResult;
use crate::tree::Tree;

pub(crate) fn path() -> Arc<dyn Descriptor> {
    Arc::new(Path)
}

pub(crate) fn exists() -> Arc<dyn Descriptor> {
    Arc::new(Exists)
}

/// Arguments shared by both functions, with the way to report each one.
struct QueryArgs<'a> {
    object: Arg<'a>,
    query: Arg<'a>,
    default: Option<Arg<'a>>,
    keyword: bool,
}

impl<'a> QueryArgs<'a> {
    fn positional(mut args: Vec<Arg<'a>>) -> Result<Self> {
        let got = args.len();
        let default = if args.len() > 2 { args.pop() } else { None };
        let query = args.pop();
        let object = args.pop();
        match (object, query) {
            (Some(object), Some(query)) => Ok(QueryArgs {
                object,
                query,
                default,
                keyword: false,
            }),
            _ => Err(Error::Arity {
                wanted: 2,
                variadic: true,
                got,
            }),
        }
    }

    fn keyword(args: &BTreeMap<String, Arg<'a>>) -> Result<Self> {
        Ok(QueryArgs {
            object: required_keyword(args, "object")?.clone(),
            query: required_keyword(args, "query")?.clone(),
            default: args.get("default").cloned(),
            keyword: true,
        })
    }

    fn wrap(&self, name: &str, index: usize, err: Error) -> Error {
        if self.keyword {
            Error::keyword_arg(name, err)
        } else {
            Error::positional_arg(index, err)
        }
    }

    /// The query text, or the references that keep it from being known.
    fn query_text(&self, ctx: &Context) -> Result<std::result::Result<String, EvalResult>> {
        let result = self
            .query
            .evaluate_all(ctx)
            .map_err(|err| self.wrap("query", 1, err))?;
        if !result.complete() {
            return Ok(Err(pending(result.unresolvable)));
        }
        match result.value {
            Tree::String(s) => Ok(Ok(s)),
            other => Err(self.wrap(
                "query",
                1,
                Error::unexpected_type(&["string"], other.type_name()),
            )),
        }
    }

    fn run(&self, ctx: &Context, query: &str) -> Result<EvalResult> {
        self.object.evaluate_query(ctx, Language::Path, query)
    }
}

struct Path;

impl Path {
    fn invoke(ctx: &Context, args: &QueryArgs<'_>) -> Result<EvalResult> {
        let query = match args.query_text(ctx)? {
            Ok(query) => query,
            Err(partial) => return Ok(partial),
        };

        match args.run(ctx, &query) {
            Ok(result) if result.complete() => Ok(result),
            Ok(result) => Ok(pending(result.unresolvable)),
            Err(err) if err.is_not_found() => match &args.default {
                Some(default) => {
                    tracing::debug!(query = %query, "path not found, using default");
                    let result = default
                        .evaluate_all(ctx)
                        .map_err(|err| args.wrap("default", 2, err))?;
                    if result.complete() {
                        Ok(result)
                    } else {
                        Ok(pending(result.unresolvable))
                    }
                }
                None => Err(args.wrap("query", 1, err)),
            },
            Err(err) => Err(args.wrap("query", 1, err)),
        }
    }
}

impl Descriptor for Path {
    fn description(&self) -> &'static str {
        "Looks up a value by path query, with an optional default for missing paths"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity_range(2, 3, args.len())?;
        let args = QueryArgs::positional(args)?;
        Ok(invoker(move |ctx: &Context| Self::invoke(ctx, &args)))
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        check_keywords(&args, &["object", "query", "default"])?;
        let args = QueryArgs::keyword(&args)?;
        Ok(invoker(move |ctx: &Context| Self::invoke(ctx, &args)))
    }
}

struct Exists;

impl Exists {
    fn invoke(ctx: &Context, args: &QueryArgs<'_>) -> Result<EvalResult> {
        let query = match args.query_text(ctx)? {
            Ok(query) => query,
            Err(partial) => return Ok(partial),
        };

        match args.run(ctx, &query) {
            Ok(result) if result.complete() => Ok(EvalResult::new(Tree::Bool(true))),
            Ok(result) => Ok(pending(result.unresolvable)),
            Err(err) if err.is_not_found() => Ok(EvalResult::new(Tree::Bool(false))),
            Err(err) => Err(args.wrap("query", 1, err)),
        }
    }
}

impl Descriptor for Exists {
    fn description(&self) -> &'static str {
        "Returns true if a path query finds a value"
    }

    fn positional_invoker<'a>(&self, args: Vec<Arg<'a>>) -> Result<Box<dyn Invoker + 'a>> {
        check_arity(2, false, args.len())?;
        let args = QueryArgs::positional(args)?;
        Ok(invoker(move |ctx: &Context| Self::invoke(ctx, &args)))
    }

    fn keyword_invoker<'a>(
        &self,
        args: BTreeMap<String, Arg<'a>>,
    ) -> Result<Box<dyn Invoker + 'a>> {
        check_keywords(&args, &["object", "query"])?;
        let args = QueryArgs::keyword(&args)?;
        Ok(invoker(move |ctx: &Context| Self::invoke(ctx, &args)))
    }
}
