//! The workflow dialect
//!
//! [`WorkflowVisitor`] gives meaning to the special shapes of a workflow
//! specification:
//!
//! * `{"$type": "Secret", "name": "token"}` and the other type references
//! * `{"$encoding": "base64", "data": "..."}` envelopes
//! * `{"$fn.concat": ["a", "b"]}` function invocations
//! * strings with `${...}` templates, which see the namespaces `secrets`,
//!   `connections`, `outputs`, `parameters`, `answers` and `status`
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use weft_expr::{workflow, Context, MemorySecretTypeResolver, Options, Tree};
//!
//! let ev = workflow::evaluator(
//!     Options::default()
//!         .with_secret_resolver(Arc::new(MemorySecretTypeResolver::new([("token", "s3cr3t")]))),
//! );
//! let spec = Tree::from(json!({
//!     "auth": "Bearer ${secrets.token}",
//!     "region": {"$type": "Parameter", "name": "region"},
//! }));
//!
//! let result = ev.evaluate_all(&Context::new(), &spec).unwrap();
//! assert_eq!(result.value.get("auth"), Some(&Tree::from("Bearer s3cr3t")));
//! assert!(!result.complete());
//! ```

use std::collections::BTreeMap;

use crate::context::Context;
use crate::encoding;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Visitor};
use crate::expand::verbatim_to;
use crate::interpreter::Scope;
use crate::options::Options;
use crate::result::EvalResult;
use crate::tree::Tree;

mod invocation;
mod namespace;
mod types;

const FUNCTION_PREFIX: &str = "$fn.";

pub struct WorkflowVisitor {
    options: Options,
    root: Tree,
}

impl WorkflowVisitor {
    pub fn new(options: Options) -> Self {
        let root = namespace::root(&options);
        Self { options, root }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

/// An evaluator for workflow specifications.
pub fn evaluator(options: Options) -> Evaluator {
    let functions = options.functions().clone();
    let capacity = options.cache_capacity();
    Evaluator::new(WorkflowVisitor::new(options), functions, capacity)
}

impl Visitor for WorkflowVisitor {
    fn visit_mapping(
        &self,
        ev: &Evaluator,
        ctx: &Context,
        mapping: &BTreeMap<String, Tree>,
        depth: i32,
    ) -> Result<EvalResult> {
        if let Some(Tree::String(type_name)) = mapping.get("$type") {
            if let Some(result) = types::visit(self, ev, ctx, type_name, mapping)? {
                return Ok(finished(result, depth));
            }
        }

        if let Some(Tree::String(encoding)) = mapping.get("$encoding") {
            return Ok(finished(visit_encoding(ev, ctx, encoding, mapping)?, depth));
        }

        if mapping.len() == 1 {
            if let Some((key, args)) = mapping.iter().next() {
                if let Some(name) = key.strip_prefix(FUNCTION_PREFIX) {
                    return Ok(finished(invocation::visit(ev, ctx, key, name, args)?, depth));
                }
            }
        }

        ev.walk_mapping(ctx, mapping, depth)
    }

    fn visit_string(&self, ev: &Evaluator, ctx: &Context, s: &str, depth: i32) -> Result<EvalResult> {
        if !s.contains("${") {
            return Ok(EvalResult::new(Tree::String(s.to_string())));
        }
        let template = ev.cache().template(s)?;
        template.evaluate(ev, ctx, &Scope::new(self.root.clone()), depth)
    }
}

/// Resolved and computed values are final. Below `depth` they stay wrapped so
/// a later walk does not read them as workflow syntax.
fn finished(mut result: EvalResult, depth: i32) -> EvalResult {
    if result.complete() {
        result.value = verbatim_to(result.value, depth);
    }
    result
}

fn visit_encoding(
    ev: &Evaluator,
    ctx: &Context,
    encoding: &str,
    mapping: &BTreeMap<String, Tree>,
) -> Result<EvalResult> {
    let data = mapping.get("data").ok_or_else(|| Error::MissingField {
        field: "data".into(),
    })?;

    let result = ev.evaluate_all(ctx, data).map_err(|err| err.at_key("data"))?;
    if !result.complete() {
        let mut envelope = mapping.clone();
        envelope.insert("data".into(), result.value);
        return Ok(EvalResult::partial(Tree::Mapping(envelope), result.unresolvable));
    }

    match result.value {
        Tree::String(text) => Ok(EvalResult::new(Tree::String(encoding::decode(encoding, &text)?))),
        other => Err(Error::unexpected_type(&["string"], other.type_name())),
    }
}
