//! Template namespaces backed by resolvers
//!
//! `secrets.name` and `parameters.name` are one level deep; connections,
//! outputs, answers and statuses take two keys (`connections.aws.prod`).
//! Indexing a two-level namespace once yields the inner namespace as a new
//! thunk. Expanding a namespace lists everything its resolver knows about.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::expand::{verbatim, verbatim_to, Expandable, Indexable};
use crate::options::Options;
use crate::resolver::{
    AnswerTypeResolver, ConnectionTypeResolver, OutputTypeResolver, ParameterTypeResolver,
    SecretTypeResolver, StatusTypeResolver,
};
use crate::result::EvalResult;
use crate::tree::{check_supported_deep, Tree};
use crate::unresolvable::Unresolvable;

/// The root scope of workflow templates.
pub(super) fn root(options: &Options) -> Tree {
    Tree::mapping([
        ("secrets", Tree::thunk(Secrets(options.secret_resolver().clone()))),
        (
            "connections",
            Tree::thunk(Connections {
                resolver: options.connection_resolver().clone(),
                connection_type: None,
            }),
        ),
        (
            "outputs",
            Tree::thunk(Outputs {
                resolver: options.output_resolver().clone(),
                from: None,
            }),
        ),
        ("parameters", Tree::thunk(Parameters(options.parameter_resolver().clone()))),
        (
            "answers",
            Tree::thunk(Answers {
                resolver: options.answer_resolver().clone(),
                ask_ref: None,
            }),
        ),
        (
            "status",
            Tree::thunk(Statuses {
                resolver: options.status_resolver().clone(),
                name: None,
            }),
        ),
    ])
}

fn key_name<'k>(namespace: &str, key: &'k Tree) -> Result<&'k str> {
    key.as_str().ok_or_else(|| {
        Error::Type(format!(
            "{namespace} must be indexed by name, got {}",
            key.type_name()
        ))
    })
}

fn found(value: Option<Tree>, missing: impl FnOnce() -> Unresolvable) -> EvalResult {
    match value {
        Some(value) => EvalResult::new(verbatim(value)),
        None => {
            let missing = missing();
            tracing::debug!(?missing, "reference not resolvable yet");
            EvalResult::partial(Tree::Null, missing)
        }
    }
}

/// Everything a resolver lists, opened down to `depth`. Resolver data is
/// final and never read as workflow syntax.
fn listing(value: Tree, depth: i32) -> Result<EvalResult> {
    check_supported_deep(&value)?;
    Ok(EvalResult::new(verbatim_to(value, depth)))
}

fn nested_tree<V: Into<Tree>>(nested: BTreeMap<String, BTreeMap<String, V>>) -> Tree {
    Tree::Mapping(
        nested
            .into_iter()
            .map(|(outer, inner)| {
                let inner = inner.into_iter().map(|(k, v)| (k, v.into())).collect();
                (outer, Tree::Mapping(inner))
            })
            .collect(),
    )
}

struct Secrets(Arc<dyn SecretTypeResolver>);

impl Expandable for Secrets {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let all = self.0.resolve_all_secrets(ctx)?;
        listing(
            Tree::Mapping(all.into_iter().map(|(k, v)| (k, Tree::String(v))).collect()),
            depth,
        )
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Secrets {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let name = key_name("secrets", key)?;
        let value = self.0.resolve_secret(ctx, name)?.map(Tree::String);
        Ok(found(value, || Unresolvable::secret(name)))
    }
}

struct Parameters(Arc<dyn ParameterTypeResolver>);

impl Expandable for Parameters {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        listing(Tree::Mapping(self.0.resolve_all_parameters(ctx)?), depth)
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Parameters {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let name = key_name("parameters", key)?;
        let value = self.0.resolve_parameter(ctx, name)?;
        Ok(found(value, || Unresolvable::parameter(name)))
    }
}

struct Connections {
    resolver: Arc<dyn ConnectionTypeResolver>,
    connection_type: Option<String>,
}

impl Expandable for Connections {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let mut all = self.resolver.resolve_all_connections(ctx)?;
        let value = match &self.connection_type {
            None => nested_tree(all),
            Some(connection_type) => {
                Tree::Mapping(all.remove(connection_type).unwrap_or_default())
            }
        };
        listing(value, depth)
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Connections {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let name = key_name("connections", key)?;
        let Some(connection_type) = &self.connection_type else {
            return Ok(EvalResult::new(Tree::thunk(Connections {
                resolver: self.resolver.clone(),
                connection_type: Some(name.to_string()),
            })));
        };
        let value = self.resolver.resolve_connection(ctx, connection_type, name)?;
        Ok(found(value, || Unresolvable::connection(connection_type.as_str(), name)))
    }
}

struct Outputs {
    resolver: Arc<dyn OutputTypeResolver>,
    from: Option<String>,
}

impl Expandable for Outputs {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let mut all = self.resolver.resolve_all_outputs(ctx)?;
        let value = match &self.from {
            None => nested_tree(all),
            Some(from) => Tree::Mapping(all.remove(from).unwrap_or_default()),
        };
        listing(value, depth)
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Outputs {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let name = key_name("outputs", key)?;
        let Some(from) = &self.from else {
            return Ok(EvalResult::new(Tree::thunk(Outputs {
                resolver: self.resolver.clone(),
                from: Some(name.to_string()),
            })));
        };
        let value = self.resolver.resolve_output(ctx, from, name)?;
        Ok(found(value, || Unresolvable::output(from.as_str(), name)))
    }
}

struct Answers {
    resolver: Arc<dyn AnswerTypeResolver>,
    ask_ref: Option<String>,
}

impl Expandable for Answers {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let mut all = self.resolver.resolve_all_answers(ctx)?;
        let value = match &self.ask_ref {
            None => nested_tree(all),
            Some(ask_ref) => Tree::Mapping(all.remove(ask_ref).unwrap_or_default()),
        };
        listing(value, depth)
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Answers {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let name = key_name("answers", key)?;
        let Some(ask_ref) = &self.ask_ref else {
            return Ok(EvalResult::new(Tree::thunk(Answers {
                resolver: self.resolver.clone(),
                ask_ref: Some(name.to_string()),
            })));
        };
        let value = self.resolver.resolve_answer(ctx, ask_ref, name)?;
        Ok(found(value, || Unresolvable::answer(ask_ref.as_str(), name)))
    }
}

struct Statuses {
    resolver: Arc<dyn StatusTypeResolver>,
    name: Option<String>,
}

impl Expandable for Statuses {
    fn expand(&self, _ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let mut all = self.resolver.resolve_all_statuses(ctx)?;
        let value = match &self.name {
            None => nested_tree(all),
            Some(name) => Tree::Mapping(
                all.remove(name)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(property, value)| (property, Tree::Bool(value)))
                    .collect(),
            ),
        };
        listing(value, depth)
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }
}

impl Indexable for Statuses {
    fn index(&self, _ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult> {
        let key = key_name("status", key)?;
        let Some(name) = &self.name else {
            return Ok(EvalResult::new(Tree::thunk(Statuses {
                resolver: self.resolver.clone(),
                name: Some(key.to_string()),
            })));
        };
        let value = self.resolver.resolve_status(ctx, name, key)?.map(Tree::Bool);
        Ok(found(value, || Unresolvable::status(name.as_str(), key)))
    }
}
