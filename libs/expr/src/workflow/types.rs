//! `$type` references

use std::collections::BTreeMap;

use super::WorkflowVisitor;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::expand::verbatim;
use crate::query::Language;
use crate::result::EvalResult;
use crate::tree::{check_supported_deep, Tree};
use crate::unresolvable::Unresolvable;

/// Resolve a type reference. `None` for type names this dialect does not
/// know; those mappings are walked like any other.
pub(super) fn visit(
    visitor: &WorkflowVisitor,
    ev: &Evaluator,
    ctx: &Context,
    type_name: &str,
    mapping: &BTreeMap<String, Tree>,
) -> Result<Option<EvalResult>> {
    let mut fields = Fields::new(ev, ctx, mapping);
    let result = match type_name {
        "Secret" => secret(visitor, ctx, &mut fields),
        "Connection" => connection(visitor, ctx, &mut fields),
        "Output" => output(visitor, ctx, &mut fields),
        "Parameter" => parameter(visitor, ctx, &mut fields),
        "Answer" => answer(visitor, ctx, &mut fields),
        "Data" => data(visitor, ev, ctx, &mut fields),
        _ => return Ok(None),
    };
    result
        .map(Some)
        .map_err(|err| Error::invalid_type(type_name, err))
}

/// Reads the string fields of a type reference, evaluating each one fully.
///
/// A field that cannot be resolved reads as `None` and is recorded; the
/// evaluated fields are kept so a partial result can carry them.
struct Fields<'a> {
    ev: &'a Evaluator,
    ctx: &'a Context,
    evaluated: BTreeMap<String, Tree>,
    unresolvable: Unresolvable,
}

impl<'a> Fields<'a> {
    fn new(ev: &'a Evaluator, ctx: &'a Context, mapping: &BTreeMap<String, Tree>) -> Self {
        Fields {
            ev,
            ctx,
            evaluated: mapping.clone(),
            unresolvable: Unresolvable::default(),
        }
    }

    fn required(&mut self, name: &str) -> Result<Option<String>> {
        if !self.evaluated.contains_key(name) {
            return Err(Error::MissingField {
                field: name.to_string(),
            });
        }
        self.optional(name)
    }

    fn optional(&mut self, name: &str) -> Result<Option<String>> {
        let Some(tree) = self.evaluated.get(name) else {
            return Ok(None);
        };

        let result = self
            .ev
            .evaluate_all(self.ctx, tree)
            .map_err(|err| err.at_key(name))?;
        let complete = result.complete();
        self.unresolvable.extends(result.unresolvable);
        self.evaluated.insert(name.to_string(), result.value.clone());
        if !complete {
            return Ok(None);
        }

        match result.value {
            Tree::String(s) => Ok(Some(s)),
            other => Err(Error::unexpected_type(&["string"], other.type_name())),
        }
    }

    /// The partial result to return when some field was unresolvable.
    fn incomplete(&mut self) -> Option<EvalResult> {
        if self.unresolvable.is_empty() {
            return None;
        }
        Some(EvalResult::partial(
            self.placeholder(),
            std::mem::take(&mut self.unresolvable),
        ))
    }

    fn placeholder(&self) -> Tree {
        Tree::Mapping(self.evaluated.clone())
    }

    /// Turn a resolver answer into a result.
    fn settle(&self, found: Option<Tree>, missing: Unresolvable) -> Result<EvalResult> {
        match found {
            Some(value) => {
                check_supported_deep(&value)?;
                Ok(EvalResult::new(value))
            }
            None => {
                tracing::debug!(?missing, "reference not resolvable yet");
                Ok(EvalResult::partial(self.placeholder(), missing))
            }
        }
    }
}

fn secret(visitor: &WorkflowVisitor, ctx: &Context, fields: &mut Fields<'_>) -> Result<EvalResult> {
    let name = fields.required("name")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let name = name.unwrap_or_default();

    let found = visitor
        .options()
        .secret_resolver()
        .resolve_secret(ctx, &name)?
        .map(Tree::String);
    fields.settle(found, Unresolvable::secret(name))
}

fn connection(visitor: &WorkflowVisitor, ctx: &Context, fields: &mut Fields<'_>) -> Result<EvalResult> {
    let connection_type = fields.required("type")?;
    let name = fields.required("name")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let connection_type = connection_type.unwrap_or_default();
    let name = name.unwrap_or_default();

    let found = visitor
        .options()
        .connection_resolver()
        .resolve_connection(ctx, &connection_type, &name)?;
    fields.settle(found, Unresolvable::connection(connection_type, name))
}

fn output(visitor: &WorkflowVisitor, ctx: &Context, fields: &mut Fields<'_>) -> Result<EvalResult> {
    // `taskName` is the older spelling of `from`.
    let from = if fields.evaluated.contains_key("from") {
        fields.required("from")?
    } else if fields.evaluated.contains_key("taskName") {
        fields.required("taskName")?
    } else {
        return Err(Error::MissingField {
            field: "from".into(),
        });
    };
    let name = fields.required("name")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let from = from.unwrap_or_default();
    let name = name.unwrap_or_default();

    let found = visitor
        .options()
        .output_resolver()
        .resolve_output(ctx, &from, &name)?;
    fields.settle(found, Unresolvable::output(from, name))
}

fn parameter(visitor: &WorkflowVisitor, ctx: &Context, fields: &mut Fields<'_>) -> Result<EvalResult> {
    let name = fields.required("name")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let name = name.unwrap_or_default();

    let found = visitor
        .options()
        .parameter_resolver()
        .resolve_parameter(ctx, &name)?;
    fields.settle(found, Unresolvable::parameter(name))
}

fn answer(visitor: &WorkflowVisitor, ctx: &Context, fields: &mut Fields<'_>) -> Result<EvalResult> {
    let ask_ref = fields.required("askRef")?;
    let name = fields.required("name")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let ask_ref = ask_ref.unwrap_or_default();
    let name = name.unwrap_or_default();

    let found = visitor
        .options()
        .answer_resolver()
        .resolve_answer(ctx, &ask_ref, &name)?;
    fields.settle(found, Unresolvable::answer(ask_ref, name))
}

fn data(
    visitor: &WorkflowVisitor,
    ev: &Evaluator,
    ctx: &Context,
    fields: &mut Fields<'_>,
) -> Result<EvalResult> {
    let name = fields.optional("name")?;
    let query = fields.required("query")?;
    if let Some(partial) = fields.incomplete() {
        return Ok(partial);
    }
    let query = query.unwrap_or_default();

    let options = visitor.options();
    let name = match name.filter(|name| !name.is_empty()) {
        Some(name) => name,
        None => options.default_data_resolver_name().unwrap_or_default().to_string(),
    };
    let resolver = options
        .data_resolver(&name)
        .ok_or_else(|| Error::DataResolverNotFound { name: name.clone() })?;

    let Some(document) = resolver.resolve_data(ctx)? else {
        return fields.settle(None, Unresolvable::data(name));
    };

    let result = ev.evaluate_query(ctx, &verbatim(document), Language::Path, &query)?;
    if !result.complete() {
        tracing::debug!(data = %name, query = %query, "data query is incomplete");
        return Ok(EvalResult::partial(fields.placeholder(), result.unresolvable));
    }
    check_supported_deep(&result.value)?;
    Ok(result)
}
