//! Capabilities of lazy handles stored in [`Tree::Thunk`](crate::Tree::Thunk)

use crate::context::Context;
use crate::error::Result;
use crate::evaluator::{next_depth, Evaluator};
use crate::result::EvalResult;
use crate::tree::{check_supported_deep, Tree};

/// A value that materializes on demand.
///
/// `depth` follows [`Evaluator::evaluate`]: `-1` expands fully, `n > 0`
/// descends at most `n` levels. Implementations are never called with depth
/// zero.
pub trait Expandable: Send + Sync {
    fn expand(&self, ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult>;

    /// Per-key access without materializing the whole value.
    fn as_indexable(&self) -> Option<&dyn Indexable> {
        None
    }

    /// The value behind this handle when it is already final. Such a value
    /// is navigated as it stands and never handed to a visitor.
    fn settled(&self) -> Option<&Tree> {
        None
    }
}

/// Keyed traversal with per-key unresolvable reporting, used for resolver
/// namespaces such as `secrets.foo` or `connections.aws.prod`.
pub trait Indexable: Send + Sync {
    fn index(&self, ev: &Evaluator, ctx: &Context, key: &Tree) -> Result<EvalResult>;
}

/// Data that is final as it stands: a value handed out by a resolver or
/// computed by an expression. Expanding it never consults the visitor, so
/// strings containing `${` and keys such as `$type` stay literal.
struct Verbatim(Tree);

/// Wrap `value` so that later evaluation passes it through untouched.
pub(crate) fn verbatim(value: Tree) -> Tree {
    match value {
        Tree::String(_) | Tree::Sequence(_) | Tree::Mapping(_) => Tree::thunk(Verbatim(value)),
        other => other,
    }
}

/// `value` as evaluating it to `depth` leaves it: containers open down to
/// `depth` levels and everything below stays wrapped. A mapping with
/// `$`-prefixed keys reads as syntax when walked, so it stays sealed.
pub(crate) fn verbatim_to(value: Tree, depth: i32) -> Tree {
    if depth < 0 {
        return value;
    }
    if depth == 0 || has_directives(&value) {
        return verbatim(value);
    }
    open(value, depth)
}

/// One level of `value` opened, its children wrapped below `depth`.
pub(crate) fn open(value: Tree, depth: i32) -> Tree {
    let child_depth = next_depth(depth);
    match value {
        Tree::Sequence(items) => Tree::Sequence(
            items
                .into_iter()
                .map(|item| verbatim_to(item, child_depth))
                .collect(),
        ),
        Tree::Mapping(fields) => Tree::Mapping(
            fields
                .into_iter()
                .map(|(key, value)| (key, verbatim_to(value, child_depth)))
                .collect(),
        ),
        other => other,
    }
}

fn has_directives(value: &Tree) -> bool {
    matches!(value, Tree::Mapping(fields) if fields.keys().any(|key| key.starts_with('$')))
}

impl Expandable for Verbatim {
    fn expand(&self, _ev: &Evaluator, _ctx: &Context, depth: i32) -> Result<EvalResult> {
        check_supported_deep(&self.0)?;
        Ok(EvalResult::new(verbatim_to(self.0.clone(), depth)))
    }

    fn as_indexable(&self) -> Option<&dyn Indexable> {
        Some(self)
    }

    fn settled(&self) -> Option<&Tree> {
        Some(&self.0)
    }
}

impl Indexable for Verbatim {
    fn index(&self, _ev: &Evaluator, _ctx: &Context, key: &Tree) -> Result<EvalResult> {
        Ok(EvalResult::new(verbatim(self.0.child(key)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verbatim_values_skip_the_visitor() {
        let ev = crate::workflow::evaluator(crate::Options::default());
        let value = Tree::from(json!({"$type": "Secret", "name": "token", "note": "${nope}"}));
        let result = ev.evaluate_all(&Context::new(), &verbatim(value.clone())).unwrap();
        assert!(result.complete());
        assert_eq!(result.value, value);
    }

    #[test]
    fn test_verbatim_to_wraps_below_depth() {
        let value = Tree::from(json!({"a": {"b": "${x}"}, "n": 1}));
        let Tree::Mapping(fields) = verbatim_to(value.clone(), 1) else {
            panic!("expected a mapping");
        };
        assert!(matches!(fields["a"], Tree::Thunk(_)));
        assert_eq!(fields["n"], Tree::from(1_i64));
        assert_eq!(verbatim_to(value.clone(), -1), value);
    }

    #[test]
    fn test_verbatim_to_seals_directive_mappings() {
        let value = Tree::from(json!({"$fn.concat": ["a", "b"]}));
        let Tree::Thunk(thunk) = verbatim_to(value.clone(), 2) else {
            panic!("expected a sealed value");
        };
        assert_eq!(thunk.expandable().settled(), Some(&value));
        assert!(matches!(open(value, 2), Tree::Mapping(_)));
    }

    #[test]
    fn test_verbatim_index_keeps_lookup_errors() {
        let ev = Evaluator::generic();
        let value = Verbatim(Tree::from(json!({"a": [1]})));
        let child = value.index(&ev, &Context::new(), &Tree::from("a")).unwrap();
        assert!(matches!(child.value, Tree::Thunk(_)));
        assert!(value
            .index(&ev, &Context::new(), &Tree::from("missing"))
            .unwrap_err()
            .is_not_found());
    }
}
