//! Decoding evaluated trees into Rust types

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::tree::Tree;
use crate::unresolvable::Unresolvable;

impl Evaluator {
    /// Evaluate `tree` and deserialize it into `T`.
    ///
    /// Plain mappings are walked one level at a time. Any field that cannot
    /// be fully resolved is left out of the decoded document, so the target
    /// type needs `#[serde(default)]` (or an `Option`) on fields that may be
    /// pending. Everything that was left out is returned alongside.
    ///
    /// ```rust
    /// use serde::Deserialize;
    /// use serde_json::json;
    /// use weft_expr::{workflow, Context, Options, Tree};
    ///
    /// #[derive(Deserialize)]
    /// struct Step {
    ///     image: String,
    ///     #[serde(default)]
    ///     token: Option<String>,
    /// }
    ///
    /// let ev = workflow::evaluator(Options::default());
    /// let spec = Tree::from(json!({
    ///     "image": "alpine",
    ///     "token": {"$type": "Secret", "name": "token"},
    /// }));
    /// let (step, unresolvable): (Step, _) = ev.evaluate_into(&Context::new(), &spec).unwrap();
    /// assert_eq!(step.image, "alpine");
    /// assert!(step.token.is_none());
    /// assert_eq!(unresolvable.secrets.len(), 1);
    /// ```
    pub fn evaluate_into<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        tree: &Tree,
    ) -> Result<(T, Unresolvable)> {
        let mut unresolvable = Unresolvable::default();
        let value = prune(self, ctx, tree, &mut unresolvable)?
            .unwrap_or_else(|| Tree::Mapping(BTreeMap::new()));

        if !unresolvable.is_empty() {
            tracing::debug!(missing = unresolvable.len(), "decoding without pending fields");
        }
        let decoded = serde_json::from_value(value.to_json()?)?;
        Ok((decoded, unresolvable))
    }
}

/// The fully evaluated tree with every pending node left out; `None` when
/// `tree` itself is pending.
fn prune(
    ev: &Evaluator,
    ctx: &Context,
    tree: &Tree,
    unresolvable: &mut Unresolvable,
) -> Result<Option<Tree>> {
    if let Tree::Mapping(fields) = tree {
        let shallow = ev.evaluate(ctx, tree, 1)?;
        if !shallow.complete() {
            unresolvable.extends(shallow.unresolvable);
            return Ok(None);
        }

        // A plain mapping comes back untouched from a one-level walk; anything
        // else was given meaning by the visitor and is evaluated as a whole.
        if shallow.value == *tree {
            let mut kept = BTreeMap::new();
            for (key, value) in fields {
                let pruned = prune(ev, ctx, value, unresolvable).map_err(|err| err.at_key(key.as_str()))?;
                if let Some(value) = pruned {
                    kept.insert(key.clone(), value);
                }
            }
            return Ok(Some(Tree::Mapping(kept)));
        }
    }

    let result = ev.evaluate_all(ctx, tree)?;
    if result.complete() {
        Ok(Some(result.value))
    } else {
        unresolvable.extends(result.unresolvable);
        Ok(None)
    }
}
