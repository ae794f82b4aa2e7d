//! Depth-bounded tree evaluation
//!
//! The [`Evaluator`] walks a tree, expanding thunks and rebuilding sequences
//! itself, and hands mappings and strings to a [`Visitor`]. The default
//! visitor hooks walk mappings generically and leave strings alone;
//! [`WorkflowVisitor`](crate::workflow::WorkflowVisitor) overrides both.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::cache::{ExpressionCache, DEFAULT_CAPACITY};
use crate::context::Context;
use crate::error::Result;
use crate::functions::FunctionMap;
use crate::result::EvalResult;
use crate::tree::{check_supported, Tree};
use crate::unresolvable::Unresolvable;

/// Evaluate the whole tree, however deep.
pub const DEPTH_FULL: i32 = -1;

/// Override hooks for the shapes whose meaning depends on the dialect being
/// evaluated.
pub trait Visitor: Send + Sync {
    fn visit_mapping(
        &self,
        ev: &Evaluator,
        ctx: &Context,
        mapping: &BTreeMap<String, Tree>,
        depth: i32,
    ) -> Result<EvalResult> {
        ev.walk_mapping(ctx, mapping, depth)
    }

    fn visit_string(&self, ev: &Evaluator, ctx: &Context, s: &str, depth: i32) -> Result<EvalResult> {
        let _ = (ev, ctx, depth);
        Ok(EvalResult::new(Tree::String(s.to_string())))
    }
}

/// Visitor with no special shapes at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultVisitor;

impl Visitor for DefaultVisitor {}

pub struct Evaluator {
    visitor: Arc<dyn Visitor>,
    functions: FunctionMap,
    cache: ExpressionCache,
}

impl Evaluator {
    pub fn new(
        visitor: impl Visitor + 'static,
        functions: FunctionMap,
        cache_capacity: NonZeroUsize,
    ) -> Self {
        Self {
            visitor: Arc::new(visitor),
            functions,
            cache: ExpressionCache::new(cache_capacity),
        }
    }

    /// An evaluator that only expands thunks and rebuilds containers. Path
    /// queries run against it see no functions.
    pub fn generic() -> Self {
        Self::new(DefaultVisitor, FunctionMap::new(), DEFAULT_CAPACITY)
    }

    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    pub(crate) fn cache(&self) -> &ExpressionCache {
        &self.cache
    }

    /// Evaluate `tree` to `depth` levels.
    ///
    /// * `-1` evaluates everything.
    /// * `0` returns the tree unchanged.
    /// * `n > 0` resolves this node and descends at most `n - 1` more levels.
    pub fn evaluate(&self, ctx: &Context, tree: &Tree, depth: i32) -> Result<EvalResult> {
        if depth == 0 {
            return Ok(EvalResult::new(tree.clone()));
        }
        ctx.check()?;
        tracing::trace!(depth, kind = tree.type_name(), "visiting node");

        let result = match tree {
            Tree::Thunk(thunk) => thunk.expandable().expand(self, ctx, depth)?,
            Tree::Sequence(items) => self.walk_sequence(ctx, items, depth)?,
            Tree::Mapping(fields) => self.visitor.visit_mapping(self, ctx, fields, depth)?,
            Tree::String(s) => self.visitor.visit_string(self, ctx, s, depth)?,
            other => EvalResult::new(other.clone()),
        };

        check_supported(&result.value)?;
        Ok(result)
    }

    /// Evaluate `tree` completely.
    pub fn evaluate_all(&self, ctx: &Context, tree: &Tree) -> Result<EvalResult> {
        self.evaluate(ctx, tree, DEPTH_FULL)
    }

    /// Generic sequence walk: every element one level down.
    pub fn walk_sequence(&self, ctx: &Context, items: &[Tree], depth: i32) -> Result<EvalResult> {
        let child_depth = next_depth(depth);
        let mut unresolvable = Unresolvable::default();
        let mut values = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let result = self
                .evaluate(ctx, item, child_depth)
                .map_err(|err| err.at_index(index))?;
            unresolvable.extends(result.unresolvable);
            values.push(result.value);
        }

        Ok(EvalResult::partial(Tree::Sequence(values), unresolvable))
    }

    /// Generic mapping walk: every value one level down, keys untouched.
    pub fn walk_mapping(
        &self,
        ctx: &Context,
        mapping: &BTreeMap<String, Tree>,
        depth: i32,
    ) -> Result<EvalResult> {
        let child_depth = next_depth(depth);
        let mut unresolvable = Unresolvable::default();
        let mut fields = BTreeMap::new();

        for (key, value) in mapping {
            let result = self
                .evaluate(ctx, value, child_depth)
                .map_err(|err| err.at_key(key.as_str()))?;
            unresolvable.extends(result.unresolvable);
            fields.insert(key.clone(), result.value);
        }

        Ok(EvalResult::partial(Tree::Mapping(fields), unresolvable))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::generic()
    }
}

/// Depth for the children of a node evaluated at `depth`.
pub(crate) fn next_depth(depth: i32) -> i32 {
    if depth < 0 {
        depth
    } else {
        depth - 1
    }
}
