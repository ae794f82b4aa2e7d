//! Evaluation results

use crate::tree::Tree;
use crate::unresolvable::Unresolvable;

/// A value paired with everything that kept it from being fully resolved.
///
/// When `unresolvable` is non-empty, `value` is the original sub-tree (or the
/// deepest substitute that could be produced) so the same tree can be
/// evaluated again once more references become available.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EvalResult {
    pub value: Tree,
    pub unresolvable: Unresolvable,
}

impl EvalResult {
    pub fn new(value: Tree) -> Self {
        EvalResult {
            value,
            unresolvable: Unresolvable::default(),
        }
    }

    pub fn partial(value: Tree, unresolvable: Unresolvable) -> Self {
        EvalResult {
            value,
            unresolvable,
        }
    }

    /// True when nothing is missing.
    pub fn complete(&self) -> bool {
        self.unresolvable.is_empty()
    }

    pub fn extends(&mut self, other: Unresolvable) {
        self.unresolvable.extends(other);
    }

    pub fn into_parts(self) -> (Tree, Unresolvable) {
        (self.value, self.unresolvable)
    }
}

impl From<Tree> for EvalResult {
    fn from(value: Tree) -> Self {
        EvalResult::new(value)
    }
}
