//! JSONPath selection over lazily evaluated trees
//!
//! Every node is evaluated one level before its children are selected, so a
//! path only forces the part of the document it actually visits. Nodes that
//! cannot be resolved are skipped and recorded.

use std::cmp::Ordering;

use weft_jsonpath::{Comparator, Filter, Literal, Path, Segment, Selector, Template, TemplatePart};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::expand::open;
use crate::functions::strings::stringify;
use crate::result::EvalResult;
use crate::tree::{Number, Tree};
use crate::unresolvable::Unresolvable;

pub(super) fn evaluate_path(
    ev: &Evaluator,
    ctx: &Context,
    tree: &Tree,
    path: &Path,
) -> Result<EvalResult> {
    let mut selection = Selection::new(ev, ctx);
    let nodes = selection.select(tree.clone(), path)?;
    if !selection.unresolvable.is_empty() {
        return Ok(EvalResult::partial(Tree::Null, selection.unresolvable));
    }

    if path.is_definite() {
        match nodes.into_iter().next() {
            Some(node) => ev.evaluate_all(ctx, &node),
            None => Err(Error::PathNotFound("no value at JSONPath".into())),
        }
    } else {
        ev.evaluate_all(ctx, &Tree::Sequence(nodes))
    }
}

pub(super) fn render_template(
    ev: &Evaluator,
    ctx: &Context,
    tree: &Tree,
    template: &Template,
) -> Result<EvalResult> {
    let mut selection = Selection::new(ev, ctx);
    let mut out = String::new();

    match selection.render(&template.parts, tree, &mut out) {
        Ok(()) if selection.unresolvable.is_empty() => Ok(EvalResult::new(Tree::String(out))),
        Ok(()) => Ok(EvalResult::partial(Tree::Null, selection.unresolvable)),
        Err(err) if err.is_not_found() && !selection.unresolvable.is_empty() => {
            tracing::debug!(error = %err, "suppressing not-found error behind unresolvable references");
            Ok(EvalResult::partial(Tree::Null, selection.unresolvable))
        }
        Err(err) => Err(err),
    }
}

struct Selection<'a> {
    ev: &'a Evaluator,
    ctx: &'a Context,
    unresolvable: Unresolvable,
}

impl<'a> Selection<'a> {
    fn new(ev: &'a Evaluator, ctx: &'a Context) -> Self {
        Selection {
            ev,
            ctx,
            unresolvable: Unresolvable::default(),
        }
    }

    /// Evaluate one level, or record why that is not possible yet.
    fn materialize(&mut self, node: &Tree) -> Result<Option<Tree>> {
        let result = self.ev.evaluate(self.ctx, node, 1)?;
        if !result.complete() {
            self.unresolvable.extends(result.unresolvable);
            return Ok(None);
        }
        let settled = match &result.value {
            Tree::Thunk(thunk) => thunk.expandable().settled().cloned(),
            _ => None,
        };
        match settled {
            Some(value) => Ok(Some(open(value, 1))),
            None => Ok(Some(result.value)),
        }
    }

    fn resolve(&mut self, node: &Tree) -> Result<Option<Tree>> {
        let result = self.ev.evaluate_all(self.ctx, node)?;
        if result.complete() {
            Ok(Some(result.value))
        } else {
            self.unresolvable.extends(result.unresolvable);
            Ok(None)
        }
    }

    fn select(&mut self, start: Tree, path: &Path) -> Result<Vec<Tree>> {
        let mut nodes = vec![start];
        for segment in &path.segments {
            let mut next = Vec::new();
            for node in nodes {
                match segment {
                    Segment::Child(selector) => self.apply(&node, selector, &mut next)?,
                    Segment::Descendant(selector) => {
                        let mut subtree = Vec::new();
                        self.descendants(node, &mut subtree)?;
                        for candidate in subtree {
                            self.apply(&candidate, selector, &mut next)?;
                        }
                    }
                }
            }
            nodes = next;
        }
        Ok(nodes)
    }

    /// The node followed by all of its descendants, depth first. Nodes are
    /// collected as given; only their children come from the evaluated form.
    fn descendants(&mut self, node: Tree, out: &mut Vec<Tree>) -> Result<()> {
        let Some(materialized) = self.materialize(&node)? else {
            return Ok(());
        };
        let children = children(&materialized);
        out.push(node);
        for child in children {
            self.descendants(child, out)?;
        }
        Ok(())
    }

    fn apply(&mut self, node: &Tree, selector: &Selector, out: &mut Vec<Tree>) -> Result<()> {
        let Some(node) = self.materialize(node)? else {
            return Ok(());
        };
        self.pick(&node, selector, out)
    }

    /// Apply `selector` to a node that is already materialized.
    fn pick(&mut self, node: &Tree, selector: &Selector, out: &mut Vec<Tree>) -> Result<()> {
        match selector {
            Selector::Name(name) => {
                if let Some(child) = node.get(name) {
                    out.push(child.clone());
                }
            }
            Selector::Index(index) => {
                if let Tree::Sequence(items) = node {
                    let index = if *index < 0 {
                        items.len() as i64 + index
                    } else {
                        *index
                    };
                    if let Some(item) = usize::try_from(index).ok().and_then(|i| items.get(i)) {
                        out.push(item.clone());
                    }
                }
            }
            Selector::Wildcard => out.extend(children(node)),
            Selector::Slice { start, end, step } => {
                if let Tree::Sequence(items) = node {
                    for i in slice_indices(items.len(), *start, *end, *step) {
                        out.push(items[i].clone());
                    }
                }
            }
            Selector::Union(selectors) => {
                for selector in selectors {
                    self.pick(node, selector, out)?;
                }
            }
            Selector::Filter(filter) => {
                for child in children(node) {
                    if self.matches(&child, filter)? {
                        out.push(child);
                    }
                }
            }
        }
        Ok(())
    }

    fn matches(&mut self, candidate: &Tree, filter: &Filter) -> Result<bool> {
        let found = self.select(candidate.clone(), &filter.path)?;
        let Some((comparator, literal)) = &filter.comparison else {
            return Ok(!found.is_empty());
        };

        let expected = literal_tree(literal);
        for value in found {
            let Some(value) = self.resolve(&value)? else {
                continue;
            };
            if compare(&value, *comparator, &expected) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn render(&mut self, parts: &[TemplatePart], current: &Tree, out: &mut String) -> Result<()> {
        for part in parts {
            match part {
                TemplatePart::Text(text) => out.push_str(text),
                TemplatePart::Path(path) => {
                    let nodes = self.select(current.clone(), path)?;
                    if nodes.is_empty() && path.is_definite() {
                        return Err(Error::PathNotFound("no value at JSONPath".into()));
                    }
                    let mut first = true;
                    for node in nodes {
                        let Some(value) = self.resolve(&node)? else {
                            continue;
                        };
                        if !first {
                            out.push(' ');
                        }
                        out.push_str(&stringify(&value)?);
                        first = false;
                    }
                }
                TemplatePart::Range { path, body } => {
                    for node in self.select(current.clone(), path)? {
                        self.render(body, &node, out)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn children(node: &Tree) -> Vec<Tree> {
    match node {
        Tree::Sequence(items) => items.clone(),
        Tree::Mapping(fields) => fields.values().cloned().collect(),
        _ => Vec::new(),
    }
}

fn slice_indices(len: usize, start: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<usize> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    let normalize = |i: i64| if i < 0 { len + i } else { i };
    let mut indices = Vec::new();

    if step > 0 {
        let mut i = start.map(normalize).unwrap_or(0).clamp(0, len);
        let end = end.map(normalize).unwrap_or(len).clamp(0, len);
        while i < end {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else if step < 0 {
        let mut i = start.map(normalize).unwrap_or(len - 1).clamp(-1, len - 1);
        let end = end.map(normalize).unwrap_or(-1).clamp(-1, len - 1);
        while i > end {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    indices
}

fn literal_tree(literal: &Literal) -> Tree {
    match literal {
        Literal::Null => Tree::Null,
        Literal::Bool(b) => Tree::Bool(*b),
        Literal::Number(n) => Tree::Number(Number::Float(*n)),
        Literal::String(s) => Tree::String(s.clone()),
    }
}

/// Filter comparison. Values of different kinds never order.
fn compare(value: &Tree, comparator: Comparator, expected: &Tree) -> bool {
    match comparator {
        Comparator::Equal => return value == expected,
        Comparator::NotEqual => return value != expected,
        _ => {}
    }

    let ordering = match (value, expected) {
        (Tree::Number(a), Tree::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Tree::String(a), Tree::String(b)) => Some(a.cmp(b)),
        _ => None,
    };
    match (ordering, comparator) {
        (Some(ordering), Comparator::Less) => ordering == Ordering::Less,
        (Some(ordering), Comparator::LessOrEqual) => ordering != Ordering::Greater,
        (Some(ordering), Comparator::Greater) => ordering == Ordering::Greater,
        (Some(ordering), Comparator::GreaterOrEqual) => ordering != Ordering::Less,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_indices() {
        assert_eq!(slice_indices(5, Some(1), Some(4), None), vec![1, 2, 3]);
        assert_eq!(slice_indices(5, None, None, Some(2)), vec![0, 2, 4]);
        assert_eq!(slice_indices(5, Some(-2), None, None), vec![3, 4]);
        assert_eq!(slice_indices(4, None, None, Some(-1)), vec![3, 2, 1, 0]);
        assert!(slice_indices(3, Some(5), Some(9), None).is_empty());
        assert_eq!(slice_indices(5, Some(1), Some(5), Some(i64::MAX)), vec![1]);
        assert_eq!(slice_indices(5, None, None, Some(i64::MIN)), vec![4]);
        assert_eq!(slice_indices(3, Some(i64::MIN), Some(i64::MAX), None), vec![0, 1, 2]);
    }

    #[test]
    fn test_filter_comparison() {
        assert!(compare(&Tree::from(3_i64), Comparator::Equal, &Tree::from(3.0)));
        assert!(compare(&Tree::from(3_i64), Comparator::Less, &Tree::from(3.5)));
        assert!(!compare(&Tree::from("3"), Comparator::Less, &Tree::from(4.0)));
    }
}
