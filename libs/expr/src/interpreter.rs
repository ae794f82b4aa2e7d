//! Tree-walking interpreter for parsed expressions
//!
//! Sub-terms evaluate to `Some(value)` or to `None` when they depend on
//! something that cannot be resolved yet. A pending term makes its parent
//! pending without raising a type error; the references involved are
//! collected on the interpreter as it goes.

use crate::ast::{CallArgs, Expr, LogicalOperator};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, DEPTH_FULL};
use crate::expand::{verbatim, Expandable};
use crate::functions::Arg;
use crate::operators;
use crate::result::EvalResult;
use crate::tree::{check_supported_deep, Tree};
use crate::unresolvable::Unresolvable;

/// Values an expression can name: `$` is always `root`, bare identifiers are
/// looked up in `current`.
#[derive(Clone, Debug)]
pub(crate) struct Scope {
    pub root: Tree,
    pub current: Tree,
}

impl Scope {
    pub(crate) fn new(root: Tree) -> Self {
        Scope {
            current: root.clone(),
            root,
        }
    }

    fn with_current(&self, current: Tree) -> Self {
        Scope {
            root: self.root.clone(),
            current,
        }
    }
}

pub(crate) struct Interpreter<'a> {
    ev: &'a Evaluator,
    ctx: &'a Context,
    unresolvable: Unresolvable,
}

impl<'a> Interpreter<'a> {
    /// Evaluate `expr` to a value that may still contain thunks.
    ///
    /// A not-found error raised after something was already found to be
    /// unresolvable is dropped: the miss is assumed to come from the missing
    /// data.
    pub(crate) fn run(
        ev: &'a Evaluator,
        ctx: &'a Context,
        expr: &Expr,
        scope: &Scope,
    ) -> Result<EvalResult> {
        let mut interpreter = Interpreter {
            ev,
            ctx,
            unresolvable: Unresolvable::default(),
        };

        match interpreter.eval(expr, scope) {
            Ok(Some(value)) => Ok(EvalResult::partial(value, interpreter.unresolvable)),
            Ok(None) => Ok(EvalResult::partial(Tree::Null, interpreter.unresolvable)),
            Err(err) if err.is_not_found() && !interpreter.unresolvable.is_empty() => {
                tracing::debug!(error = %err, "suppressing not-found error behind unresolvable references");
                Ok(EvalResult::partial(Tree::Null, interpreter.unresolvable))
            }
            Err(err) => Err(err),
        }
    }

    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Option<Tree>> {
        self.ctx.check()?;

        match expr {
            Expr::Literal(value) => Ok(Some(verbatim(value.clone()))),
            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                let mut pending = false;
                for item in items {
                    match self.eval(item, scope)? {
                        Some(value) => values.push(value),
                        None => pending = true,
                    }
                }
                Ok((!pending).then_some(Tree::Sequence(values)))
            }
            Expr::Object(fields) => {
                let mut values = std::collections::BTreeMap::new();
                let mut pending = false;
                for (key, value) in fields {
                    match self.eval(value, scope)? {
                        Some(value) => {
                            values.insert(key.clone(), value);
                        }
                        None => pending = true,
                    }
                }
                Ok((!pending).then_some(Tree::Mapping(values)))
            }
            Expr::Root => Ok(Some(scope.root.clone())),
            Expr::Variable(name) => self.lookup(&scope.current, &Tree::String(name.clone())),
            Expr::Member { target, name } => match self.eval(target, scope)? {
                Some(target) => self.lookup(&target, &Tree::String(name.clone())),
                None => Ok(None),
            },
            Expr::Index { target, index } => {
                let target = self.eval(target, scope)?;
                let index = self.force(index, scope)?;
                match (target, index) {
                    (Some(target), Some(index)) => self.lookup(&target, &index),
                    _ => Ok(None),
                }
            }
            Expr::Call { name, args } => self.call(name, args, scope),
            Expr::Unary { operator, operand } => match self.force(operand, scope)? {
                Some(value) => operators::unary(*operator, value).map(|v| Some(verbatim(v))),
                None => Ok(None),
            },
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.force(left, scope)?;
                let right = self.force(right, scope)?;
                match (left, right) {
                    (Some(left), Some(right)) => {
                        operators::binary(*operator, left, right).map(|v| Some(verbatim(v)))
                    }
                    _ => Ok(None),
                }
            }
            Expr::Logical {
                left,
                operator,
                right,
            } => self.logical(*operator, left, right, scope),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => match self.force(condition, scope)? {
                Some(Tree::Bool(true)) => self.eval(then, scope),
                Some(Tree::Bool(false)) => self.eval(otherwise, scope),
                Some(other) => Err(Error::Type(format!(
                    "condition must be boolean, got {}",
                    other.type_name()
                ))),
                None => Ok(None),
            },
            Expr::Pipe { source, target } => match self.eval(source, scope)? {
                Some(value) => self.eval(target, &scope.with_current(value)),
                None => Ok(None),
            },
        }
    }

    /// Evaluate a sub-term and then resolve its value completely.
    fn force(&mut self, expr: &Expr, scope: &Scope) -> Result<Option<Tree>> {
        match self.eval(expr, scope)? {
            Some(value) => {
                let result = self.ev.evaluate(self.ctx, &value, DEPTH_FULL)?;
                Ok(self.settle(result))
            }
            None => Ok(None),
        }
    }

    fn settle(&mut self, result: EvalResult) -> Option<Tree> {
        if result.complete() {
            Some(result.value)
        } else {
            self.unresolvable.extends(result.unresolvable);
            None
        }
    }

    fn logical(
        &mut self,
        operator: LogicalOperator,
        left: &Expr,
        right: &Expr,
        scope: &Scope,
    ) -> Result<Option<Tree>> {
        let Some(left) = self.force(left, scope)? else {
            return Ok(None);
        };

        match operator {
            LogicalOperator::Coalesce => {
                if left.is_null() {
                    self.eval(right, scope)
                } else {
                    Ok(Some(verbatim(left)))
                }
            }
            LogicalOperator::And | LogicalOperator::Or => {
                let Tree::Bool(left) = left else {
                    return Err(Error::Type(format!(
                        "operator {} requires boolean operands, got {}",
                        logical_symbol(operator),
                        left.type_name()
                    )));
                };
                // Short-circuit
                if left == (operator == LogicalOperator::Or) {
                    return Ok(Some(Tree::Bool(left)));
                }
                match self.force(right, scope)? {
                    Some(Tree::Bool(right)) => Ok(Some(Tree::Bool(right))),
                    Some(other) => Err(Error::Type(format!(
                        "operator {} requires boolean operands, got {}",
                        logical_symbol(operator),
                        other.type_name()
                    ))),
                    None => Ok(None),
                }
            }
        }
    }

    /// `target[key]` or `target.key`.
    fn lookup(&mut self, target: &Tree, key: &Tree) -> Result<Option<Tree>> {
        if let Some(result) = self.index(target, key)? {
            return Ok(self.settle(result));
        }

        let result = self.ev.evaluate(self.ctx, target, 1)?;
        let Some(target) = self.settle(result) else {
            return Ok(None);
        };

        // Final values can come back sealed from a one-level evaluation.
        if let Some(result) = self.index(&target, key)? {
            return Ok(self.settle(result));
        }
        target.child(key).map(Some)
    }

    fn index(&self, target: &Tree, key: &Tree) -> Result<Option<EvalResult>> {
        match target {
            Tree::Thunk(thunk) => thunk
                .expandable()
                .as_indexable()
                .map(|indexable| indexable.index(self.ev, self.ctx, key))
                .transpose(),
            _ => Ok(None),
        }
    }

    fn call(&mut self, name: &str, args: &CallArgs, scope: &Scope) -> Result<Option<Tree>> {
        let Some(descriptor) = self.ev.functions().descriptor(name) else {
            tracing::debug!(function = %name, "function not found");
            self.unresolvable
                .extends(Unresolvable::invocation(name, Error::FunctionNotFound));
            return Ok(None);
        };

        let invoker = match args {
            CallArgs::Positional(exprs) => {
                let args = exprs.iter().map(|expr| self.arg(expr, scope)).collect();
                descriptor.positional_invoker(args)
            }
            CallArgs::Keyword(fields) => {
                let args = fields
                    .iter()
                    .map(|(key, expr)| (key.clone(), self.arg(expr, scope)))
                    .collect();
                descriptor.keyword_invoker(args)
            }
        }
        .map_err(|err| Error::invocation(name, err))?;

        let result = invoker
            .invoke(self.ctx)
            .map_err(|err| Error::invocation(name, err))?;
        if result.complete() {
            check_supported_deep(&result.value)?;
        }
        Ok(self.settle(result).map(verbatim))
    }

    fn arg(&self, expr: &Expr, scope: &Scope) -> Arg<'a> {
        Arg::new(
            self.ev,
            Tree::thunk(ExprThunk {
                expr: expr.clone(),
                scope: scope.clone(),
            }),
        )
    }
}

fn logical_symbol(operator: LogicalOperator) -> &'static str {
    match operator {
        LogicalOperator::And => "&&",
        LogicalOperator::Or => "||",
        LogicalOperator::Coalesce => "??",
    }
}

/// An unevaluated sub-expression together with the scope it was written in.
/// Function arguments are passed this way.
struct ExprThunk {
    expr: Expr,
    scope: Scope,
}

impl Expandable for ExprThunk {
    fn expand(&self, ev: &Evaluator, ctx: &Context, depth: i32) -> Result<EvalResult> {
        let result = Interpreter::run(ev, ctx, &self.expr, &self.scope)?;
        if !result.complete() {
            return Ok(result);
        }
        ev.evaluate(ctx, &result.value, depth)
    }
}
