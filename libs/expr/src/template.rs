//! String templates with embedded `${...}` expressions
//!
//! The end of an embedded expression is found by lexing it, so braces inside
//! string literals and object literals do not terminate it early. `$${`
//! produces a literal `${`.

use crate::ast::Expr;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, DEPTH_FULL};
use crate::functions::strings::stringify;
use crate::interpreter::{Interpreter, Scope};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::result::EvalResult;
use crate::token::TokenType;
use crate::tree::Tree;
use crate::unresolvable::Unresolvable;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expression { source: String, expr: Expr },
}

/// A parsed template string
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let chars: Vec<char> = source.chars().collect();
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < chars.len() {
            if starts_with(&chars, i, "$${") {
                text.push_str("${");
                i += 3;
                continue;
            }
            if !starts_with(&chars, i, "${") {
                text.push(chars[i]);
                i += 1;
                continue;
            }

            let start = i + 2;
            let end = start + expression_length(&chars[start..])?;
            let expression: String = chars[start..end].iter().collect();
            let expr = Parser::new(&expression).parse()?;

            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(Segment::Expression {
                source: expression,
                expr,
            });
            i = end + 1;
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Template {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when a single `${...}` spans the whole string, in which case
    /// evaluation returns the typed value instead of a string.
    pub fn is_single_expression(&self) -> bool {
        matches!(self.segments.as_slice(), [Segment::Expression { .. }])
    }

    pub(crate) fn evaluate(
        &self,
        ev: &Evaluator,
        ctx: &Context,
        scope: &Scope,
        depth: i32,
    ) -> Result<EvalResult> {
        if let [Segment::Expression { expr, .. }] = self.segments.as_slice() {
            let result = Interpreter::run(ev, ctx, expr, scope)?;
            if !result.complete() {
                return Ok(self.unresolved(result.unresolvable));
            }
            let result = ev.evaluate(ctx, &result.value, depth)?;
            if !result.complete() {
                return Ok(self.unresolved(result.unresolvable));
            }
            return Ok(result);
        }

        let mut out = String::new();
        let mut unresolvable = Unresolvable::default();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Expression { expr, .. } => {
                    let result = Interpreter::run(ev, ctx, expr, scope)?;
                    if !result.complete() {
                        unresolvable.extends(result.unresolvable);
                        continue;
                    }
                    let result = ev.evaluate(ctx, &result.value, DEPTH_FULL)?;
                    if !result.complete() {
                        unresolvable.extends(result.unresolvable);
                        continue;
                    }
                    out.push_str(&stringify(&result.value)?);
                }
            }
        }

        if unresolvable.is_empty() {
            Ok(EvalResult::new(Tree::String(out)))
        } else {
            Ok(self.unresolved(unresolvable))
        }
    }

    fn unresolved(&self, unresolvable: Unresolvable) -> EvalResult {
        tracing::debug!(template = %self.source, missing = unresolvable.len(), "template is incomplete");
        EvalResult::partial(Tree::String(self.source.clone()), unresolvable)
    }
}

fn starts_with(chars: &[char], at: usize, prefix: &str) -> bool {
    let mut i = at;
    for c in prefix.chars() {
        if chars.get(i) != Some(&c) {
            return false;
        }
        i += 1;
    }
    true
}

/// Number of characters up to the `}` closing an embedded expression.
fn expression_length(rest: &[char]) -> Result<usize> {
    let source: String = rest.iter().collect();
    let mut lexer = Lexer::new(&source);
    let mut depth = 0_usize;

    loop {
        let token = lexer.next_token();
        match token.token_type {
            TokenType::OpenBrace => depth += 1,
            TokenType::CloseBrace if depth == 0 => return Ok(token.position),
            TokenType::CloseBrace => depth -= 1,
            TokenType::Eof => {
                return Err(Error::Parse("unterminated template expression".into()))
            }
            TokenType::Error => return Err(Error::Parse(token.value)),
            _ => {}
        }
    }
}
