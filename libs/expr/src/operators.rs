//! Operator semantics over fully evaluated values

use std::cmp::Ordering;

use regex::Regex;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{Error, Result};
use crate::functions::strings::stringify;
use crate::tree::{Number, Tree};

pub(crate) fn unary(operator: UnaryOperator, operand: Tree) -> Result<Tree> {
    match (operator, operand) {
        (UnaryOperator::Negate, Tree::Number(Number::Int(i))) => i
            .checked_neg()
            .map(Tree::from)
            .ok_or_else(|| Error::Type("integer overflow in negation".into())),
        (UnaryOperator::Negate, Tree::Number(Number::Float(f))) => Ok(Tree::from(-f)),
        (UnaryOperator::Not, Tree::Bool(b)) => Ok(Tree::Bool(!b)),
        (UnaryOperator::BitwiseNot, Tree::Number(n)) => Ok(Tree::from(!integral(operator, n)?)),
        (operator, other) => Err(Error::Type(format!(
            "operator {operator} cannot be applied to {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn binary(operator: BinaryOperator, left: Tree, right: Tree) -> Result<Tree> {
    use BinaryOperator::*;

    match operator {
        Add => add(left, right),
        Subtract | Multiply | Divide | Modulo | Power => match (&left, &right) {
            (Tree::Number(a), Tree::Number(b)) => arithmetic(operator, *a, *b).map(Tree::Number),
            _ => Err(mismatch(operator, &left, &right)),
        },
        BitwiseOr | BitwiseXor | BitwiseAnd | BitwiseAndNot | ShiftLeft | ShiftRight => {
            match (&left, &right) {
                (Tree::Number(a), Tree::Number(b)) => bitwise(operator, *a, *b).map(Tree::from),
                _ => Err(mismatch(operator, &left, &right)),
            }
        }
        Equal => Ok(Tree::Bool(left == right)),
        NotEqual => Ok(Tree::Bool(left != right)),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            let ordering = compare(operator, &left, &right)?;
            let result = match operator {
                LessThan => ordering == Ordering::Less,
                LessThanOrEqual => ordering != Ordering::Greater,
                GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Tree::Bool(result))
        }
        Match | NotMatch => match (&left, &right) {
            (Tree::String(text), Tree::String(pattern)) => {
                let regex = Regex::new(pattern)
                    .map_err(|err| Error::Type(format!("invalid regular expression: {err}")))?;
                Ok(Tree::Bool(regex.is_match(text) == (operator == Match)))
            }
            _ => Err(mismatch(operator, &left, &right)),
        },
        In => contains(&right, &left).map(Tree::Bool),
    }
}

fn mismatch(operator: BinaryOperator, left: &Tree, right: &Tree) -> Error {
    Error::Type(format!(
        "operator {operator} cannot be applied to {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

fn add(left: Tree, right: Tree) -> Result<Tree> {
    match (left, right) {
        (Tree::Number(a), Tree::Number(b)) => {
            arithmetic(BinaryOperator::Add, a, b).map(Tree::Number)
        }
        (Tree::String(a), other) => Ok(Tree::String(a + &stringify(&other)?)),
        (other, Tree::String(b)) => Ok(Tree::String(stringify(&other)? + &b)),
        (Tree::Sequence(mut a), Tree::Sequence(b)) => {
            a.extend(b);
            Ok(Tree::Sequence(a))
        }
        (left, right) => Err(mismatch(BinaryOperator::Add, &left, &right)),
    }
}

fn arithmetic(operator: BinaryOperator, a: Number, b: Number) -> Result<Number> {
    let result = match (a, b) {
        (Number::Int(x), Number::Int(y)) => integer_arithmetic(operator, x, y)?,
        _ => float_arithmetic(operator, a.as_f64(), b.as_f64())?,
    };
    if !result.is_finite() {
        return Err(Error::Type(format!(
            "operator {operator} produced a non-finite result"
        )));
    }
    Ok(result)
}

fn integer_arithmetic(operator: BinaryOperator, x: i64, y: i64) -> Result<Number> {
    let overflow = || Error::Type(format!("integer overflow in {x} {operator} {y}"));
    match operator {
        BinaryOperator::Add => x.checked_add(y).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Subtract => x.checked_sub(y).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Multiply => x.checked_mul(y).map(Number::Int).ok_or_else(overflow),
        BinaryOperator::Divide => {
            if y == 0 {
                return Err(Error::Type("division by zero".into()));
            }
            match x.checked_rem(y) {
                Some(0) => x.checked_div(y).map(Number::Int).ok_or_else(overflow),
                _ => Ok(Number::Float(x as f64 / y as f64)),
            }
        }
        BinaryOperator::Modulo => {
            if y == 0 {
                return Err(Error::Type("modulo by zero".into()));
            }
            x.checked_rem(y).map(Number::Int).ok_or_else(overflow)
        }
        BinaryOperator::Power => match u32::try_from(y) {
            Ok(exponent) => match x.checked_pow(exponent) {
                Some(value) => Ok(Number::Int(value)),
                None => Ok(Number::Float((x as f64).powf(y as f64))),
            },
            Err(_) => Ok(Number::Float((x as f64).powf(y as f64))),
        },
        _ => Err(Error::Type(format!("{operator} is not an arithmetic operator"))),
    }
}

fn float_arithmetic(operator: BinaryOperator, x: f64, y: f64) -> Result<Number> {
    let value = match operator {
        BinaryOperator::Add => x + y,
        BinaryOperator::Subtract => x - y,
        BinaryOperator::Multiply => x * y,
        BinaryOperator::Divide => {
            if y == 0.0 {
                return Err(Error::Type("division by zero".into()));
            }
            x / y
        }
        BinaryOperator::Modulo => {
            if y == 0.0 {
                return Err(Error::Type("modulo by zero".into()));
            }
            x % y
        }
        BinaryOperator::Power => x.powf(y),
        _ => return Err(Error::Type(format!("{operator} is not an arithmetic operator"))),
    };
    Ok(Number::Float(value))
}

fn integral(operator: impl std::fmt::Display, n: Number) -> Result<i64> {
    n.as_i64()
        .ok_or_else(|| Error::Type(format!("operator {operator} requires integer operands")))
}

fn bitwise(operator: BinaryOperator, a: Number, b: Number) -> Result<i64> {
    let x = integral(operator, a)?;
    let y = integral(operator, b)?;
    let shift = || {
        u32::try_from(y)
            .ok()
            .filter(|amount| *amount < 64)
            .ok_or_else(|| Error::Type(format!("shift amount {y} out of range 0..64")))
    };
    match operator {
        BinaryOperator::BitwiseOr => Ok(x | y),
        BinaryOperator::BitwiseXor => Ok(x ^ y),
        BinaryOperator::BitwiseAnd => Ok(x & y),
        BinaryOperator::BitwiseAndNot => Ok(x & !y),
        BinaryOperator::ShiftLeft => Ok(x << shift()?),
        BinaryOperator::ShiftRight => Ok(x >> shift()?),
        _ => Err(Error::Type(format!("{operator} is not a bitwise operator"))),
    }
}

fn compare(operator: BinaryOperator, left: &Tree, right: &Tree) -> Result<Ordering> {
    match (left, right) {
        (Tree::Number(Number::Int(a)), Tree::Number(Number::Int(b))) => Ok(a.cmp(b)),
        (Tree::Number(a), Tree::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .ok_or_else(|| mismatch(operator, left, right)),
        (Tree::String(a), Tree::String(b)) => Ok(a.cmp(b)),
        _ => Err(mismatch(operator, left, right)),
    }
}

/// `needle in haystack`
fn contains(haystack: &Tree, needle: &Tree) -> Result<bool> {
    match (haystack, needle) {
        (Tree::Sequence(items), needle) => Ok(items.contains(needle)),
        (Tree::Mapping(fields), Tree::String(key)) => Ok(fields.contains_key(key)),
        (Tree::String(text), Tree::String(part)) => Ok(text.contains(part.as_str())),
        _ => Err(mismatch(BinaryOperator::In, needle, haystack)),
    }
}
