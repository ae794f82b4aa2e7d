//! Expression parser - converts expression source to AST
//!
//! Recursive descent parser. Precedence (lowest to highest):
//! 1. pipe (|>), right-associative
//! 2. ternary (? :)
//! 3. coalescing (??)
//! 4. logical or (||)
//! 5. logical and (&&)
//! 6. comparison (==, !=, <, <=, >, >=, =~, !~, in)
//! 7. bitwise or (|)
//! 8. bitwise xor (^)
//! 9. bitwise and (&, &^)
//! 10. shift (<<, >>)
//! 11. additive (+, -)
//! 12. multiplicative (*, /, %)
//! 13. power (**), right-associative
//! 14. unary (-, !, ~)
//! 15. postfix (.ident, [expr])
//! 16. primary (literals, $, identifiers, calls, parentheses)

use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenType};
use crate::tree::{Number, Tree};

/// Parser for expressions
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    lookahead: Option<Token>,
    recursion_depth: usize,
}

const MAX_RECURSION_DEPTH: usize = 200;

impl Parser {
    /// Create a new parser for the given input string
    pub fn new(input: &str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Self {
            lexer,
            current_token,
            lookahead: None,
            recursion_depth: 0,
        }
    }

    /// Parse the entire expression (top-level entry point)
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_expression()?;

        // Ensure we've consumed all input
        if !self.current_token_is(TokenType::Eof) {
            return Err(self.unexpected());
        }

        Ok(expr)
    }

    fn advance(&mut self) {
        self.current_token = match self.lookahead.take() {
            Some(token) => token,
            None => self.lexer.next_token(),
        };
    }

    /// The token after the current one
    fn peek(&mut self) -> &Token {
        if self.lookahead.is_none() {
            self.lookahead = Some(self.lexer.next_token());
        }
        // Filled just above
        match &self.lookahead {
            Some(token) => token,
            None => &self.current_token,
        }
    }

    fn current_token_is(&self, token_type: TokenType) -> bool {
        self.current_token.token_type == token_type
    }

    fn current_token_is_one_of(&self, types: &[TokenType]) -> bool {
        types.contains(&self.current_token.token_type)
    }

    /// Expect a specific token type and advance
    fn expect(&mut self, token_type: TokenType) -> Result<Token> {
        if self.current_token.token_type == token_type {
            let token = self.current_token.clone();
            self.advance();
            return Ok(token);
        }
        if self.current_token_is(TokenType::Error) {
            return Err(self.unexpected());
        }
        Err(Error::Parse(format!(
            "Expected {:?}, got {:?} at line {}, column {}",
            token_type,
            self.current_token.token_type,
            self.current_token.line,
            self.current_token.column
        )))
    }

    fn unexpected(&self) -> Error {
        let token = &self.current_token;
        match token.token_type {
            TokenType::Error => Error::Parse(format!(
                "{} at line {}, column {}",
                token.value, token.line, token.column
            )),
            TokenType::Eof => Error::Parse("Unexpected end of expression".into()),
            _ => Error::Parse(format!(
                "Unexpected token {:?} at line {}, column {}",
                token.value, token.line, token.column
            )),
        }
    }

    fn check_recursion_depth(&mut self) -> Result<()> {
        self.recursion_depth += 1;
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(Error::Parse(format!(
                "Expression too deeply nested (max depth: {})",
                MAX_RECURSION_DEPTH
            )));
        }
        Ok(())
    }

    fn decrement_recursion_depth(&mut self) {
        self.recursion_depth -= 1;
    }

    /// Parse an expression (lowest precedence)
    fn parse_expression(&mut self) -> Result<Expr> {
        self.check_recursion_depth()?;
        let expr = self.parse_pipe_expression();
        self.decrement_recursion_depth();
        expr
    }

    /// Parse pipe expression: expression '|>' expression
    fn parse_pipe_expression(&mut self) -> Result<Expr> {
        let source = self.parse_conditional_expression()?;
        if !self.current_token_is(TokenType::PipeForward) {
            return Ok(source);
        }
        self.advance();
        let target = self.parse_expression()?;
        Ok(Expr::Pipe {
            source: Box::new(source),
            target: Box::new(target),
        })
    }

    /// Parse ternary expression: expression '?' expression ':' expression
    fn parse_conditional_expression(&mut self) -> Result<Expr> {
        let condition = self.parse_coalesce_expression()?;
        if !self.current_token_is(TokenType::Question) {
            return Ok(condition);
        }
        self.advance();

        self.check_recursion_depth()?;
        let then = self.parse_conditional_expression()?;
        self.expect(TokenType::Colon)?;
        let otherwise = self.parse_conditional_expression()?;
        self.decrement_recursion_depth();

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_coalesce_expression(&mut self) -> Result<Expr> {
        self.parse_logical(
            TokenType::Coalesce,
            LogicalOperator::Coalesce,
            Self::parse_or_expression,
        )
    }

    fn parse_or_expression(&mut self) -> Result<Expr> {
        self.parse_logical(
            TokenType::LogicalOr,
            LogicalOperator::Or,
            Self::parse_and_expression,
        )
    }

    fn parse_and_expression(&mut self) -> Result<Expr> {
        self.parse_logical(
            TokenType::LogicalAnd,
            LogicalOperator::And,
            Self::parse_comparison_expression,
        )
    }

    fn parse_logical(
        &mut self,
        token_type: TokenType,
        operator: LogicalOperator,
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        while self.current_token_is(token_type.clone()) {
            self.advance();
            let right = next(self)?;
            left = Expr::Logical {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Left-associative binary level over `operators`
    fn parse_binary(
        &mut self,
        operators: &[(TokenType, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        loop {
            let Some(operator) = operators
                .iter()
                .find(|(token_type, _)| self.current_token_is(token_type.clone()))
                .map(|(_, operator)| *operator)
            else {
                return Ok(left);
            };
            self.advance();
            let right = next(self)?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }
    }

    fn parse_comparison_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[
                (TokenType::Equal, BinaryOperator::Equal),
                (TokenType::NotEqual, BinaryOperator::NotEqual),
                (TokenType::LessThan, BinaryOperator::LessThan),
                (TokenType::LessThanOrEqual, BinaryOperator::LessThanOrEqual),
                (TokenType::GreaterThan, BinaryOperator::GreaterThan),
                (
                    TokenType::GreaterThanOrEqual,
                    BinaryOperator::GreaterThanOrEqual,
                ),
                (TokenType::Match, BinaryOperator::Match),
                (TokenType::NotMatch, BinaryOperator::NotMatch),
                (TokenType::In, BinaryOperator::In),
            ],
            Self::parse_bitwise_or_expression,
        )
    }

    fn parse_bitwise_or_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[(TokenType::Pipe, BinaryOperator::BitwiseOr)],
            Self::parse_bitwise_xor_expression,
        )
    }

    fn parse_bitwise_xor_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[(TokenType::Caret, BinaryOperator::BitwiseXor)],
            Self::parse_bitwise_and_expression,
        )
    }

    fn parse_bitwise_and_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[
                (TokenType::Ampersand, BinaryOperator::BitwiseAnd),
                (TokenType::AndNot, BinaryOperator::BitwiseAndNot),
            ],
            Self::parse_shift_expression,
        )
    }

    fn parse_shift_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[
                (TokenType::ShiftLeft, BinaryOperator::ShiftLeft),
                (TokenType::ShiftRight, BinaryOperator::ShiftRight),
            ],
            Self::parse_additive_expression,
        )
    }

    fn parse_additive_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[
                (TokenType::Plus, BinaryOperator::Add),
                (TokenType::Minus, BinaryOperator::Subtract),
            ],
            Self::parse_multiplicative_expression,
        )
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expr> {
        self.parse_binary(
            &[
                (TokenType::Multiply, BinaryOperator::Multiply),
                (TokenType::Divide, BinaryOperator::Divide),
                (TokenType::Modulo, BinaryOperator::Modulo),
            ],
            Self::parse_power_expression,
        )
    }

    /// Parse power expression: unary ('**' power)?
    fn parse_power_expression(&mut self) -> Result<Expr> {
        let base = self.parse_unary_expression()?;
        if !self.current_token_is(TokenType::Power) {
            return Ok(base);
        }
        self.advance();
        self.check_recursion_depth()?;
        let exponent = self.parse_power_expression()?;
        self.decrement_recursion_depth();
        Ok(Expr::Binary {
            left: Box::new(base),
            operator: BinaryOperator::Power,
            right: Box::new(exponent),
        })
    }

    fn parse_unary_expression(&mut self) -> Result<Expr> {
        let operator = match self.current_token.token_type {
            TokenType::Minus => UnaryOperator::Negate,
            TokenType::Bang => UnaryOperator::Not,
            TokenType::Tilde => UnaryOperator::BitwiseNot,
            _ => return self.parse_postfix_expression(),
        };
        self.advance();
        self.check_recursion_depth()?;
        let operand = self.parse_unary_expression()?;
        self.decrement_recursion_depth();
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix_expression(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.current_token_is(TokenType::Dot) {
                self.advance();
                let name = self.parse_member_name()?;
                expr = Expr::Member {
                    target: Box::new(expr),
                    name,
                };
            } else if self.current_token_is(TokenType::OpenBracket) {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(TokenType::CloseBracket)?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Member names after `.` may also be keywords (`a.in`, `status.true`)
    fn parse_member_name(&mut self) -> Result<String> {
        if self.current_token_is(TokenType::Identifier) || self.current_token.is_keyword() {
            let name = self.current_token.value.clone();
            self.advance();
            return Ok(name);
        }
        Err(self.unexpected())
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current_token.clone();
        match token.token_type {
            TokenType::IntegerLiteral => {
                self.advance();
                let value = match token.value.parse::<i64>() {
                    Ok(i) => Number::Int(i),
                    // Integers beyond i64 degrade to floats
                    Err(_) => Number::Float(token.value.parse::<f64>().map_err(|_| {
                        Error::Parse(format!("Invalid number literal {:?}", token.value))
                    })?),
                };
                Ok(Expr::Literal(Tree::Number(value)))
            }
            TokenType::FloatLiteral => {
                self.advance();
                let value = token.value.parse::<f64>().map_err(|_| {
                    Error::Parse(format!("Invalid number literal {:?}", token.value))
                })?;
                Ok(Expr::Literal(Tree::Number(Number::Float(value))))
            }
            TokenType::StringLiteral => {
                self.advance();
                Ok(Expr::Literal(Tree::String(token.value)))
            }
            TokenType::True => {
                self.advance();
                Ok(Expr::Literal(Tree::Bool(true)))
            }
            TokenType::False => {
                self.advance();
                Ok(Expr::Literal(Tree::Bool(false)))
            }
            TokenType::Null => {
                self.advance();
                Ok(Expr::Literal(Tree::Null))
            }
            TokenType::OpenParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenType::CloseParen)?;
                Ok(expr)
            }
            TokenType::OpenBracket => self.parse_array(),
            TokenType::OpenBrace => self.parse_object(),
            TokenType::Dollar => {
                self.advance();
                // `$name` is shorthand for `$.name`
                if self.current_token_is(TokenType::Identifier) {
                    let name = self.current_token.value.clone();
                    self.advance();
                    return Ok(Expr::Member {
                        target: Box::new(Expr::Root),
                        name,
                    });
                }
                Ok(Expr::Root)
            }
            TokenType::Identifier => {
                self.advance();
                if self.current_token_is(TokenType::OpenParen) {
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call {
                        name: token.value,
                        args,
                    });
                }
                Ok(Expr::Variable(token.value))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.expect(TokenType::OpenBracket)?;
        let mut items = Vec::new();
        if !self.current_token_is(TokenType::CloseBracket) {
            loop {
                items.push(self.parse_expression()?);
                if !self.current_token_is(TokenType::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenType::CloseBracket)?;
        Ok(Expr::Array(items))
    }

    fn parse_object(&mut self) -> Result<Expr> {
        self.expect(TokenType::OpenBrace)?;
        let mut fields = Vec::new();
        if !self.current_token_is(TokenType::CloseBrace) {
            loop {
                let key = if self.current_token_is_one_of(&[
                    TokenType::Identifier,
                    TokenType::StringLiteral,
                ]) || self.current_token.is_keyword()
                {
                    let key = self.current_token.value.clone();
                    self.advance();
                    key
                } else {
                    return Err(self.unexpected());
                };
                self.expect(TokenType::Colon)?;
                fields.push((key, self.parse_expression()?));
                if !self.current_token_is(TokenType::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenType::CloseBrace)?;
        Ok(Expr::Object(fields))
    }

    /// Parse call arguments; keyword style when the first tokens are `ident :`
    fn parse_call_args(&mut self) -> Result<CallArgs> {
        self.expect(TokenType::OpenParen)?;
        if self.current_token_is(TokenType::CloseParen) {
            self.advance();
            return Ok(CallArgs::Positional(Vec::new()));
        }

        let keyword = self.current_token_is(TokenType::Identifier)
            && self.peek().token_type == TokenType::Colon;

        let args = if keyword {
            let mut args = Vec::new();
            loop {
                let name = self.expect(TokenType::Identifier)?.value;
                self.expect(TokenType::Colon)?;
                args.push((name, self.parse_expression()?));
                if !self.current_token_is(TokenType::Comma) {
                    break;
                }
                self.advance();
            }
            CallArgs::Keyword(args)
        } else {
            let mut args = Vec::new();
            loop {
                args.push(self.parse_expression()?);
                if !self.current_token_is(TokenType::Comma) {
                    break;
                }
                self.advance();
            }
            CallArgs::Positional(args)
        };

        self.expect(TokenType::CloseParen)?;
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Expr> {
        Parser::new(input).parse()
    }

    fn variable(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.to_string()))
    }

    #[test]
    fn test_member_chain() {
        assert_eq!(
            parse("secrets.foo").unwrap(),
            Expr::Member {
                target: variable("secrets"),
                name: "foo".into()
            }
        );
    }

    #[test]
    fn test_root_shorthand() {
        assert_eq!(parse("$x").unwrap(), parse("$.x").unwrap());
        assert_eq!(parse("$").unwrap(), Expr::Root);
    }

    #[test]
    fn test_keyword_call_detection() {
        let expr = parse("merge(objects: [a], mode: 'shallow')").unwrap();
        assert!(matches!(
            expr,
            Expr::Call {
                args: CallArgs::Keyword(ref args),
                ..
            } if args.len() == 2
        ));

        // A ternary argument is still positional
        let expr = parse("f(a ? b : c)").unwrap();
        assert!(matches!(
            expr,
            Expr::Call {
                args: CallArgs::Positional(ref args),
                ..
            } if args.len() == 1
        ));
    }

    #[test]
    fn test_pipe_is_right_associative() {
        let expr = parse("a |> b |> c").unwrap();
        let Expr::Pipe { source, target } = expr else {
            panic!("expected a pipe");
        };
        assert_eq!(source, variable("a"));
        assert!(matches!(*target, Expr::Pipe { .. }));
    }

    #[test]
    fn test_recursion_limit() {
        let deep = format!("{}1{}", "(".repeat(300), ")".repeat(300));
        assert!(matches!(parse(&deep), Err(Error::Parse(_))));
    }
}
