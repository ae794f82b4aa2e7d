//! Expression lexer - tokenizes expression source
//!
//! Identifiers may contain dashes when the dash sits directly between
//! identifier characters, so `my-secret` is one identifier while `a - b` is a
//! subtraction.

use crate::error::{Error, Result};
use crate::token::{Token, TokenType};

/// The expression lexer
pub struct Lexer {
    position: usize,
    line: usize,
    column: usize,
    chars: Vec<char>,
    current_char: Option<char>,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            position: 0,
            line: 1,
            column: 1,
            chars,
            current_char,
        }
    }

    /// Character offset of the next unread character
    pub fn position(&self) -> usize {
        self.position
    }

    fn advance(&mut self) {
        if let Some(c) = self.current_char {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current_char {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let start_pos = self.position;

        while let Some(c) = self.current_char {
            if is_identifier_char(c) {
                self.advance();
            } else if c == '-' && self.peek().is_some_and(is_identifier_char) {
                self.advance();
            } else {
                break;
            }
        }

        self.chars[start_pos..self.position].iter().collect()
    }

    /// Read a quoted string literal delimited by `quote`
    fn read_string(&mut self, quote: char) -> Result<String> {
        self.advance(); // Skip opening quote

        let mut value = String::new();

        while let Some(c) = self.current_char {
            if c == quote {
                self.advance(); // Skip closing quote
                return Ok(value);
            }
            if c != '\\' {
                value.push(c);
                self.advance();
                continue;
            }

            self.advance(); // Skip backslash
            let Some(escaped) = self.current_char else {
                break;
            };
            match escaped {
                'n' => value.push('\n'),
                'r' => value.push('\r'),
                't' => value.push('\t'),
                'f' => value.push('\x0C'),
                'b' => value.push('\x08'),
                'u' => {
                    self.advance(); // Skip 'u'
                    let mut hex = String::new();
                    for _ in 0..4 {
                        match self.current_char {
                            Some(h) if h.is_ascii_hexdigit() => {
                                hex.push(h);
                                self.advance();
                            }
                            _ => return Err(Error::Parse("Invalid unicode escape sequence".into())),
                        }
                    }
                    let code = u32::from_str_radix(&hex, 16)
                        .map_err(|_| Error::Parse("Invalid unicode code point".into()))?;
                    value.push(
                        char::from_u32(code)
                            .ok_or_else(|| Error::Parse("Invalid unicode character".into()))?,
                    );
                    continue; // Don't advance again after unicode sequence
                }
                other => value.push(other),
            }
            self.advance();
        }

        Err(Error::Parse("Unterminated string literal".into()))
    }

    /// Read a backtick raw string: no escapes at all
    fn read_raw_string(&mut self) -> Result<String> {
        self.advance(); // Skip opening backtick
        let start_pos = self.position;
        while let Some(c) = self.current_char {
            if c == '`' {
                let value = self.chars[start_pos..self.position].iter().collect();
                self.advance();
                return Ok(value);
            }
            self.advance();
        }
        Err(Error::Parse("Unterminated raw string literal".into()))
    }

    /// Read a number, returning the text and whether it is a float
    fn read_number(&mut self) -> (String, bool) {
        let start_pos = self.position;
        let mut is_float = false;

        while matches!(self.current_char, Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // Only consume the dot when digits follow, so `1.foo` stays a member access
        if self.current_char == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.current_char, Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.current_char, Some('e') | Some('E')) {
            let sign = matches!(self.peek(), Some('+') | Some('-'));
            let digit_at = if sign {
                self.position + 2
            } else {
                self.position + 1
            };
            if self
                .chars
                .get(digit_at)
                .is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                self.advance();
                if sign {
                    self.advance();
                }
                while matches!(self.current_char, Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let value: String = self.chars[start_pos..self.position].iter().collect();
        (value, is_float)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let position = self.position;
        let line = self.line;
        let column = self.column;

        let Some(c) = self.current_char else {
            return Token::eof(position, line, column);
        };

        let token = |token_type: TokenType, value: &str| {
            Token::new(token_type, value.to_string(), position, line, column)
        };

        // Two-character operators first
        let two = match (c, self.peek()) {
            ('*', Some('*')) => Some((TokenType::Power, "**")),
            ('&', Some('&')) => Some((TokenType::LogicalAnd, "&&")),
            ('&', Some('^')) => Some((TokenType::AndNot, "&^")),
            ('|', Some('|')) => Some((TokenType::LogicalOr, "||")),
            ('|', Some('>')) => Some((TokenType::PipeForward, "|>")),
            ('<', Some('<')) => Some((TokenType::ShiftLeft, "<<")),
            ('>', Some('>')) => Some((TokenType::ShiftRight, ">>")),
            ('<', Some('=')) => Some((TokenType::LessThanOrEqual, "<=")),
            ('>', Some('=')) => Some((TokenType::GreaterThanOrEqual, ">=")),
            ('=', Some('=')) => Some((TokenType::Equal, "==")),
            ('=', Some('~')) => Some((TokenType::Match, "=~")),
            ('!', Some('=')) => Some((TokenType::NotEqual, "!=")),
            ('!', Some('~')) => Some((TokenType::NotMatch, "!~")),
            ('?', Some('?')) => Some((TokenType::Coalesce, "??")),
            _ => None,
        };
        if let Some((token_type, text)) = two {
            self.advance();
            self.advance();
            return token(token_type, text);
        }

        let single = match c {
            '.' => Some(TokenType::Dot),
            '+' => Some(TokenType::Plus),
            '-' => Some(TokenType::Minus),
            '*' => Some(TokenType::Multiply),
            '/' => Some(TokenType::Divide),
            '%' => Some(TokenType::Modulo),
            '&' => Some(TokenType::Ampersand),
            '|' => Some(TokenType::Pipe),
            '^' => Some(TokenType::Caret),
            '~' => Some(TokenType::Tilde),
            '!' => Some(TokenType::Bang),
            '<' => Some(TokenType::LessThan),
            '>' => Some(TokenType::GreaterThan),
            '?' => Some(TokenType::Question),
            ':' => Some(TokenType::Colon),
            '$' => Some(TokenType::Dollar),
            '(' => Some(TokenType::OpenParen),
            ')' => Some(TokenType::CloseParen),
            '[' => Some(TokenType::OpenBracket),
            ']' => Some(TokenType::CloseBracket),
            '{' => Some(TokenType::OpenBrace),
            '}' => Some(TokenType::CloseBrace),
            ',' => Some(TokenType::Comma),
            _ => None,
        };
        if let Some(token_type) = single {
            self.advance();
            return token(token_type, &c.to_string());
        }

        match c {
            '\'' | '"' => match self.read_string(c) {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position, line, column),
                Err(e) => Token::error(error_message(e), position, line, column),
            },
            '`' => match self.read_raw_string() {
                Ok(value) => Token::new(TokenType::StringLiteral, value, position, line, column),
                Err(e) => Token::error(error_message(e), position, line, column),
            },
            c if c.is_ascii_digit() => {
                let (value, is_float) = self.read_number();
                let token_type = if is_float {
                    TokenType::FloatLiteral
                } else {
                    TokenType::IntegerLiteral
                };
                Token::new(token_type, value, position, line, column)
            }
            c if is_identifier_start(c) => {
                let value = self.read_identifier();
                let token_type = match value.as_str() {
                    "true" => TokenType::True,
                    "false" => TokenType::False,
                    "null" => TokenType::Null,
                    "in" => TokenType::In,
                    _ => TokenType::Identifier,
                };
                Token::new(token_type, value, position, line, column)
            }
            other => {
                self.advance();
                Token::error(
                    format!("Unexpected character {other:?}"),
                    position,
                    line,
                    column,
                )
            }
        }
    }
}

fn error_message(err: Error) -> String {
    match err {
        Error::Parse(message) => message,
        other => other.to_string(),
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
