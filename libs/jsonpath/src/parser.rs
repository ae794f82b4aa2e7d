//! JSONPath parser
//!
//! Single-pass, character-level recursive descent. There is no separate
//! token stream: JSONPath is small enough that member names, quoted names,
//! numbers and filter operators are all recognized in place.

use crate::ast::{Comparator, Filter, Literal, Path, Segment, Selector};
use crate::error::{Error, Result};

pub struct Parser {
    chars: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();
        Self {
            chars,
            position: 0,
            current_char,
        }
    }

    /// Parse the whole input as one path.
    pub fn parse_path(&mut self) -> Result<Path> {
        let path = self.path()?;
        self.skip_whitespace();
        match self.current_char {
            None => Ok(path),
            Some(c) => Err(self.error(format!("unexpected character {c:?}"))),
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.chars.get(self.position).copied();
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_char, Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.position)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.current_char {
            Some(c) if c == expected => {
                self.advance();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected {expected:?}, found {c:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn path(&mut self) -> Result<Path> {
        self.skip_whitespace();
        if matches!(self.current_char, Some('$') | Some('@')) {
            self.advance();
        }

        let mut segments = Vec::new();

        // kubectl-style paths may start with a bare member name
        if matches!(self.current_char, Some(c) if is_name_char(c)) {
            segments.push(Segment::Child(Selector::Name(self.name()?)));
        }

        loop {
            match self.current_char {
                Some('.') if self.peek() == Some('.') => {
                    self.advance();
                    self.advance();
                    let selector = match self.current_char {
                        Some('[') => self.bracket()?,
                        Some('*') => {
                            self.advance();
                            Selector::Wildcard
                        }
                        _ => Selector::Name(self.name()?),
                    };
                    segments.push(Segment::Descendant(selector));
                }
                Some('.') => {
                    self.advance();
                    match self.current_char {
                        Some('*') => {
                            self.advance();
                            segments.push(Segment::Child(Selector::Wildcard));
                        }
                        // a lone "." is the current node
                        None if segments.is_empty() => break,
                        _ => segments.push(Segment::Child(Selector::Name(self.name()?))),
                    }
                }
                Some('[') => {
                    let selector = self.bracket()?;
                    segments.push(Segment::Child(selector));
                }
                _ => break,
            }
        }

        Ok(Path { segments })
    }

    fn name(&mut self) -> Result<String> {
        let start = self.position;
        while matches!(self.current_char, Some(c) if is_name_char(c)) {
            self.advance();
        }
        if start == self.position {
            return Err(self.error("expected a member name"));
        }
        Ok(self.chars[start..self.position].iter().collect())
    }

    fn bracket(&mut self) -> Result<Selector> {
        self.expect('[')?;
        self.skip_whitespace();

        let selector = if self.current_char == Some('?') {
            self.filter()?
        } else {
            let mut items = vec![self.bracket_item()?];
            loop {
                self.skip_whitespace();
                if self.current_char != Some(',') {
                    break;
                }
                self.advance();
                self.skip_whitespace();
                items.push(self.bracket_item()?);
            }
            if items.len() == 1 {
                items.remove(0)
            } else {
                Selector::Union(items)
            }
        };

        self.skip_whitespace();
        self.expect(']')?;
        Ok(selector)
    }

    fn bracket_item(&mut self) -> Result<Selector> {
        match self.current_char {
            Some('\'') | Some('"') => Ok(Selector::Name(self.quoted()?)),
            Some('*') => {
                self.advance();
                Ok(Selector::Wildcard)
            }
            Some(c) if c == '-' || c == ':' || c.is_ascii_digit() => self.index_or_slice(),
            Some(c) => Err(self.error(format!("unexpected character {c:?} in brackets"))),
            None => Err(self.error("unterminated brackets")),
        }
    }

    fn index_or_slice(&mut self) -> Result<Selector> {
        let start = self.optional_integer()?;
        self.skip_whitespace();
        if self.current_char != Some(':') {
            return match start {
                Some(index) => Ok(Selector::Index(index)),
                None => Err(self.error("expected an index")),
            };
        }

        self.advance();
        self.skip_whitespace();
        let end = self.optional_integer()?;
        self.skip_whitespace();
        let mut step = None;
        if self.current_char == Some(':') {
            self.advance();
            self.skip_whitespace();
            step = self.optional_integer()?;
            if step == Some(0) {
                return Err(self.error("slice step cannot be zero"));
            }
        }

        Ok(Selector::Slice { start, end, step })
    }

    fn optional_integer(&mut self) -> Result<Option<i64>> {
        let start = self.position;
        if self.current_char == Some('-') {
            self.advance();
        }
        while matches!(self.current_char, Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if start == self.position {
            return Ok(None);
        }
        let text: String = self.chars[start..self.position].iter().collect();
        text.parse::<i64>()
            .map(Some)
            .map_err(|_| Error::parse(format!("invalid integer {text:?}"), start))
    }

    fn quoted(&mut self) -> Result<String> {
        let Some(quote) = self.current_char else {
            return Err(self.error("expected a quoted string"));
        };
        let start = self.position;
        self.advance();

        let mut value = String::new();
        while let Some(c) = self.current_char {
            if c == quote {
                self.advance();
                return Ok(value);
            }
            if c == '\\' {
                self.advance();
                let Some(escaped) = self.current_char else {
                    break;
                };
                value.push(match escaped {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
            } else {
                value.push(c);
            }
            self.advance();
        }

        Err(Error::parse("unterminated string literal", start))
    }

    fn filter(&mut self) -> Result<Selector> {
        self.expect('?')?;
        self.skip_whitespace();
        let parenthesized = self.current_char == Some('(');
        if parenthesized {
            self.advance();
            self.skip_whitespace();
        }

        if self.current_char != Some('@') {
            return Err(self.error("filter must start with '@'"));
        }
        let path = self.path()?;
        self.skip_whitespace();

        let comparison = match self.comparator() {
            Some(comparator) => {
                self.skip_whitespace();
                Some((comparator, self.literal()?))
            }
            None => None,
        };

        self.skip_whitespace();
        if parenthesized {
            self.expect(')')?;
        }

        Ok(Selector::Filter(Filter { path, comparison }))
    }

    fn comparator(&mut self) -> Option<Comparator> {
        let (comparator, width) = match (self.current_char, self.peek()) {
            (Some('='), Some('=')) => (Comparator::Equal, 2),
            (Some('!'), Some('=')) => (Comparator::NotEqual, 2),
            (Some('<'), Some('=')) => (Comparator::LessOrEqual, 2),
            (Some('>'), Some('=')) => (Comparator::GreaterOrEqual, 2),
            (Some('<'), _) => (Comparator::Less, 1),
            (Some('>'), _) => (Comparator::Greater, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.advance();
        }
        Some(comparator)
    }

    fn literal(&mut self) -> Result<Literal> {
        match self.current_char {
            Some('\'') | Some('"') => Ok(Literal::String(self.quoted()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.position;
                self.advance();
                while matches!(self.current_char, Some(c) if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
                {
                    self.advance();
                }
                let text: String = self.chars[start..self.position].iter().collect();
                text.parse::<f64>()
                    .map(Literal::Number)
                    .map_err(|_| Error::parse(format!("invalid number {text:?}"), start))
            }
            Some(c) if c.is_alphabetic() => {
                let start = self.position;
                let word = self.name()?;
                match word.as_str() {
                    "true" => Ok(Literal::Bool(true)),
                    "false" => Ok(Literal::Bool(false)),
                    "null" => Ok(Literal::Null),
                    _ => Err(Error::parse(format!("unexpected literal {word:?}"), start)),
                }
            }
            _ => Err(self.error("expected a literal")),
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Path {
        Parser::new(input).parse_path().unwrap()
    }

    #[test]
    fn test_dot_and_bracket_notation_agree() {
        assert_eq!(parse("$.a.b"), parse("$['a'][\"b\"]"));
    }

    #[test]
    fn test_negative_index() {
        assert_eq!(
            parse("$.items[-1]").segments[1],
            Segment::Child(Selector::Index(-1))
        );
    }

    #[test]
    fn test_slice_defaults() {
        assert_eq!(
            parse("$[:2]").segments[0],
            Segment::Child(Selector::Slice {
                start: None,
                end: Some(2),
                step: None
            })
        );
    }

    #[test]
    fn test_zero_step_is_rejected() {
        assert!(Parser::new("$[0:4:0]").parse_path().is_err());
    }

    #[test]
    fn test_trailing_garbage_is_rejected() {
        let err = Parser::new("$.a )").parse_path().unwrap_err();
        assert!(err.message().contains("unexpected character"));
    }
}
