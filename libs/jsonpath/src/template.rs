//! kubectl-style JSONPath templates
//!
//! ```text
//! {range .items[*]}{.metadata.name}{"\t"}{.status}{"\n"}{end}
//! ```

use crate::ast::Path;
use crate::error::{Error, Result};
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub parts: Vec<TemplatePart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text, including quoted `{"..."}` literals
    Text(String),
    /// `{<path>}`, relative to the current node
    Path(Path),
    /// `{range <path>}...{end}`: render `body` once per selected node
    Range { path: Path, body: Vec<TemplatePart> },
}

pub(crate) fn parse(input: &str) -> Result<Template> {
    let chars: Vec<char> = input.chars().collect();
    let mut frames: Vec<(Path, Vec<TemplatePart>, usize)> = Vec::new();
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '{' {
            text.push(chars[i]);
            i += 1;
            continue;
        }

        let open = i;
        let close = find_close(&chars, open)?;
        let action: String = chars[open + 1..close].iter().collect();
        let action = action.trim();
        i = close + 1;

        if !text.is_empty() {
            parts.push(TemplatePart::Text(std::mem::take(&mut text)));
        }

        if action == "end" {
            let Some((path, outer, _)) = frames.pop() else {
                return Err(Error::parse("{end} without a matching {range}", open));
            };
            let body = std::mem::replace(&mut parts, outer);
            parts.push(TemplatePart::Range { path, body });
        } else if let Some(rest) = action.strip_prefix("range ") {
            let path = parse_at(rest, open)?;
            frames.push((path, std::mem::take(&mut parts), open));
        } else if action.starts_with('"') || action.starts_with('\'') {
            parts.push(TemplatePart::Text(unquote(action, open)?));
        } else {
            parts.push(TemplatePart::Path(parse_at(action, open)?));
        }
    }

    if let Some((_, _, open)) = frames.last() {
        return Err(Error::parse("unterminated {range}", *open));
    }
    if !text.is_empty() {
        parts.push(TemplatePart::Text(text));
    }

    Ok(Template { parts })
}

/// Find the `}` closing the action opened at `open`, skipping quoted text.
fn find_close(chars: &[char], open: usize) -> Result<usize> {
    let mut quote: Option<char> = None;
    let mut i = open + 1;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(_) if c == '\\' => i += 1,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '}' => return Ok(i),
            None => {}
        }
        i += 1;
    }
    Err(Error::parse("unterminated template action", open))
}

fn parse_at(source: &str, offset: usize) -> Result<Path> {
    Parser::new(source).parse_path().map_err(|err| match err {
        Error::Parse { message, position } => Error::parse(message, offset + 1 + position),
    })
}

fn unquote(action: &str, offset: usize) -> Result<String> {
    let mut chars = action.chars();
    let quote = chars.next();
    let mut value = String::new();
    let mut closed = false;

    while let Some(c) = chars.next() {
        if Some(c) == quote {
            closed = true;
            break;
        }
        if c == '\\' {
            match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some(other) => value.push(other),
                None => break,
            }
        } else {
            value.push(c);
        }
    }

    if !closed || !chars.as_str().trim().is_empty() {
        return Err(Error::parse("malformed quoted literal", offset));
    }
    Ok(value)
}
