//! JSONPath and JSONPath template parsing
//!
//! This crate only parses. Evaluation against a document lives with the
//! evaluator that owns the document representation.
//!
//! Supported path syntax:
//!
//! ```text
//! $.store.book[0].title        child members and indexes
//! $['store']["book"][-1]       bracket notation, negative indexes
//! $.store.*  $.items[*]        wildcards
//! $..author  $..[0]            recursive descent
//! $.items[0,2]  $.a['b','c']   unions
//! $.items[1:5:2]               slices
//! $.items[?(@.price < 10)]     filters (comparison or existence)
//! ```
//!
//! Templates follow the kubectl convention: `{.path}` segments, quoted
//! literals such as `{"\n"}`, and `{range .items[*]}...{end}` loops.

pub mod ast;
pub mod error;
pub mod parser;
pub mod template;

pub use ast::{Comparator, Filter, Literal, Path, Segment, Selector};
pub use error::{Error, Result};
pub use template::{Template, TemplatePart};

/// Parse a JSONPath expression.
pub fn parse_path(input: &str) -> Result<Path> {
    parser::Parser::new(input).parse_path()
}

/// Parse a kubectl-style JSONPath template.
pub fn parse_template(input: &str) -> Result<Template> {
    template::parse(input)
}
