//! Abstract syntax tree for JSONPath expressions

use std::fmt;

/// A parsed JSONPath: a sequence of segments applied left to right,
/// starting at the root (or current) node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    pub segments: Vec<Segment>,
}

impl Path {
    /// A definite path addresses at most one node: only named children and
    /// indexes, no wildcards, slices, unions, filters or descent.
    pub fn is_definite(&self) -> bool {
        self.segments.iter().all(|segment| {
            matches!(
                segment,
                Segment::Child(Selector::Name(_)) | Segment::Child(Selector::Index(_))
            )
        })
    }

    /// True for the empty path (`$`, `@` or `.`), which selects the start node.
    pub fn is_identity(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Apply the selector to the children of each node
    Child(Selector),
    /// Apply the selector to each node and all of its descendants (`..`)
    Descendant(Selector),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Name(String),
    Index(i64),
    Wildcard,
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    Union(Vec<Selector>),
    Filter(Filter),
}

/// `[?(@.path)]` or `[?(@.path <op> literal)]`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub path: Path,
    pub comparison: Option<(Comparator, Literal)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}
