//! Error types for the evaluator
//!
//! Errors are the fatal channel. References that simply cannot be resolved
//! yet travel in [`Unresolvable`](crate::Unresolvable) instead and never turn
//! into an `Error` unless the caller asks for it.

use std::fmt;

use thiserror::Error;

use crate::unresolvable::UnresolvableError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Position of a child inside its parent, used to report where in a tree an
/// error happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{key:?}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Evaluation errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("path {path}: {cause}")]
    PathEvaluation {
        path: PathSegment,
        #[source]
        cause: Box<Error>,
    },

    #[error("unsupported value of type {type_name}")]
    UnsupportedValue { type_name: String },

    #[error("could not resolve {type_name}: {cause}")]
    InvalidType {
        type_name: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("missing required field {field:?}")]
    MissingField { field: String },

    #[error("no data resolver named {name:?}")]
    DataResolverNotFound { name: String },

    #[error("unknown encoding {0:?}")]
    UnknownEncoding(String),

    #[error("could not decode {encoding} data: {message}")]
    Decode { encoding: String, message: String },

    #[error("unexpected type: wanted {}, got {got}", .wanted.join(" or "))]
    UnexpectedType { wanted: Vec<String>, got: String },

    #[error("function {name:?}: {cause}")]
    Invocation {
        name: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("{}", arity_message(.wanted, .variadic, .got))]
    Arity {
        wanted: usize,
        variadic: bool,
        got: usize,
    },

    #[error("argument {arg}: {cause}")]
    PositionalArg {
        arg: usize,
        #[source]
        cause: Box<Error>,
    },

    #[error("argument {arg:?}: {cause}")]
    KeywordArg {
        arg: String,
        #[source]
        cause: Box<Error>,
    },

    #[error("function does not accept keyword arguments")]
    KeywordArgsUnsupported,

    #[error("function does not accept positional arguments")]
    PositionalArgsUnsupported,

    #[error("function not found")]
    FunctionNotFound,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("evaluation cancelled")]
    Cancelled,

    #[error("evaluation deadline exceeded")]
    DeadlineExceeded,

    #[error("resolver error: {0}")]
    Resolver(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error(transparent)]
    Unresolvable(#[from] UnresolvableError),

    #[error("JSON error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

fn arity_message(wanted: &usize, variadic: &bool, got: &usize) -> String {
    let plural = |n: usize| if n == 1 { "argument" } else { "arguments" };
    if *variadic {
        format!("wanted at least {wanted} {}, got {got}", plural(*wanted))
    } else {
        format!("wanted {wanted} {}, got {got}", plural(*wanted))
    }
}

impl Error {
    /// Wrap this error with the mapping key it occurred under.
    pub fn at_key(self, key: impl Into<String>) -> Self {
        Error::PathEvaluation {
            path: PathSegment::Key(key.into()),
            cause: Box::new(self),
        }
    }

    /// Wrap this error with the sequence index it occurred at.
    pub fn at_index(self, index: usize) -> Self {
        Error::PathEvaluation {
            path: PathSegment::Index(index),
            cause: Box::new(self),
        }
    }

    pub fn invalid_type(type_name: impl Into<String>, cause: Error) -> Self {
        Error::InvalidType {
            type_name: type_name.into(),
            cause: Box::new(cause),
        }
    }

    pub fn invocation(name: impl Into<String>, cause: Error) -> Self {
        Error::Invocation {
            name: name.into(),
            cause: Box::new(cause),
        }
    }

    pub fn positional_arg(arg: usize, cause: Error) -> Self {
        Error::PositionalArg {
            arg,
            cause: Box::new(cause),
        }
    }

    pub fn keyword_arg(arg: impl Into<String>, cause: Error) -> Self {
        Error::KeywordArg {
            arg: arg.into(),
            cause: Box::new(cause),
        }
    }

    pub fn unexpected_type(wanted: &[&str], got: impl Into<String>) -> Self {
        Error::UnexpectedType {
            wanted: wanted.iter().map(|w| w.to_string()).collect(),
            got: got.into(),
        }
    }

    /// Wrap an arbitrary resolver failure.
    pub fn resolver<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Resolver(err.into())
    }

    /// The innermost error, looking through path, type, invocation and
    /// argument wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::PathEvaluation { cause, .. }
            | Error::InvalidType { cause, .. }
            | Error::Invocation { cause, .. }
            | Error::PositionalArg { cause, .. }
            | Error::KeywordArg { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// True when evaluation stopped because the context was cancelled or its
    /// deadline passed, no matter how deeply the error is wrapped.
    pub fn is_cancellation(&self) -> bool {
        matches!(self.root_cause(), Error::Cancelled | Error::DeadlineExceeded)
    }

    /// True for structural misses: unknown keys and out-of-range indexes.
    pub fn is_not_found(&self) -> bool {
        matches!(self.root_cause(), Error::PathNotFound(_))
    }
}

impl From<weft_jsonpath::Error> for Error {
    fn from(err: weft_jsonpath::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_seen_through_wrappers() {
        let err = Error::invalid_type("Secret", Error::Cancelled)
            .at_key("name")
            .at_index(3);
        assert!(err.is_cancellation());
        assert!(!Error::Type("nope".into()).at_key("a").is_cancellation());
    }

    #[test]
    fn test_path_wrapping_display() {
        let err = Error::MissingField {
            field: "name".into(),
        }
        .at_key("spec")
        .at_index(0);
        assert_eq!(
            err.to_string(),
            "path 0: path \"spec\": missing required field \"name\""
        );
    }

    #[test]
    fn test_arity_display() {
        let err = Error::Arity {
            wanted: 1,
            variadic: true,
            got: 0,
        };
        assert_eq!(err.to_string(), "wanted at least 1 argument, got 0");
        let err = Error::Arity {
            wanted: 2,
            variadic: false,
            got: 3,
        };
        assert_eq!(err.to_string(), "wanted 2 arguments, got 3");
    }
}
