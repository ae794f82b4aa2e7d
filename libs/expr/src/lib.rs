//! Partial evaluation of workflow specifications
//!
//! A specification is a [`Tree`] of plain data with a few special shapes:
//! typed references (`{"$type": "Secret", "name": "token"}`), encoded
//! envelopes (`{"$encoding": "base64", "data": "..."}`), function calls
//! (`{"$fn.concat": [...]}`) and `${...}` string templates. Evaluating the
//! tree resolves what it can and reports the rest:
//!
//! ```text
//! Tree --Evaluator--> EvalResult { value, unresolvable }
//!            |
//!         Visitor (workflow dialect)
//!            |
//!   resolvers, functions, expression language
//! ```
//!
//! Anything that cannot be resolved yet is recorded in an [`Unresolvable`]
//! and left in place, so the partially evaluated tree can be evaluated again
//! once more references are available. Genuine failures are [`Error`]s.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use weft_expr::{workflow, Context, MemoryParameterTypeResolver, Options, Tree};
//!
//! let spec = Tree::from(json!({
//!     "greeting": {"$fn.concat": ["hello, ", {"$type": "Parameter", "name": "who"}]},
//! }));
//!
//! let pending = workflow::evaluator(Options::default())
//!     .evaluate_all(&Context::new(), &spec)
//!     .unwrap();
//! assert_eq!(pending.unresolvable.parameters.len(), 1);
//!
//! let ev = workflow::evaluator(Options::default().with_parameter_resolver(Arc::new(
//!     MemoryParameterTypeResolver::new([("who", Tree::from("world"))]),
//! )));
//! let done = ev.evaluate_all(&Context::new(), &pending.value).unwrap();
//! assert!(done.complete());
//! assert_eq!(done.value.get("greeting"), Some(&Tree::from("hello, world")));
//! ```

pub mod ast;
mod cache;
pub mod context;
pub mod encoding;
pub mod error;
pub mod evaluator;
pub mod expand;
pub mod functions;
mod interpreter;
mod into;
pub mod lexer;
mod operators;
pub mod options;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod result;
pub mod template;
pub mod token;
pub mod tree;
pub mod unresolvable;
pub mod workflow;

// Re-export main types
pub use context::Context;
pub use encoding::Encoding;
pub use error::{Error, PathSegment, Result};
pub use evaluator::{DefaultVisitor, Evaluator, Visitor, DEPTH_FULL};
pub use expand::{Expandable, Indexable};
pub use functions::{invoker, library, Arg, Descriptor, FunctionMap, Invoker};
pub use options::Options;
pub use query::Language;
pub use resolver::{
    AnswerTypeResolver, ChainAnswerTypeResolvers, ChainConnectionTypeResolvers,
    ChainDataTypeResolvers, ChainOutputTypeResolvers, ChainParameterTypeResolvers,
    ChainSecretTypeResolvers, ChainStatusTypeResolvers, ConnectionTypeResolver, DataTypeResolver,
    MemoryAnswerTypeResolver, MemoryConnectionTypeResolver, MemoryDataTypeResolver,
    MemoryOutputTypeResolver, MemoryParameterTypeResolver, MemorySecretTypeResolver,
    MemoryStatusTypeResolver, NoOpResolver, OutputTypeResolver, ParameterTypeResolver,
    SecretTypeResolver, StatusTypeResolver,
};
pub use result::EvalResult;
pub use template::Template;
pub use tree::{Foreign, Number, Thunk, Tree};
pub use unresolvable::{Unresolvable, UnresolvableError};
pub use workflow::WorkflowVisitor;
