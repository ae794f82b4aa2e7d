//! Query languages for addressing into evaluated trees

use std::fmt;
use std::str::FromStr;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::evaluator::Evaluator;
use crate::interpreter::{Interpreter, Scope};
use crate::result::EvalResult;
use crate::tree::Tree;

mod jsonpath;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Language {
    /// The expression language used inside `${...}` templates
    Path,
    JsonPath,
    /// kubectl-style text templates with `{<jsonpath>}` segments
    JsonPathTemplate,
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "path" => Ok(Language::Path),
            "jsonpath" => Ok(Language::JsonPath),
            "jsonpath-template" => Ok(Language::JsonPathTemplate),
            other => Err(Error::Parse(format!("unknown query language {other:?}"))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Path => "path",
            Language::JsonPath => "jsonpath",
            Language::JsonPathTemplate => "jsonpath-template",
        })
    }
}

impl Evaluator {
    /// Run `query` against `tree`.
    ///
    /// Only the nodes the query walks through are evaluated on the way; the
    /// value found is then evaluated completely. When a structural miss
    /// happens after some reference turned out to be unresolvable, the miss
    /// is reported as the unresolvable references instead.
    pub fn evaluate_query(
        &self,
        ctx: &Context,
        tree: &Tree,
        language: Language,
        query: &str,
    ) -> Result<EvalResult> {
        tracing::trace!(%language, query, "evaluating query");
        match language {
            Language::Path => {
                let expr = self.cache().expression(query)?;
                let result = Interpreter::run(self, ctx, &expr, &Scope::new(tree.clone()))?;
                if !result.complete() {
                    return Ok(result);
                }
                self.evaluate_all(ctx, &result.value)
            }
            Language::JsonPath => {
                let path = self.cache().jsonpath(query)?;
                jsonpath::evaluate_path(self, ctx, tree, &path)
            }
            Language::JsonPathTemplate => {
                let template = self.cache().jsonpath_template(query)?;
                jsonpath::render_template(self, ctx, tree, &template)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_names() {
        for language in [Language::Path, Language::JsonPath, Language::JsonPathTemplate] {
            assert_eq!(language.to_string().parse::<Language>().unwrap(), language);
        }
        assert!("xpath".parse::<Language>().is_err());
    }
}
