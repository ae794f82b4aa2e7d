//! Compiled-expression cache shared by one evaluator
//!
//! Templates and queries are parsed once per distinct source text and kept
//! in an LRU. The lock only guards map access; parsing happens outside of it.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use lru::LruCache;

use crate::ast::Expr;
use crate::error::Result;
use crate::parser::Parser;
use crate::template::Template;

pub(crate) const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

#[derive(Clone)]
enum Compiled {
    Template(Arc<Template>),
    Expression(Arc<Expr>),
    JsonPath(Arc<weft_jsonpath::Path>),
    JsonPathTemplate(Arc<weft_jsonpath::Template>),
}

pub(crate) struct ExpressionCache {
    entries: Mutex<LruCache<String, Compiled>>,
}

impl ExpressionCache {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Parsed form of a string that contains `${...}` segments.
    pub(crate) fn template(&self, source: &str) -> Result<Arc<Template>> {
        let key = format!("template::{source}");
        if let Some(Compiled::Template(template)) = self.lookup(&key) {
            return Ok(template);
        }

        let template = Arc::new(Template::parse(source)?);
        self.lock().put(key, Compiled::Template(template.clone()));
        Ok(template)
    }

    /// Parsed form of a standalone path-language query.
    pub(crate) fn expression(&self, source: &str) -> Result<Arc<Expr>> {
        let key = format!("path::{source}");
        if let Some(Compiled::Expression(expr)) = self.lookup(&key) {
            return Ok(expr);
        }

        let expr = Arc::new(Parser::new(source).parse()?);
        self.lock().put(key, Compiled::Expression(expr.clone()));
        Ok(expr)
    }

    pub(crate) fn jsonpath(&self, source: &str) -> Result<Arc<weft_jsonpath::Path>> {
        let key = format!("jsonpath::{source}");
        if let Some(Compiled::JsonPath(path)) = self.lookup(&key) {
            return Ok(path);
        }

        let path = Arc::new(weft_jsonpath::parse_path(source)?);
        self.lock().put(key, Compiled::JsonPath(path.clone()));
        Ok(path)
    }

    pub(crate) fn jsonpath_template(&self, source: &str) -> Result<Arc<weft_jsonpath::Template>> {
        let key = format!("jsonpath-template::{source}");
        if let Some(Compiled::JsonPathTemplate(template)) = self.lookup(&key) {
            return Ok(template);
        }

        let template = Arc::new(weft_jsonpath::parse_template(source)?);
        self.lock()
            .put(key, Compiled::JsonPathTemplate(template.clone()));
        Ok(template)
    }

    fn lookup(&self, key: &str) -> Option<Compiled> {
        let hit = self.lock().get(key).cloned();
        tracing::trace!(key, hit = hit.is_some(), "expression cache lookup");
        hit
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Compiled>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("expression cache lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
