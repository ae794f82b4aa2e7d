//! Configuration for workflow evaluators

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::cache::DEFAULT_CAPACITY;
use crate::functions::{library, FunctionMap};
use crate::resolver::{
    AnswerTypeResolver, ConnectionTypeResolver, DataTypeResolver, NoOpResolver,
    OutputTypeResolver, ParameterTypeResolver, SecretTypeResolver, StatusTypeResolver,
};

/// Everything a [`WorkflowVisitor`](crate::workflow::WorkflowVisitor) needs
/// to resolve references.
///
/// Built once with the `with_*` methods and shared read-only afterwards.
/// Resolvers that are never set default to [`NoOpResolver`], which reports
/// every reference as unresolvable.
///
/// ```rust
/// use std::sync::Arc;
/// use weft_expr::{MemorySecretTypeResolver, Options};
///
/// let options = Options::default()
///     .with_secret_resolver(Arc::new(MemorySecretTypeResolver::new([("token", "s3cr3t")])))
///     .with_cache_capacity(64);
/// assert_eq!(options.cache_capacity().get(), 64);
/// ```
#[derive(Clone)]
pub struct Options {
    functions: FunctionMap,
    data: HashMap<String, Arc<dyn DataTypeResolver>>,
    default_data: Option<String>,
    secrets: Arc<dyn SecretTypeResolver>,
    connections: Arc<dyn ConnectionTypeResolver>,
    outputs: Arc<dyn OutputTypeResolver>,
    parameters: Arc<dyn ParameterTypeResolver>,
    answers: Arc<dyn AnswerTypeResolver>,
    statuses: Arc<dyn StatusTypeResolver>,
    cache_capacity: NonZeroUsize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            functions: library(),
            data: HashMap::new(),
            default_data: None,
            secrets: Arc::new(NoOpResolver),
            connections: Arc::new(NoOpResolver),
            outputs: Arc::new(NoOpResolver),
            parameters: Arc::new(NoOpResolver),
            answers: Arc::new(NoOpResolver),
            statuses: Arc::new(NoOpResolver),
            cache_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the function map. Use [`library`] plus
    /// [`FunctionMap::extend`] to add functions to the standard library.
    pub fn with_functions(mut self, functions: FunctionMap) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_data_resolver(mut self, name: impl Into<String>, resolver: Arc<dyn DataTypeResolver>) -> Self {
        self.data.insert(name.into(), resolver);
        self
    }

    /// Register a data resolver and use it when `$type: Data` names none.
    pub fn with_default_data_resolver(
        mut self,
        name: impl Into<String>,
        resolver: Arc<dyn DataTypeResolver>,
    ) -> Self {
        let name = name.into();
        self.data.insert(name.clone(), resolver);
        self.default_data = Some(name);
        self
    }

    pub fn with_secret_resolver(mut self, resolver: Arc<dyn SecretTypeResolver>) -> Self {
        self.secrets = resolver;
        self
    }

    pub fn with_connection_resolver(mut self, resolver: Arc<dyn ConnectionTypeResolver>) -> Self {
        self.connections = resolver;
        self
    }

    pub fn with_output_resolver(mut self, resolver: Arc<dyn OutputTypeResolver>) -> Self {
        self.outputs = resolver;
        self
    }

    pub fn with_parameter_resolver(mut self, resolver: Arc<dyn ParameterTypeResolver>) -> Self {
        self.parameters = resolver;
        self
    }

    pub fn with_answer_resolver(mut self, resolver: Arc<dyn AnswerTypeResolver>) -> Self {
        self.answers = resolver;
        self
    }

    pub fn with_status_resolver(mut self, resolver: Arc<dyn StatusTypeResolver>) -> Self {
        self.statuses = resolver;
        self
    }

    /// Capacity of the compiled-expression cache. Zero is treated as one.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    /// The named data resolver; the empty name selects the default one.
    pub fn data_resolver(&self, name: &str) -> Option<&Arc<dyn DataTypeResolver>> {
        let name = if name.is_empty() {
            self.default_data.as_deref()?
        } else {
            name
        };
        self.data.get(name)
    }

    pub fn default_data_resolver_name(&self) -> Option<&str> {
        self.default_data.as_deref()
    }

    pub fn secret_resolver(&self) -> &Arc<dyn SecretTypeResolver> {
        &self.secrets
    }

    pub fn connection_resolver(&self) -> &Arc<dyn ConnectionTypeResolver> {
        &self.connections
    }

    pub fn output_resolver(&self) -> &Arc<dyn OutputTypeResolver> {
        &self.outputs
    }

    pub fn parameter_resolver(&self) -> &Arc<dyn ParameterTypeResolver> {
        &self.parameters
    }

    pub fn answer_resolver(&self) -> &Arc<dyn AnswerTypeResolver> {
        &self.answers
    }

    pub fn status_resolver(&self) -> &Arc<dyn StatusTypeResolver> {
        &self.statuses
    }

    pub fn cache_capacity(&self) -> NonZeroUsize {
        self.cache_capacity
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data: Vec<_> = self.data.keys().collect();
        data.sort_unstable();
        f.debug_struct("Options")
            .field("functions", &self.functions)
            .field("data", &data)
            .field("default_data", &self.default_data)
            .field("cache_capacity", &self.cache_capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryDataTypeResolver;

    #[test]
    fn test_default_data_resolver_is_selected_by_empty_name() {
        let options = Options::default()
            .with_data_resolver("other", Arc::new(MemoryDataTypeResolver::new("x")))
            .with_default_data_resolver("main", Arc::new(MemoryDataTypeResolver::new("y")));
        assert!(options.data_resolver("").is_some());
        assert!(options.data_resolver("other").is_some());
        assert!(options.data_resolver("missing").is_none());
        assert!(Options::default().data_resolver("").is_none());
    }

    #[test]
    fn test_cache_capacity_is_never_zero() {
        assert_eq!(Options::default().with_cache_capacity(0).cache_capacity().get(), 1);
        assert_eq!(Options::default().cache_capacity().get(), 1000);
    }
}
