//! In-memory resolvers, for tests and for callers that already hold every
//! value up front.

use std::collections::BTreeMap;

use super::{
    AnswerTypeResolver, ConnectionTypeResolver, DataTypeResolver, OutputTypeResolver,
    ParameterTypeResolver, SecretTypeResolver, StatusTypeResolver,
};
use crate::context::Context;
use crate::error::Result;
use crate::tree::Tree;

type Nested<V> = BTreeMap<String, BTreeMap<String, V>>;

fn nested_get<V: Clone>(map: &Nested<V>, outer: &str, inner: &str) -> Option<V> {
    map.get(outer).and_then(|m| m.get(inner)).cloned()
}

fn nested_insert<V>(map: &mut Nested<V>, outer: impl Into<String>, inner: impl Into<String>, value: V) {
    map.entry(outer.into()).or_default().insert(inner.into(), value);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryDataTypeResolver {
    document: Tree,
}

impl MemoryDataTypeResolver {
    pub fn new(document: impl Into<Tree>) -> Self {
        Self {
            document: document.into(),
        }
    }
}

impl DataTypeResolver for MemoryDataTypeResolver {
    fn resolve_data(&self, _ctx: &Context) -> Result<Option<Tree>> {
        Ok(Some(self.document.clone()))
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemorySecretTypeResolver {
    secrets: BTreeMap<String, String>,
}

impl MemorySecretTypeResolver {
    pub fn new<K, V, I>(secrets: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            secrets: secrets
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

impl SecretTypeResolver for MemorySecretTypeResolver {
    fn resolve_secret(&self, _ctx: &Context, name: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(name).cloned())
    }

    fn resolve_all_secrets(&self, _ctx: &Context) -> Result<BTreeMap<String, String>> {
        Ok(self.secrets.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryConnectionTypeResolver {
    connections: Nested<Tree>,
}

impl MemoryConnectionTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        connection_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<Tree>,
    ) -> Self {
        nested_insert(&mut self.connections, connection_type, name, value.into());
        self
    }
}

impl ConnectionTypeResolver for MemoryConnectionTypeResolver {
    fn resolve_connection(
        &self,
        _ctx: &Context,
        connection_type: &str,
        name: &str,
    ) -> Result<Option<Tree>> {
        Ok(nested_get(&self.connections, connection_type, name))
    }

    fn resolve_all_connections(&self, _ctx: &Context) -> Result<Nested<Tree>> {
        Ok(self.connections.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryOutputTypeResolver {
    outputs: Nested<Tree>,
}

impl MemoryOutputTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, from: impl Into<String>, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        nested_insert(&mut self.outputs, from, name, value.into());
        self
    }
}

impl OutputTypeResolver for MemoryOutputTypeResolver {
    fn resolve_output(&self, _ctx: &Context, from: &str, name: &str) -> Result<Option<Tree>> {
        Ok(nested_get(&self.outputs, from, name))
    }

    fn resolve_all_outputs(&self, _ctx: &Context) -> Result<Nested<Tree>> {
        Ok(self.outputs.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryParameterTypeResolver {
    parameters: BTreeMap<String, Tree>,
}

impl MemoryParameterTypeResolver {
    pub fn new<K, V, I>(parameters: I) -> Self
    where
        K: Into<String>,
        V: Into<Tree>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            parameters: parameters
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }
}

impl ParameterTypeResolver for MemoryParameterTypeResolver {
    fn resolve_parameter(&self, _ctx: &Context, name: &str) -> Result<Option<Tree>> {
        Ok(self.parameters.get(name).cloned())
    }

    fn resolve_all_parameters(&self, _ctx: &Context) -> Result<BTreeMap<String, Tree>> {
        Ok(self.parameters.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryAnswerTypeResolver {
    answers: Nested<Tree>,
}

impl MemoryAnswerTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, ask_ref: impl Into<String>, name: impl Into<String>, value: impl Into<Tree>) -> Self {
        nested_insert(&mut self.answers, ask_ref, name, value.into());
        self
    }
}

impl AnswerTypeResolver for MemoryAnswerTypeResolver {
    fn resolve_answer(&self, _ctx: &Context, ask_ref: &str, name: &str) -> Result<Option<Tree>> {
        Ok(nested_get(&self.answers, ask_ref, name))
    }

    fn resolve_all_answers(&self, _ctx: &Context) -> Result<Nested<Tree>> {
        Ok(self.answers.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStatusTypeResolver {
    statuses: Nested<bool>,
}

impl MemoryStatusTypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, property: impl Into<String>, value: bool) -> Self {
        nested_insert(&mut self.statuses, name, property, value);
        self
    }
}

impl StatusTypeResolver for MemoryStatusTypeResolver {
    fn resolve_status(&self, _ctx: &Context, name: &str, property: &str) -> Result<Option<bool>> {
        Ok(nested_get(&self.statuses, name, property))
    }

    fn resolve_all_statuses(&self, _ctx: &Context) -> Result<Nested<bool>> {
        Ok(self.statuses.clone())
    }
}
