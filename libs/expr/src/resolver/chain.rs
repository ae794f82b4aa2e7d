//! Fallback chains: resolvers consulted in priority order
//!
//! Single lookups return the first `Some`. Bulk lookups merge every
//! resolver's answer, and on conflicting keys the earlier resolver wins.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{
    AnswerTypeResolver, ConnectionTypeResolver, DataTypeResolver, OutputTypeResolver,
    ParameterTypeResolver, SecretTypeResolver, StatusTypeResolver,
};
use crate::context::Context;
use crate::error::Result;
use crate::tree::Tree;

fn first_some<R: ?Sized, T>(
    resolvers: &[Arc<R>],
    mut lookup: impl FnMut(&R) -> Result<Option<T>>,
) -> Result<Option<T>> {
    for resolver in resolvers {
        if let Some(found) = lookup(resolver.as_ref())? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn merge_flat<R: ?Sized, V>(
    resolvers: &[Arc<R>],
    mut bulk: impl FnMut(&R) -> Result<BTreeMap<String, V>>,
) -> Result<BTreeMap<String, V>> {
    let mut merged = BTreeMap::new();
    for resolver in resolvers {
        for (key, value) in bulk(resolver.as_ref())? {
            merged.entry(key).or_insert(value);
        }
    }
    Ok(merged)
}

fn merge_nested<R: ?Sized, V>(
    resolvers: &[Arc<R>],
    mut bulk: impl FnMut(&R) -> Result<BTreeMap<String, BTreeMap<String, V>>>,
) -> Result<BTreeMap<String, BTreeMap<String, V>>> {
    let mut merged: BTreeMap<String, BTreeMap<String, V>> = BTreeMap::new();
    for resolver in resolvers {
        for (outer, inner) in bulk(resolver.as_ref())? {
            let entry = merged.entry(outer).or_default();
            for (key, value) in inner {
                entry.entry(key).or_insert(value);
            }
        }
    }
    Ok(merged)
}

#[derive(Clone, Default)]
pub struct ChainDataTypeResolvers {
    resolvers: Vec<Arc<dyn DataTypeResolver>>,
}

impl ChainDataTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn DataTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl DataTypeResolver for ChainDataTypeResolvers {
    fn resolve_data(&self, ctx: &Context) -> Result<Option<Tree>> {
        first_some(&self.resolvers, |r| r.resolve_data(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainSecretTypeResolvers {
    resolvers: Vec<Arc<dyn SecretTypeResolver>>,
}

impl ChainSecretTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn SecretTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl SecretTypeResolver for ChainSecretTypeResolvers {
    fn resolve_secret(&self, ctx: &Context, name: &str) -> Result<Option<String>> {
        first_some(&self.resolvers, |r| r.resolve_secret(ctx, name))
    }

    fn resolve_all_secrets(&self, ctx: &Context) -> Result<BTreeMap<String, String>> {
        merge_flat(&self.resolvers, |r| r.resolve_all_secrets(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainConnectionTypeResolvers {
    resolvers: Vec<Arc<dyn ConnectionTypeResolver>>,
}

impl ChainConnectionTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn ConnectionTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl ConnectionTypeResolver for ChainConnectionTypeResolvers {
    fn resolve_connection(
        &self,
        ctx: &Context,
        connection_type: &str,
        name: &str,
    ) -> Result<Option<Tree>> {
        first_some(&self.resolvers, |r| {
            r.resolve_connection(ctx, connection_type, name)
        })
    }

    fn resolve_all_connections(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        merge_nested(&self.resolvers, |r| r.resolve_all_connections(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainOutputTypeResolvers {
    resolvers: Vec<Arc<dyn OutputTypeResolver>>,
}

impl ChainOutputTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn OutputTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl OutputTypeResolver for ChainOutputTypeResolvers {
    fn resolve_output(&self, ctx: &Context, from: &str, name: &str) -> Result<Option<Tree>> {
        first_some(&self.resolvers, |r| r.resolve_output(ctx, from, name))
    }

    fn resolve_all_outputs(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        merge_nested(&self.resolvers, |r| r.resolve_all_outputs(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainParameterTypeResolvers {
    resolvers: Vec<Arc<dyn ParameterTypeResolver>>,
}

impl ChainParameterTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn ParameterTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl ParameterTypeResolver for ChainParameterTypeResolvers {
    fn resolve_parameter(&self, ctx: &Context, name: &str) -> Result<Option<Tree>> {
        first_some(&self.resolvers, |r| r.resolve_parameter(ctx, name))
    }

    fn resolve_all_parameters(&self, ctx: &Context) -> Result<BTreeMap<String, Tree>> {
        merge_flat(&self.resolvers, |r| r.resolve_all_parameters(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainAnswerTypeResolvers {
    resolvers: Vec<Arc<dyn AnswerTypeResolver>>,
}

impl ChainAnswerTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn AnswerTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl AnswerTypeResolver for ChainAnswerTypeResolvers {
    fn resolve_answer(&self, ctx: &Context, ask_ref: &str, name: &str) -> Result<Option<Tree>> {
        first_some(&self.resolvers, |r| r.resolve_answer(ctx, ask_ref, name))
    }

    fn resolve_all_answers(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        merge_nested(&self.resolvers, |r| r.resolve_all_answers(ctx))
    }
}

#[derive(Clone, Default)]
pub struct ChainStatusTypeResolvers {
    resolvers: Vec<Arc<dyn StatusTypeResolver>>,
}

impl ChainStatusTypeResolvers {
    pub fn new(resolvers: Vec<Arc<dyn StatusTypeResolver>>) -> Self {
        Self { resolvers }
    }
}

impl StatusTypeResolver for ChainStatusTypeResolvers {
    fn resolve_status(&self, ctx: &Context, name: &str, property: &str) -> Result<Option<bool>> {
        first_some(&self.resolvers, |r| r.resolve_status(ctx, name, property))
    }

    fn resolve_all_statuses(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, bool>>> {
        merge_nested(&self.resolvers, |r| r.resolve_all_statuses(ctx))
    }
}
