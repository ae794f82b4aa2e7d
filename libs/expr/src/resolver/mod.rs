//! Resolver traits for `$type` references and template namespaces
//!
//! The host application implements these traits to connect the evaluator to
//! wherever secrets, connections, step outputs and the rest actually live.
//!
//! Every lookup follows the same convention:
//!
//! * `Ok(Some(value))` - the reference resolved
//! * `Ok(None)` - the reference does not exist (yet); evaluation records it as
//!   unresolvable and carries on
//! * `Err(_)` - the lookup itself failed; evaluation stops
//!
//! Bulk `resolve_all_*` methods back whole-namespace expansion such as
//! `${secrets}`. Their default implementations report nothing.
//!
//! # Example
//!
//! ```rust
//! use weft_expr::{Context, Result, SecretTypeResolver};
//!
//! struct EnvSecrets;
//!
//! impl SecretTypeResolver for EnvSecrets {
//!     fn resolve_secret(&self, _ctx: &Context, name: &str) -> Result<Option<String>> {
//!         Ok(std::env::var(format!("SECRET_{}", name.to_uppercase())).ok())
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use crate::context::Context;
use crate::error::Result;
use crate::tree::Tree;

mod chain;
mod memory;

pub use chain::{
    ChainAnswerTypeResolvers, ChainConnectionTypeResolvers, ChainDataTypeResolvers,
    ChainOutputTypeResolvers, ChainParameterTypeResolvers, ChainSecretTypeResolvers,
    ChainStatusTypeResolvers,
};
pub use memory::{
    MemoryAnswerTypeResolver, MemoryConnectionTypeResolver, MemoryDataTypeResolver,
    MemoryOutputTypeResolver, MemoryParameterTypeResolver, MemorySecretTypeResolver,
    MemoryStatusTypeResolver,
};

/// Root document of a named data source, queried by `$type: Data`.
pub trait DataTypeResolver: Send + Sync {
    fn resolve_data(&self, ctx: &Context) -> Result<Option<Tree>>;
}

pub trait SecretTypeResolver: Send + Sync {
    fn resolve_secret(&self, ctx: &Context, name: &str) -> Result<Option<String>>;

    fn resolve_all_secrets(&self, ctx: &Context) -> Result<BTreeMap<String, String>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

pub trait ConnectionTypeResolver: Send + Sync {
    fn resolve_connection(
        &self,
        ctx: &Context,
        connection_type: &str,
        name: &str,
    ) -> Result<Option<Tree>>;

    /// Connections keyed by type, then by name.
    fn resolve_all_connections(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

pub trait OutputTypeResolver: Send + Sync {
    /// Output `name` of the step `from`.
    fn resolve_output(&self, ctx: &Context, from: &str, name: &str) -> Result<Option<Tree>>;

    /// Outputs keyed by step, then by name.
    fn resolve_all_outputs(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

pub trait ParameterTypeResolver: Send + Sync {
    fn resolve_parameter(&self, ctx: &Context, name: &str) -> Result<Option<Tree>>;

    fn resolve_all_parameters(&self, ctx: &Context) -> Result<BTreeMap<String, Tree>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

pub trait AnswerTypeResolver: Send + Sync {
    /// Answer to question `name` of the ask identified by `ask_ref`.
    fn resolve_answer(&self, ctx: &Context, ask_ref: &str, name: &str) -> Result<Option<Tree>>;

    /// Answers keyed by ask, then by question name.
    fn resolve_all_answers(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, Tree>>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

pub trait StatusTypeResolver: Send + Sync {
    /// A boolean property (such as `succeeded`) of the action `name`.
    fn resolve_status(&self, ctx: &Context, name: &str, property: &str) -> Result<Option<bool>>;

    /// Properties keyed by action, then by property name.
    fn resolve_all_statuses(&self, ctx: &Context) -> Result<BTreeMap<String, BTreeMap<String, bool>>> {
        let _ = ctx;
        Ok(BTreeMap::new())
    }
}

/// Resolver that knows nothing. It is the default for every resolver slot
/// in [`Options`](crate::Options), so every reference it is asked about is
/// reported as unresolvable.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpResolver;

impl DataTypeResolver for NoOpResolver {
    fn resolve_data(&self, _ctx: &Context) -> Result<Option<Tree>> {
        Ok(None)
    }
}

impl SecretTypeResolver for NoOpResolver {
    fn resolve_secret(&self, _ctx: &Context, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

impl ConnectionTypeResolver for NoOpResolver {
    fn resolve_connection(
        &self,
        _ctx: &Context,
        _connection_type: &str,
        _name: &str,
    ) -> Result<Option<Tree>> {
        Ok(None)
    }
}

impl OutputTypeResolver for NoOpResolver {
    fn resolve_output(&self, _ctx: &Context, _from: &str, _name: &str) -> Result<Option<Tree>> {
        Ok(None)
    }
}

impl ParameterTypeResolver for NoOpResolver {
    fn resolve_parameter(&self, _ctx: &Context, _name: &str) -> Result<Option<Tree>> {
        Ok(None)
    }
}

impl AnswerTypeResolver for NoOpResolver {
    fn resolve_answer(&self, _ctx: &Context, _ask_ref: &str, _name: &str) -> Result<Option<Tree>> {
        Ok(None)
    }
}

impl StatusTypeResolver for NoOpResolver {
    fn resolve_status(&self, _ctx: &Context, _name: &str, _property: &str) -> Result<Option<bool>> {
        Ok(None)
    }
}
