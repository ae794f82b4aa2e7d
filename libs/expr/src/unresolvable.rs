//! Accounting for references that cannot be resolved yet
//!
//! Every kind of reference is kept in its own ordered set, so merging two
//! records is a plain set union: idempotent, commutative and free of
//! duplicates.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableData {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableSecret {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableConnection {
    #[serde(rename = "type")]
    pub connection_type: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableOutput {
    pub from: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableParameter {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableAnswer {
    #[serde(rename = "askRef")]
    pub ask_ref: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableStatus {
    pub name: String,
    pub property: String,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnresolvableInvocation {
    pub name: String,
    pub cause: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unresolvable {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub data: BTreeSet<UnresolvableData>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub secrets: BTreeSet<UnresolvableSecret>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub connections: BTreeSet<UnresolvableConnection>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub outputs: BTreeSet<UnresolvableOutput>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub parameters: BTreeSet<UnresolvableParameter>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub answers: BTreeSet<UnresolvableAnswer>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub statuses: BTreeSet<UnresolvableStatus>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub invocations: BTreeSet<UnresolvableInvocation>,
}

impl Unresolvable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.data.insert(UnresolvableData { name: name.into() });
        u
    }

    pub fn secret(name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.secrets.insert(UnresolvableSecret { name: name.into() });
        u
    }

    pub fn connection(connection_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.connections.insert(UnresolvableConnection {
            connection_type: connection_type.into(),
            name: name.into(),
        });
        u
    }

    pub fn output(from: impl Into<String>, name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.outputs.insert(UnresolvableOutput {
            from: from.into(),
            name: name.into(),
        });
        u
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.parameters
            .insert(UnresolvableParameter { name: name.into() });
        u
    }

    pub fn answer(ask_ref: impl Into<String>, name: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.answers.insert(UnresolvableAnswer {
            ask_ref: ask_ref.into(),
            name: name.into(),
        });
        u
    }

    pub fn status(name: impl Into<String>, property: impl Into<String>) -> Self {
        let mut u = Self::new();
        u.statuses.insert(UnresolvableStatus {
            name: name.into(),
            property: property.into(),
        });
        u
    }

    pub fn invocation(name: impl Into<String>, cause: impl ToString) -> Self {
        let mut u = Self::new();
        u.invocations.insert(UnresolvableInvocation {
            name: name.into(),
            cause: cause.to_string(),
        });
        u
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
            && self.secrets.is_empty()
            && self.connections.is_empty()
            && self.outputs.is_empty()
            && self.parameters.is_empty()
            && self.answers.is_empty()
            && self.statuses.is_empty()
            && self.invocations.is_empty()
    }

    /// Total number of missing references across all kinds.
    pub fn len(&self) -> usize {
        self.data.len()
            + self.secrets.len()
            + self.connections.len()
            + self.outputs.len()
            + self.parameters.len()
            + self.answers.len()
            + self.statuses.len()
            + self.invocations.len()
    }

    /// Merge `other` into `self`.
    pub fn extends(&mut self, other: Unresolvable) {
        self.data.extend(other.data);
        self.secrets.extend(other.secrets);
        self.connections.extend(other.connections);
        self.outputs.extend(other.outputs);
        self.parameters.extend(other.parameters);
        self.answers.extend(other.answers);
        self.statuses.extend(other.statuses);
        self.invocations.extend(other.invocations);
    }

    pub fn merged(mut self, other: Unresolvable) -> Self {
        self.extends(other);
        self
    }

    /// `Ok(())` when nothing is missing, otherwise an error listing every
    /// missing reference.
    pub fn as_error(&self) -> Result<(), UnresolvableError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(UnresolvableError {
                unresolvable: self.clone(),
            })
        }
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len());
        lines.extend(self.data.iter().map(|d| format!("data {:?}", d.name)));
        lines.extend(self.secrets.iter().map(|s| format!("secret {:?}", s.name)));
        lines.extend(self.connections.iter().map(|c| {
            format!("connection {:?} of type {:?}", c.name, c.connection_type)
        }));
        lines.extend(
            self.outputs
                .iter()
                .map(|o| format!("output {:?} from step {:?}", o.name, o.from)),
        );
        lines.extend(
            self.parameters
                .iter()
                .map(|p| format!("parameter {:?}", p.name)),
        );
        lines.extend(
            self.answers
                .iter()
                .map(|a| format!("answer {:?} to ask {:?}", a.name, a.ask_ref)),
        );
        lines.extend(
            self.statuses
                .iter()
                .map(|s| format!("status {:?} of action {:?}", s.property, s.name)),
        );
        lines.extend(
            self.invocations
                .iter()
                .map(|i| format!("invocation of function {:?}: {}", i.name, i.cause)),
        );
        lines
    }
}

/// Error form of a non-empty [`Unresolvable`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvableError {
    unresolvable: Unresolvable,
}

impl UnresolvableError {
    pub fn unresolvable(&self) -> &Unresolvable {
        &self.unresolvable
    }

    pub fn into_unresolvable(self) -> Unresolvable {
        self.unresolvable
    }
}

impl fmt::Display for UnresolvableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unresolvable:")?;
        for line in self.unresolvable.lines() {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnresolvableError {}
