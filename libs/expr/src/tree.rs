//! The value model evaluated by this crate
//!
//! A [`Tree`] is a JSON-compatible document that may additionally hold lazy
//! handles ([`Thunk`]) and opaque host values ([`Foreign`]). Evaluation never
//! mutates a tree; it produces new ones.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Error, Result};
use crate::expand::Expandable;

#[derive(Clone, Copy, Debug)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// The integral value, if this number has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            Number::Float(_) => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Shared handle to a lazily evaluated value.
#[derive(Clone)]
pub struct Thunk(Arc<dyn Expandable>);

impl Thunk {
    pub fn new(expandable: impl Expandable + 'static) -> Self {
        Thunk(Arc::new(expandable))
    }

    pub fn expandable(&self) -> &dyn Expandable {
        self.0.as_ref()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thunk({:p})", Arc::as_ptr(&self.0))
    }
}

/// An opaque value produced by a host resolver. It can travel through a
/// tree but is never a valid evaluation result.
#[derive(Clone)]
pub struct Foreign {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Foreign {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Foreign {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Foreign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Foreign({})", self.type_name)
    }
}

#[derive(Clone, Debug, Default)]
pub enum Tree {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Tree>),
    Mapping(BTreeMap<String, Tree>),
    Thunk(Thunk),
    Foreign(Foreign),
}

impl Tree {
    pub fn thunk(expandable: impl Expandable + 'static) -> Self {
        Tree::Thunk(Thunk::new(expandable))
    }

    pub fn foreign<T: Any + Send + Sync>(value: T) -> Self {
        Tree::Foreign(Foreign::new(value))
    }

    /// Build a mapping from key/value pairs.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Tree)>,
    {
        Tree::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The child at `key`: a mapping field by name or a sequence item by
    /// index. Structural misses are [`Error::PathNotFound`].
    pub(crate) fn child(&self, key: &Tree) -> Result<Tree> {
        match (self, key) {
            (Tree::Mapping(fields), Tree::String(name)) => fields
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PathNotFound(format!("no key {name:?}"))),
            (Tree::Sequence(items), Tree::Number(n)) => {
                let index = n
                    .as_i64()
                    .ok_or_else(|| Error::Type(format!("sequence index must be an integer, got {n}")))?;
                usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()
                    .ok_or_else(|| {
                        Error::PathNotFound(format!(
                            "index {index} out of range for sequence of length {}",
                            items.len()
                        ))
                    })
            }
            (Tree::Null, key) => Err(Error::PathNotFound(format!(
                "cannot look up {} in null",
                describe_key(key)
            ))),
            (target, key) => Err(Error::Type(format!(
                "cannot look up {} in {}",
                describe_key(key),
                target.type_name()
            ))),
        }
    }

    /// Name of the node kind, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Tree::Null => "null",
            Tree::Bool(_) => "boolean",
            Tree::Number(_) => "number",
            Tree::String(_) => "string",
            Tree::Sequence(_) => "sequence",
            Tree::Mapping(_) => "mapping",
            Tree::Thunk(_) => "thunk",
            Tree::Foreign(foreign) => foreign.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Tree::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tree::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Vec<Tree>> {
        match self {
            Tree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Tree>> {
        match self {
            Tree::Mapping(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Tree> {
        self.as_mapping().and_then(|fields| fields.get(key))
    }

    /// Convert into a `serde_json::Value`. Thunks, foreign values and
    /// non-finite floats have no JSON form.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(match self {
            Tree::Null => serde_json::Value::Null,
            Tree::Bool(b) => serde_json::Value::Bool(*b),
            Tree::Number(Number::Int(i)) => serde_json::Value::from(*i),
            Tree::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::UnsupportedValue {
                    type_name: format!("non-finite number {f}"),
                })?,
            Tree::String(s) => serde_json::Value::String(s.clone()),
            Tree::Sequence(items) => serde_json::Value::Array(
                items.iter().map(Tree::to_json).collect::<Result<_>>()?,
            ),
            Tree::Mapping(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_json()?)))
                    .collect::<Result<_>>()?,
            ),
            Tree::Thunk(_) | Tree::Foreign(_) => {
                return Err(Error::UnsupportedValue {
                    type_name: self.type_name().to_string(),
                })
            }
        })
    }
}

fn describe_key(key: &Tree) -> String {
    match key {
        Tree::String(name) => format!("key {name:?}"),
        Tree::Number(n) => format!("index {n}"),
        other => format!("a {} key", other.type_name()),
    }
}

/// Shallow validation: a node that may never be an evaluation result.
pub(crate) fn check_supported(tree: &Tree) -> Result<()> {
    match tree {
        Tree::Foreign(foreign) => Err(Error::UnsupportedValue {
            type_name: foreign.type_name().to_string(),
        }),
        Tree::Number(n) if !n.is_finite() => Err(Error::UnsupportedValue {
            type_name: format!("non-finite number {n}"),
        }),
        _ => Ok(()),
    }
}

/// Deep validation down to (but not into) thunks.
pub(crate) fn check_supported_deep(tree: &Tree) -> Result<()> {
    check_supported(tree)?;
    match tree {
        Tree::Sequence(items) => items.iter().try_for_each(check_supported_deep),
        Tree::Mapping(fields) => fields.values().try_for_each(check_supported_deep),
        _ => Ok(()),
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tree::Null, Tree::Null) => true,
            (Tree::Bool(a), Tree::Bool(b)) => a == b,
            (Tree::Number(a), Tree::Number(b)) => a == b,
            (Tree::String(a), Tree::String(b)) => a == b,
            (Tree::Sequence(a), Tree::Sequence(b)) => a == b,
            (Tree::Mapping(a), Tree::Mapping(b)) => a == b,
            (Tree::Thunk(a), Tree::Thunk(b)) => Arc::ptr_eq(&a.0, &b.0),
            (Tree::Foreign(a), Tree::Foreign(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Tree::Null => serializer.serialize_unit(),
            Tree::Bool(b) => serializer.serialize_bool(*b),
            Tree::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Tree::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Tree::String(s) => serializer.serialize_str(s),
            Tree::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Tree::Mapping(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (key, value) in fields {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Tree::Thunk(_) => Err(S::Error::custom("cannot serialize an unevaluated thunk")),
            Tree::Foreign(foreign) => Err(S::Error::custom(format!(
                "cannot serialize a value of type {}",
                foreign.type_name()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Tree::from)
    }
}

impl From<serde_json::Value> for Tree {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Tree::Null,
            serde_json::Value::Bool(b) => Tree::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Tree::Number(Number::Int(i)),
                None => Tree::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => Tree::String(s),
            serde_json::Value::Array(items) => {
                Tree::Sequence(items.into_iter().map(Tree::from).collect())
            }
            serde_json::Value::Object(fields) => {
                Tree::Mapping(fields.into_iter().map(|(k, v)| (k, Tree::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Tree {
    fn from(s: &str) -> Self {
        Tree::String(s.to_string())
    }
}

impl From<String> for Tree {
    fn from(s: String) -> Self {
        Tree::String(s)
    }
}

impl From<bool> for Tree {
    fn from(b: bool) -> Self {
        Tree::Bool(b)
    }
}

impl From<i64> for Tree {
    fn from(i: i64) -> Self {
        Tree::Number(Number::Int(i))
    }
}

impl From<f64> for Tree {
    fn from(f: f64) -> Self {
        Tree::Number(Number::Float(f))
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(items: Vec<Tree>) -> Self {
        Tree::Sequence(items)
    }
}

impl From<BTreeMap<String, Tree>> for Tree {
    fn from(fields: BTreeMap<String, Tree>) -> Self {
        Tree::Mapping(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_keeps_integers() {
        let tree = Tree::from(json!({"a": 1, "b": 1.5, "c": [true, null, "x"]}));
        assert_eq!(tree.get("a"), Some(&Tree::Number(Number::Int(1))));
        assert_eq!(tree.get("b"), Some(&Tree::Number(Number::Float(1.5))));
        assert_eq!(
            tree.to_json().unwrap(),
            json!({"a": 1, "b": 1.5, "c": [true, null, "x"]})
        );
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        assert_eq!(Tree::from(2_i64), Tree::from(2.0));
        assert_ne!(Tree::from(2_i64), Tree::from(2.5));
        assert_eq!(Number::Float(3.0).as_i64(), Some(3));
        assert_eq!(Number::Float(3.5).as_i64(), None);
    }

    #[test]
    fn test_foreign_values_have_no_json_form() {
        let tree = Tree::mapping([("x", Tree::foreign(42_u8))]);
        assert!(matches!(
            tree.to_json(),
            Err(Error::UnsupportedValue { type_name }) if type_name == "u8"
        ));
        assert!(serde_json::to_string(&tree).is_err());
        assert!(check_supported_deep(&tree).is_err());
        assert!(check_supported(&tree).is_ok());
    }

    #[test]
    fn test_non_finite_floats_are_unsupported() {
        assert!(check_supported(&Tree::from(f64::NAN)).is_err());
        assert!(Tree::from(f64::INFINITY).to_json().is_err());
    }

    #[test]
    fn test_deserialize_from_json_text() {
        let tree: Tree = serde_json::from_str(r#"{"$type": "Secret", "name": "foo"}"#).unwrap();
        assert_eq!(tree.get("$type").and_then(Tree::as_str), Some("Secret"));
    }
}
