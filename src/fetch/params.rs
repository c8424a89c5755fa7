// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Request parameters and their (shallow) equality.
//!
//! Primitive values compare by value. Nested values (arrays, objects) are
//! held behind an `Arc` and compare by *identity*: two structurally equal
//! but separately built nested values are different params. This keeps the
//! check cheap and makes callers reuse the same nested value when they mean
//! "unchanged".

use std::collections::BTreeMap;
use std::sync::Arc;
use serde_json::Value;

/// A single request parameter value.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Array or object, compared by pointer
    Nested(Arc<Value>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Strict equality: value for primitives, identity for nested values.
/// `NaN` is never equal to itself.
impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Nested(a), Self::Nested(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(n) => write!(f, "{}", n),
            Self::Str(s) => write!(f, "{}", s),
            Self::Nested(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self { Self::Bool(v) }
}
impl From<i32> for ParamValue {
    fn from(v: i32) -> Self { Self::Int(v as i64) }
}
impl From<i64> for ParamValue {
    fn from(v: i64) -> Self { Self::Int(v) }
}
impl From<u32> for ParamValue {
    fn from(v: u32) -> Self { Self::Int(v as i64) }
}
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self { Self::Float(v) }
}
impl From<&str> for ParamValue {
    fn from(v: &str) -> Self { Self::Str(v.to_string()) }
}
impl From<String> for ParamValue {
    fn from(v: String) -> Self { Self::Str(v) }
}
impl From<Arc<Value>> for ParamValue {
    fn from(v: Arc<Value>) -> Self { Self::Nested(v) }
}

impl From<Value> for ParamValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Str(s),
            nested => Self::Nested(Arc::new(nested)),
        }
    }
}

/// Named request parameters. Keys are kept sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchParams(BTreeMap<String, ParamValue>);

impl FetchParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// The `language` param, if present and a string.
    pub fn language(&self) -> Option<&str> {
        self.get("language").and_then(ParamValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Build from a JSON object. Non-object values yield empty params.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
            _ => Self::default(),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for FetchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Shallow params comparison.
///
/// Equal iff `previous` exists, both have the same key set, and every value
/// is strictly equal (see [`ParamValue`]). A missing previous record means
/// nothing was fetched with tracked params yet, so it never matches.
pub fn are_params_equal(previous: Option<&FetchParams>, current: &FetchParams) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    previous.len() == current.len()
        && previous
            .iter()
            .zip(current.iter())
            .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
}
