// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Chimp value representation.

use super::function::{Builtin, Closure, CompiledFunction};
use crate::error::RuntimeError;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Backing map of a hash value, keyed by the hashable form of each key.
pub type HashEntries = FxHashMap<HashKey, HashPair>;

/// A Chimp value.
///
/// Aggregates are reference counted with `Arc`, so values are cheap to
/// clone and can be moved between threads.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// Boolean value
    Boolean(bool),
    /// null
    Null,
    /// Immutable string
    String(Arc<str>),
    /// Array of values
    Array(Arc<Vec<Value>>),
    /// Hash of key/value pairs
    Hash(Arc<HashEntries>),
    /// Compiled-function template from the constant pool
    Function(Arc<CompiledFunction>),
    /// Function template plus its captured free variables
    Closure(Arc<Closure>),
    /// Native function from the builtin registry
    Builtin(&'static Builtin),
}

/// The hashable subset of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    /// Integer key
    Integer(i64),
    /// Boolean key
    Boolean(bool),
    /// String key
    String(Arc<str>),
}

/// A hash entry, keeping the original key value for display.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    /// The key as written
    pub key: Value,
    /// The associated value
    pub value: Value,
}

impl TryFrom<&Value> for HashKey {
    type Error = RuntimeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Integer(n) => Ok(HashKey::Integer(*n)),
            Value::Boolean(b) => Ok(HashKey::Boolean(*b)),
            Value::String(s) => Ok(HashKey::String(Arc::clone(s))),
            other => Err(RuntimeError::UnusableHashKey(other.type_name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

impl Value {
    /// Creates a string value.
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    /// Creates an array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Arc::new(elements))
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness: `false`, `null`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Null => false,
            Value::Integer(n) => *n != 0,
            Value::String(s) => !s.is_empty(),
            Value::Array(_)
            | Value::Hash(_)
            | Value::Function(_)
            | Value::Closure(_)
            | Value::Builtin(_) => true,
        }
    }

    /// Equality as seen by `==` in the language: primitives compare by
    /// value, aggregates and functions by identity.
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Hash(a), Value::Hash(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// Returns the type of this value as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::Null => "NULL",
            Value::String(_) => "STRING",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
        }
    }

    /// Renders the value the way the REPL prints it.
    pub fn inspect(&self) -> String {
        self.to_string()
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s.as_ref()),
            other => write!(f, "{other}"),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Null => f.write_str("null"),
            Value::String(s) => f.write_str(s),
            Value::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    element.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Hash(pairs) => {
                let mut entries: Vec<(String, &HashPair)> = pairs
                    .values()
                    .map(|pair| (pair.key.to_string(), pair))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));

                f.write_str("{")?;
                for (i, (_, pair)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    pair.key.fmt_nested(f)?;
                    f.write_str(": ")?;
                    pair.value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Value::Function(func) => match &func.name {
                Some(name) => write!(f, "<compiled func {name}>"),
                None => f.write_str("<compiled func>"),
            },
            Value::Closure(closure) => match &closure.function.name {
                Some(name) => write!(f, "<func {name}>"),
                None => f.write_str("<func>"),
            },
            Value::Builtin(builtin) => write!(f, "<builtin {}>", builtin.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(Value, Value)]) -> Value {
        let mut map = HashEntries::default();
        for (key, value) in pairs {
            map.insert(
                HashKey::try_from(key).unwrap(),
                HashPair {
                    key: key.clone(),
                    value: value.clone(),
                },
            );
        }
        Value::Hash(Arc::new(map))
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(-3).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn test_hash_keys() {
        assert_eq!(HashKey::try_from(&Value::from("a")).unwrap(), HashKey::String("a".into()));
        assert_eq!(HashKey::try_from(&Value::Integer(1)).unwrap(), HashKey::Integer(1));
        assert_eq!(
            HashKey::try_from(&Value::array(vec![])),
            Err(RuntimeError::UnusableHashKey("ARRAY"))
        );
        assert_eq!(
            HashKey::try_from(&Value::Null),
            Err(RuntimeError::UnusableHashKey("NULL"))
        );
    }

    #[test]
    fn test_identity_equality() {
        let a = Value::array(vec![Value::Integer(1)]);
        let b = Value::array(vec![Value::Integer(1)]);
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert_eq!(a, b);
        assert!(Value::from("x").identical(&Value::from("x")));
        assert!(!Value::Integer(1).identical(&Value::Boolean(true)));
    }

    #[test]
    fn test_inspect() {
        assert_eq!(Value::Integer(-5).inspect(), "-5");
        assert_eq!(Value::from("hi").inspect(), "hi");
        assert_eq!(
            Value::array(vec![Value::Integer(1), Value::from("two"), Value::Null]).inspect(),
            "[1, \"two\", null]"
        );
        let h = hash(&[
            (Value::from("b"), Value::Integer(2)),
            (Value::from("a"), Value::Integer(1)),
        ]);
        assert_eq!(h.inspect(), "{\"a\": 1, \"b\": 2}");
    }
}
