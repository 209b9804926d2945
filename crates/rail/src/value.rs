//! # Event Payloads
//!
//! [`Value`] is the dynamic payload carried by every emission. Arrays and objects are
//! reference types: cloning a `Value` hands out another handle to the same data, so a
//! mutation made through one handle is visible through every other. This is what a
//! listener sees when clone-on-emit is disabled.
//!
//! [`Value::deep_clone`] is the isolation primitive. It rebuilds every array and object
//! so the copy shares no mutable substructure with the source:
//!
//! - `Undefined`, `Null`, booleans, numbers and strings are copied as-is
//! - dates become a new date with the same instant
//! - patterns become a new pattern with the same source and flags
//! - arrays are rebuilt element by element, order preserved
//! - objects are rebuilt key by key, insertion order preserved
//!
//! Cycles are not detected. A structure that contains itself recurses until the
//! stack is exhausted.

use crate::error::BusError;
use crate::utils::{read, write};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::{Arc, RwLock};

/// Shared, interior-mutable storage used for reference-typed payload nodes.
pub type Shared<T> = Arc<RwLock<T>>;

fn shared<T>(inner: T) -> Shared<T> {
    Arc::new(RwLock::new(inner))
}

/// Dynamic event payload.
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Regex(Pattern),
    Array(Shared<Vec<Value>>),
    Object(Shared<Map>),
}

impl Value {
    /// Creates a new array node owning `items`.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(shared(items))
    }

    /// Creates a new object node owning `map`.
    pub fn object(map: Map) -> Self {
        Value::Object(shared(map))
    }

    /// Creates an object from key/value pairs, keeping their order.
    pub fn object_from<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Map::new();
        for (key, value) in entries {
            map.insert(key, value);
        }
        Value::object(map)
    }

    /// Compiles a pattern payload.
    pub fn regex(source: &str, flags: &str) -> Result<Self, BusError> {
        Pattern::new(source, flags).map(Value::Regex)
    }

    /// Produces a copy that shares no mutable substructure with `self`.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::Undefined => Value::Undefined,
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Number(n) => Value::Number(*n),
            Value::String(s) => Value::String(s.clone()),
            Value::Date(instant) => Value::Date(*instant),
            Value::Regex(pattern) => Value::Regex(pattern.clone()),
            Value::Array(items) => {
                let copy = read(items).iter().map(Value::deep_clone).collect();
                Value::array(copy)
            }
            Value::Object(map) => {
                let copy = read(map)
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.deep_clone()))
                    .collect();
                Value::object(copy)
            }
        }
    }

    /// True when both values are the same array or object node.
    ///
    /// Scalars have no identity and always compare false.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Regex(_) => "regex",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(instant) => Some(*instant),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Pattern> {
        match self {
            Value::Regex(pattern) => Some(pattern),
            _ => None,
        }
    }

    /// Looks up a field of an object. The returned value is a handle, not a copy.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => read(map).get(key).cloned(),
            _ => None,
        }
    }

    /// Sets a field on an object. Returns `false` if `self` is not an object.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(map) => {
                write(map).insert(key, value);
                true
            }
            _ => false,
        }
    }

    /// Removes a field from an object, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(map) => write(map).remove(key),
            _ => None,
        }
    }

    /// Element of an array by position.
    pub fn at(&self, index: usize) -> Option<Value> {
        match self {
            Value::Array(items) => read(items).get(index).cloned(),
            _ => None,
        }
    }

    /// Appends to an array. Returns `false` if `self` is not an array.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        match self {
            Value::Array(items) => {
                write(items).push(value.into());
                true
            }
            _ => false,
        }
    }

    /// Element count for arrays and objects.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Array(items) => Some(read(items).len()),
            Value::Object(map) => Some(read(map).len()),
            _ => None,
        }
    }

    /// Object keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Value::Object(map) => read(map).keys().map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    /// Renders the payload as JSON.
    ///
    /// Dates become RFC 3339 strings, patterns become `/source/flags` and
    /// `Undefined` becomes `null`. Non-finite numbers also become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undefined | Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(instant) => serde_json::Value::String(
                instant.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            Value::Regex(pattern) => serde_json::Value::String(pattern.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(read(items).iter().map(Value::to_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                read(map)
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Arc::ptr_eq(a, b) || *read(a) == *read(b)
            }
            (Value::Object(a), Value::Object(b)) => {
                Arc::ptr_eq(a, b) || *read(a) == *read(b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Date(instant) => write!(f, "Date({})", instant.to_rfc3339()),
            Value::Regex(pattern) => write!(f, "{pattern}"),
            Value::Array(items) => f.debug_list().entries(read(items).iter()).finish(),
            Value::Object(map) => f
                .debug_map()
                .entries(read(map).iter().map(|(k, v)| (k.to_string(), v)))
                .finish(),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::object_from(fields),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(instant: DateTime<Utc>) -> Self {
        Value::Date(instant)
    }
}

impl From<Pattern> for Value {
    fn from(pattern: Pattern) -> Self {
        Value::Regex(pattern)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Insertion-ordered string-keyed map backing object payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map {
    entries: Vec<(String, Value)>,
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Inserts or replaces a field. A replaced field keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = Map::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// A compiled regular expression payload that remembers its source and flags.
///
/// Flags `i`, `m`, `s`, `x` and `U` configure matching; any other flag (`g`, `y`, ...)
/// is kept verbatim so it survives a clone.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    flags: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: &str, flags: &str) -> Result<Self, BusError> {
        let mut builder = RegexBuilder::new(source);
        for flag in flags.chars() {
            match flag {
                'i' => builder.case_insensitive(true),
                'm' => builder.multi_line(true),
                's' => builder.dot_matches_new_line(true),
                'x' => builder.ignore_whitespace(true),
                'U' => builder.swap_greed(true),
                _ => &mut builder,
            };
        }

        let regex = builder.build().map_err(|e| BusError::InvalidPattern {
            pattern: source.to_string(),
            flags: flags.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
