// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Canonical cache keys for structured query descriptions.
//!
//! A query description is a tree of mappings, sequences, scalars, and patterns.
//! [`compute_key`] turns it into a stable digest: mapping keys are sorted at every
//! depth, sequence order is kept, absent entries are dropped, and patterns are
//! written as their `/source/flags` literal. The normalized tree is serialized to
//! compact JSON and hashed with SHA-256.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

/// Length of every key produced by [`compute_key`].
pub const KEY_LEN: usize = 64;

/// A structured value fed to the key encoder.
///
/// [`Structured::Mapping`] keeps the caller's insertion order; ordering only matters
/// for display, never for the computed key.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Structured {
    /// A field that was not specified. Dropped from mappings.
    #[default]
    Absent,
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number. Integral values hash like the equal integer.
    Float(f64),
    /// A string.
    String(String),
    /// A regular-expression pattern.
    Pattern(Pattern),
    /// An ordered sequence.
    Sequence(Vec<Structured>),
    /// A mapping of field names to values.
    Mapping(Vec<(String, Structured)>),
}

impl Structured {
    /// Builds a mapping from `(name, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use doccache::key::Structured;
    ///
    /// let filter = Structured::mapping([("age", Structured::from(30)), ("name", "ada".into())]);
    /// ```
    pub fn mapping<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Self>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Builds a sequence from values.
    pub fn sequence<V, I>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Self>,
    {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for [`Structured::Absent`].
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns the canonical JSON form used for hashing.
    #[must_use]
    pub fn to_canonical(&self) -> Value {
        match self {
            Self::Absent | Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Int(n) => Value::from(*n),
            Self::Float(n) => canonical_float(*n),
            Self::String(text) => Value::String(text.clone()),
            Self::Pattern(pattern) => Value::String(pattern.to_string()),
            Self::Sequence(items) => Value::Array(items.iter().map(Self::to_canonical).collect()),
            Self::Mapping(entries) => {
                // Later duplicates replace earlier ones, an absent value removes the field.
                let mut sorted = BTreeMap::new();
                for (name, value) in entries {
                    if value.is_absent() {
                        sorted.remove(name.as_str());
                    } else {
                        sorted.insert(name.as_str(), value);
                    }
                }
                let mut map = Map::with_capacity(sorted.len());
                for (name, value) in sorted {
                    map.insert(name.to_owned(), value.to_canonical());
                }
                Value::Object(map)
            }
        }
    }
}

#[expect(
    clippy::float_cmp,
    clippy::cast_possible_truncation,
    reason = "integral floats inside the i64 range are written as integers"
)]
fn canonical_float(n: f64) -> Value {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if n.is_finite() && n.trunc() == n && (-LIMIT..LIMIT).contains(&n) {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

/// A regular-expression value identified by its text.
///
/// Flags are kept sorted and deduplicated, so `"gi"` and `"ig"` are the same pattern.
///
/// A pattern hashes as its `/source/flags` text, so it shares a key with a plain
/// string of that same text: `Pattern::new("a")` and `"/a/"` are indistinguishable
/// to [`compute_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    flags: String,
}

impl Pattern {
    /// Creates a pattern without flags.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            flags: String::new(),
        }
    }

    /// Sets the pattern flags.
    #[must_use]
    pub fn with_flags(mut self, flags: &str) -> Self {
        let mut chars: Vec<char> = flags.chars().collect();
        chars.sort_unstable();
        chars.dedup();
        self.flags = chars.into_iter().collect();
        self
    }

    /// Returns the pattern source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the normalized flags.
    #[must_use]
    pub fn flags(&self) -> &str {
        &self.flags
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

impl From<&regex::Regex> for Pattern {
    fn from(regex: &regex::Regex) -> Self {
        Self::new(regex.as_str())
    }
}

impl From<regex::Regex> for Pattern {
    fn from(regex: regex::Regex) -> Self {
        Self::from(&regex)
    }
}

/// Computes the canonical cache key of a description.
///
/// The key is 64 lowercase hex characters.
/// Patterns are encoded as their display text, see [`Pattern`].
///
/// # Examples
///
/// ```
/// use doccache::key::{Structured, compute_key};
///
/// let a = Structured::mapping([("b", 2), ("a", 1)]);
/// let b = Structured::mapping([("a", 1), ("b", 2)]);
/// assert_eq!(compute_key(&a), compute_key(&b));
/// ```
#[must_use]
pub fn compute_key(description: &Structured) -> String {
    let canonical = description.to_canonical().to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

impl From<bool> for Structured {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Structured {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<u32> for Structured {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for Structured {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Structured {
    #[expect(clippy::cast_precision_loss, reason = "only values above i64::MAX are widened")]
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for Structured {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Structured {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Structured {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Pattern> for Structured {
    fn from(value: Pattern) -> Self {
        Self::Pattern(value)
    }
}

impl From<&regex::Regex> for Structured {
    fn from(value: &regex::Regex) -> Self {
        Self::Pattern(value.into())
    }
}

impl<T: Into<Self>> From<Vec<T>> for Structured {
    fn from(value: Vec<T>) -> Self {
        Self::sequence(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Structured {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl From<Value> for Structured {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(flag) => Self::Bool(flag),
            Value::Number(n) => n.as_i64().map_or_else(|| n.as_f64().map_or(Self::Null, Self::Float), Self::Int),
            Value::String(text) => Self::String(text),
            Value::Array(items) => Self::sequence(items),
            Value::Object(map) => Self::mapping(map),
        }
    }
}
