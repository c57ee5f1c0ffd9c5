// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Turning raw results into what the caller asked for.
//!
//! A result fetched from the cache and a freshly executed result pass through the
//! same [`reconstitute`] step, so callers cannot tell them apart by shape.

use std::fmt::{self, Debug};
use std::marker::PhantomData;

use doccache_backend::Error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::query::{Query, ResultShape};

const OBJECT_ID_LEN: usize = 24;

/// Describes a document model: its name and how raw data becomes a document.
pub trait Model: Send + Sync + 'static {
    /// The hydrated document type.
    type Document: Send;

    /// The error returned when hydration fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the model name. It is part of every computed cache key.
    fn name(&self) -> &str;

    /// Builds one document from raw data.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` does not describe a valid document.
    fn hydrate(&self, raw: Value) -> Result<Self::Document, Self::Error>;
}

/// A model whose documents deserialize from JSON with `serde`.
///
/// # Examples
///
/// ```
/// use doccache::{JsonModel, Model};
/// use serde_json::json;
///
/// #[derive(serde::Deserialize)]
/// struct Order {
///     total: u32,
/// }
///
/// let orders = JsonModel::<Order>::new("Order");
/// let order = orders.hydrate(json!({"total": 12})).unwrap();
/// assert_eq!(order.total, 12);
/// ```
pub struct JsonModel<T> {
    name: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> JsonModel<T> {
    /// Creates a model named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _document: PhantomData,
        }
    }
}

impl<T> Debug for JsonModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonModel").field("name", &self.name).finish()
    }
}

impl<T> Clone for JsonModel<T> {
    fn clone(&self) -> Self {
        Self::new(self.name.clone())
    }
}

impl<T> Model for JsonModel<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Document = T;
    type Error = serde_json::Error;

    fn name(&self) -> &str {
        &self.name
    }

    fn hydrate(&self, raw: Value) -> Result<T, serde_json::Error> {
        serde_json::from_value(raw)
    }
}

/// The result of a query, in the shape its operation produces.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput<D> {
    /// A count.
    Count(u64),
    /// Raw data: lean queries, distinct values and aggregations.
    Lean(Value),
    /// A single-document lookup.
    One(Option<D>),
    /// A multi-document lookup, in result order.
    Many(Vec<D>),
}

impl<D> QueryOutput<D> {
    /// Returns the count, if this is a count result.
    #[must_use]
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the raw data, if this is a lean result.
    #[must_use]
    pub fn as_lean(&self) -> Option<&Value> {
        match self {
            Self::Lean(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the single document, if any.
    #[must_use]
    pub fn into_one(self) -> Option<D> {
        match self {
            Self::One(doc) => doc,
            _ => None,
        }
    }

    /// Returns the documents. A single document becomes a one-element list.
    #[must_use]
    pub fn into_many(self) -> Vec<D> {
        match self {
            Self::Many(docs) => docs,
            Self::One(doc) => doc.into_iter().collect(),
            Self::Count(_) | Self::Lean(_) => Vec::new(),
        }
    }
}

/// Converts raw data into the result shape of `query`.
///
/// Counts must be numbers. Distinct, aggregate and lean results pass through,
/// optionally with object identifiers recovered. Documents are hydrated through
/// the query's model: a sequence yields [`QueryOutput::Many`], null yields an
/// empty [`QueryOutput::One`], anything else a single document.
///
/// # Errors
///
/// Returns a hydration error when a count is not a non-negative integer or when
/// the model rejects a document.
pub fn reconstitute<M: Model>(raw: Value, query: &Query<M>, recover_ids: bool) -> Result<QueryOutput<M::Document>, Error> {
    let shape = query.kind().shape();
    match shape {
        ResultShape::Scalar => raw
            .as_u64()
            .map(QueryOutput::Count)
            .ok_or_else(|| Error::hydration(format!("expected a count for {}, got {raw}", query.kind().as_str()))),
        ResultShape::Values => Ok(QueryOutput::Lean(passthrough(raw, recover_ids))),
        ResultShape::Documents if query.description().is_lean() => Ok(QueryOutput::Lean(passthrough(raw, recover_ids))),
        ResultShape::Documents => {
            let model = query.model();
            match raw {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| model.hydrate(item).map_err(Error::hydration))
                    .collect::<Result<Vec<_>, _>>()
                    .map(QueryOutput::Many),
                Value::Null => Ok(QueryOutput::One(None)),
                other => model.hydrate(other).map(|doc| QueryOutput::One(Some(doc))).map_err(Error::hydration),
            }
        }
    }
}

fn passthrough(raw: Value, recover_ids: bool) -> Value {
    if recover_ids { recover_object_ids(raw) } else { raw }
}

/// Rewrites `_id` strings that look like object identifiers to `{"$oid": ..}`.
///
/// Applies to a top-level object and to each object of a top-level sequence.
/// Only 24-character lowercase hex strings are rewritten.
///
/// # Examples
///
/// ```
/// use doccache::reconstitute::recover_object_ids;
/// use serde_json::json;
///
/// let raw = json!({"_id": "5f1d7f3e9c1b2a3d4e5f6a7b", "name": "ada"});
/// assert_eq!(
///     recover_object_ids(raw),
///     json!({"_id": {"$oid": "5f1d7f3e9c1b2a3d4e5f6a7b"}, "name": "ada"})
/// );
/// ```
#[must_use]
pub fn recover_object_ids(raw: Value) -> Value {
    match raw {
        Value::Object(map) => Value::Object(recover_in(map)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Value::Object(recover_in(map)),
                    other => other,
                })
                .collect(),
        ),
        other => other,
    }
}

fn recover_in(mut map: Map<String, Value>) -> Map<String, Value> {
    if let Some(id) = map.get_mut("_id")
        && let Value::String(text) = id
        && looks_like_object_id(text)
    {
        let mut oid = Map::with_capacity(1);
        oid.insert("$oid".to_string(), Value::String(std::mem::take(text)));
        *id = Value::Object(oid);
    }
    map
}

fn looks_like_object_id(text: &str) -> bool {
    text.len() == OBJECT_ID_LEN && text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
