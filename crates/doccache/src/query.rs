// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query descriptions and their caching annotations.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::annotations::{CacheAnnotations, CacheSpec, ScriptCall};
use crate::key::{Structured, compute_key};
use crate::reconstitute::Model;

/// The kind of operation a query performs.
///
/// The kind is fixed when the query is built and decides the result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum OperationKind {
    /// Many documents.
    Find,
    /// At most one document.
    FindOne,
    /// A count of matching documents.
    Count,
    /// A count of matching documents.
    CountDocuments,
    /// An estimate of the collection size.
    EstimatedDocumentCount,
    /// Distinct values of one field.
    Distinct,
    /// An aggregation pipeline.
    Aggregate,
}

/// What kind of data an operation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultShape {
    /// A plain number. Never hydrated.
    Scalar,
    /// Raw values. Never hydrated.
    Values,
    /// Documents. Hydrated unless the query is lean.
    Documents,
}

impl OperationKind {
    /// Returns the operation name used in cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::FindOne => "findOne",
            Self::Count => "count",
            Self::CountDocuments => "countDocuments",
            Self::EstimatedDocumentCount => "estimatedDocumentCount",
            Self::Distinct => "distinct",
            Self::Aggregate => "aggregate",
        }
    }

    /// Returns the shape of this operation's result.
    #[must_use]
    pub const fn shape(self) -> ResultShape {
        match self {
            Self::Count | Self::CountDocuments | Self::EstimatedDocumentCount => ResultShape::Scalar,
            Self::Distinct | Self::Aggregate => ResultShape::Values,
            Self::Find | Self::FindOne => ResultShape::Documents,
        }
    }

    /// Returns `true` for the count family.
    #[must_use]
    pub const fn is_count(self) -> bool {
        matches!(self.shape(), ResultShape::Scalar)
    }
}

/// The structural description of a query: everything that affects its result.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescription {
    model: String,
    kind: OperationKind,
    conditions: Structured,
    fields: Structured,
    sort: Structured,
    skip: Option<u64>,
    limit: Option<u64>,
    distinct: Option<String>,
    pipeline: Structured,
    lean: bool,
    options: Vec<(String, Structured)>,
}

impl QueryDescription {
    /// Creates a description of `kind` over `model` with no conditions.
    #[must_use]
    pub fn new(model: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            model: model.into(),
            kind,
            conditions: Structured::Absent,
            fields: Structured::Absent,
            sort: Structured::Absent,
            skip: None,
            limit: None,
            distinct: None,
            pipeline: Structured::Absent,
            lean: false,
            options: Vec::new(),
        }
    }

    /// Returns the model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the filter conditions.
    #[must_use]
    pub fn conditions(&self) -> &Structured {
        &self.conditions
    }

    /// Returns the projection.
    #[must_use]
    pub fn fields(&self) -> &Structured {
        &self.fields
    }

    /// Returns the sort specification.
    #[must_use]
    pub fn sort(&self) -> &Structured {
        &self.sort
    }

    /// Returns the number of skipped documents.
    #[must_use]
    pub fn skip(&self) -> Option<u64> {
        self.skip
    }

    /// Returns the document limit.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Returns the distinct field.
    #[must_use]
    pub fn distinct(&self) -> Option<&str> {
        self.distinct.as_deref()
    }

    /// Returns the aggregation pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Structured {
        &self.pipeline
    }

    /// Returns `true` if results bypass hydration.
    #[must_use]
    pub fn is_lean(&self) -> bool {
        self.lean
    }

    /// Returns the mapping the cache key is computed from.
    ///
    /// Lean-ness and extra options live under `options`, so a lean and a hydrated
    /// run of the same query never share a key.
    #[must_use]
    pub fn to_structured(&self) -> Structured {
        let mut options = Vec::with_capacity(self.options.len() + 1);
        if self.lean {
            options.push(("lean".to_string(), Structured::Bool(true)));
        }
        options.extend(self.options.iter().cloned());

        Structured::Mapping(vec![
            ("model".to_string(), self.model.as_str().into()),
            ("op".to_string(), self.kind.as_str().into()),
            ("skip".to_string(), self.skip.into()),
            ("limit".to_string(), self.limit.into()),
            ("sort".to_string(), self.sort.clone()),
            ("options".to_string(), Structured::Mapping(options)),
            ("conditions".to_string(), self.conditions.clone()),
            ("fields".to_string(), self.fields.clone()),
            ("distinct".to_string(), self.distinct.as_deref().into()),
            ("pipeline".to_string(), self.pipeline.clone()),
        ])
    }
}

/// A query together with its model and caching annotations.
///
/// Built per call and consumed by execution. Setters take and return `self`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use doccache::{JsonModel, Query, Ttl};
/// use doccache::key::Structured;
///
/// #[derive(serde::Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// let users = Arc::new(JsonModel::<User>::new("User"));
/// let query = Query::find(users)
///     .filter(Structured::mapping([("active", true)]))
///     .sort(Structured::mapping([("name", 1)]))
///     .limit(10)
///     .cache(Ttl::secs(30));
///
/// assert_eq!(query.cache_key().len(), 64);
/// ```
#[derive(Debug)]
pub struct Query<M> {
    model: Arc<M>,
    description: QueryDescription,
    annotations: CacheAnnotations,
    key: OnceCell<String>,
}

impl<M> Clone for Query<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            description: self.description.clone(),
            annotations: self.annotations.clone(),
            key: self.key.clone(),
        }
    }
}

impl<M: Model> Query<M> {
    /// Creates a query of `kind` over `model`.
    #[must_use]
    pub fn new(model: Arc<M>, kind: OperationKind) -> Self {
        let description = QueryDescription::new(model.name(), kind);
        Self {
            model,
            description,
            annotations: CacheAnnotations::default(),
            key: OnceCell::new(),
        }
    }

    /// Creates a query returning many documents.
    #[must_use]
    pub fn find(model: Arc<M>) -> Self {
        Self::new(model, OperationKind::Find)
    }

    /// Creates a query returning at most one document.
    #[must_use]
    pub fn find_one(model: Arc<M>) -> Self {
        Self::new(model, OperationKind::FindOne)
    }

    /// Creates a count query.
    #[must_use]
    pub fn count(model: Arc<M>) -> Self {
        Self::new(model, OperationKind::Count)
    }

    /// Creates a document count query.
    #[must_use]
    pub fn count_documents(model: Arc<M>) -> Self {
        Self::new(model, OperationKind::CountDocuments)
    }

    /// Creates an estimated document count query.
    #[must_use]
    pub fn estimated_document_count(model: Arc<M>) -> Self {
        Self::new(model, OperationKind::EstimatedDocumentCount)
    }

    /// Creates a query for the distinct values of `field`.
    #[must_use]
    pub fn distinct(model: Arc<M>, field: impl Into<String>) -> Self {
        let mut query = Self::new(model, OperationKind::Distinct);
        query.description.distinct = Some(field.into());
        query
    }

    /// Creates an aggregation over `pipeline`.
    #[must_use]
    pub fn aggregate(model: Arc<M>, pipeline: impl Into<Structured>) -> Self {
        let mut query = Self::new(model, OperationKind::Aggregate);
        query.description.pipeline = pipeline.into();
        query
    }
}

impl<M> Query<M> {
    fn describe(mut self, update: impl FnOnce(&mut QueryDescription)) -> Self {
        update(&mut self.description);
        self.key = OnceCell::new();
        self
    }

    /// Sets the filter conditions.
    #[must_use]
    pub fn filter(self, conditions: impl Into<Structured>) -> Self {
        self.describe(|d| d.conditions = conditions.into())
    }

    /// Sets the projection.
    #[must_use]
    pub fn select(self, fields: impl Into<Structured>) -> Self {
        self.describe(|d| d.fields = fields.into())
    }

    /// Sets the sort specification.
    #[must_use]
    pub fn sort(self, sort: impl Into<Structured>) -> Self {
        self.describe(|d| d.sort = sort.into())
    }

    /// Skips the first `skip` documents.
    #[must_use]
    pub fn skip(self, skip: u64) -> Self {
        self.describe(|d| d.skip = Some(skip))
    }

    /// Returns at most `limit` documents.
    #[must_use]
    pub fn limit(self, limit: u64) -> Self {
        self.describe(|d| d.limit = Some(limit))
    }

    /// Returns raw data instead of hydrated documents.
    #[must_use]
    pub fn lean(self) -> Self {
        self.describe(|d| d.lean = true)
    }

    /// Adds an option that affects the result shape.
    #[must_use]
    pub fn option(self, name: impl Into<String>, value: impl Into<Structured>) -> Self {
        self.describe(|d| d.options.push((name.into(), value.into())))
    }

    /// Enables caching with a TTL and/or a custom key.
    ///
    /// A string argument is a custom key cached for [`Ttl::DEFAULT`](crate::Ttl::DEFAULT).
    #[must_use]
    pub fn cache(mut self, spec: impl Into<CacheSpec>) -> Self {
        let spec = spec.into();
        self.annotations.ttl = Some(spec.ttl());
        self.annotations.key = spec.key().map(str::to_owned);
        self.key = OnceCell::new();
        self
    }

    /// Stores the result under `result[field]` instead of the lookup key.
    #[must_use]
    pub fn derived_key(mut self, field: impl Into<String>) -> Self {
        self.annotations.derived_key_field = Some(field.into());
        self
    }

    /// Looks the result up by evaluating a backend script instead of a plain get.
    #[must_use]
    pub fn cache_get_script(mut self, script: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        self.annotations.get_script = Some(ScriptCall::new(script, args));
        self
    }

    /// Evaluates a backend script after the result is stored.
    #[must_use]
    pub fn post_cache_set_script(mut self, script: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        self.annotations.post_store_script = Some(ScriptCall::new(script, args));
        self
    }

    /// Appends `result[field]` to the post-store script's arguments.
    #[must_use]
    pub fn post_cache_set_derive_last_arg(mut self, field: impl Into<String>) -> Self {
        self.annotations.derive_last_arg_field = Some(field.into());
        self
    }

    /// Returns the model descriptor.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Returns the structural description.
    #[must_use]
    pub fn description(&self) -> &QueryDescription {
        &self.description
    }

    /// Returns the caching annotations.
    #[must_use]
    pub fn annotations(&self) -> &CacheAnnotations {
        &self.annotations
    }

    /// Returns the operation kind.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.description.kind
    }

    /// Returns the lookup key.
    ///
    /// A non-empty custom key wins; otherwise the key is computed from the
    /// description. Either way it is resolved once and reused.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        self.key.get_or_init(|| match self.annotations.key() {
            Some(key) => key.to_owned(),
            None => compute_key(&self.description.to_structured()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonModel;
    use crate::Ttl;
    use serde_json::json;

    fn users() -> Arc<JsonModel<Value>> {
        Arc::new(JsonModel::new("User"))
    }

    #[test]
    fn kinds_have_fixed_shapes() {
        assert_eq!(OperationKind::Count.shape(), ResultShape::Scalar);
        assert_eq!(OperationKind::CountDocuments.shape(), ResultShape::Scalar);
        assert_eq!(OperationKind::EstimatedDocumentCount.shape(), ResultShape::Scalar);
        assert_eq!(OperationKind::Distinct.shape(), ResultShape::Values);
        assert_eq!(OperationKind::Aggregate.shape(), ResultShape::Values);
        assert_eq!(OperationKind::Find.shape(), ResultShape::Documents);
        assert_eq!(OperationKind::FindOne.shape(), ResultShape::Documents);
        assert!(OperationKind::Count.is_count());
        assert!(!OperationKind::Find.is_count());
    }

    #[test]
    fn description_includes_shape_affecting_fields() {
        let query = Query::find(users()).skip(5).lean().option("collation", "en");
        let canonical = query.description().to_structured().to_canonical();
        assert_eq!(canonical["model"], json!("User"));
        assert_eq!(canonical["op"], json!("find"));
        assert_eq!(canonical["skip"], json!(5));
        assert_eq!(canonical["options"], json!({"collation": "en", "lean": true}));
        assert!(canonical.get("limit").is_none());
    }

    #[test]
    fn lean_changes_the_key() {
        let hydrated = Query::find(users()).cache(Ttl::DEFAULT);
        let lean = Query::find(users()).lean().cache(Ttl::DEFAULT);
        assert_ne!(hydrated.cache_key(), lean.cache_key());
    }

    #[test]
    fn explicit_key_wins() {
        let query = Query::find(users()).cache((Ttl::secs(5), "custom"));
        assert_eq!(query.cache_key(), "custom");
    }

    #[test]
    fn empty_explicit_key_falls_back_to_computed() {
        let query = Query::find(users()).cache((Ttl::secs(5), ""));
        assert_eq!(query.cache_key().len(), crate::key::KEY_LEN);
    }

    #[test]
    fn key_is_stable_once_computed() {
        let query = Query::find(users()).filter(Structured::mapping([("a", 1)])).cache(Ttl::DEFAULT);
        let first = query.cache_key().to_owned();
        assert_eq!(query.cache_key(), first);
        assert_eq!(query.clone().cache_key(), first);
    }

    #[test]
    fn changing_the_description_recomputes_the_key() {
        let query = Query::find(users()).cache(Ttl::DEFAULT);
        let before = query.cache_key().to_owned();
        let query = query.limit(1);
        assert_ne!(query.cache_key(), before);
    }

    #[test]
    fn annotations_accumulate() {
        let query = Query::find_one(users())
            .cache(Ttl::FOREVER)
            .derived_key("id")
            .cache_get_script("get-sha", [json!(1), json!("k")])
            .post_cache_set_script("post-sha", [json!("a")])
            .post_cache_set_derive_last_arg("id");

        let annotations = query.annotations();
        assert_eq!(annotations.ttl(), Some(Ttl::FOREVER));
        assert_eq!(annotations.derived_key_field(), Some("id"));
        assert_eq!(annotations.get_script().map(ScriptCall::script), Some("get-sha"));
        assert_eq!(
            annotations.post_store_script().map(ScriptCall::args),
            Some(&[json!("a")][..])
        );
        assert_eq!(annotations.derive_last_arg_field(), Some("id"));
    }

    #[test]
    fn distinct_and_aggregate_record_their_inputs() {
        let distinct = Query::distinct(users(), "city");
        assert_eq!(distinct.description().distinct(), Some("city"));

        let pipeline = Structured::sequence([Structured::mapping([(
            "$match",
            Structured::mapping([("a", 1)]),
        )])]);
        let aggregate = Query::aggregate(users(), pipeline.clone());
        assert_eq!(aggregate.description().pipeline(), &pipeline);
        assert_eq!(aggregate.description().model(), "User");
    }
}
