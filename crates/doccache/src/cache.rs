// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache-aside orchestrator.

use std::fmt::{self, Debug};
use std::sync::Arc;

use doccache_backend::{CacheBackend, Error};
use serde_json::Value;
use tick::Clock;

use crate::annotations::{CacheAnnotations, ScriptCall, Ttl};
use crate::builder::QueryCacheBuilder;
use crate::layer::CachingLayer;
use crate::query::Query;
use crate::reconstitute::{Model, QueryOutput, reconstitute};
use crate::telemetry::ext::ClockExt;
use crate::telemetry::{QueryActivity, QueryOperation, QueryTelemetry};

/// Type alias for cache names used in telemetry.
pub type CacheName = &'static str;

/// The stages a cached query moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LookingUp,
    HitReconstituting,
    Missed,
    Executing,
    Storing,
    RunningPostHook,
    Done,
}

/// Runs queries through a cache backend.
///
/// A query without caching annotations runs directly. An annotated query is
/// looked up first; on a miss it runs, its raw result is stored and the optional
/// post-store script is evaluated. Every step is awaited before the next starts,
/// and any failure ends the call with that error. Failures never fall back to
/// direct execution or to stale data.
///
/// Concurrent calls for the same key are not coalesced: each may miss, run and
/// store, and the last store wins.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use doccache::{JsonModel, Query, QueryCache, Ttl};
/// use serde_json::json;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = QueryCache::builder(Clock::new_frozen()).memory().build();
/// let users = Arc::new(JsonModel::<serde_json::Value>::new("User"));
///
/// let query = Query::count_documents(users).cache(Ttl::secs(30));
/// let count = cache
///     .execute(&query, || async { Ok::<_, std::io::Error>(json!(7)) })
///     .await?;
///
/// assert_eq!(count.as_count(), Some(7));
/// # Ok::<(), doccache::Error>(())
/// # });
/// ```
pub struct QueryCache<B> {
    name: CacheName,
    backend: B,
    clock: Clock,
    telemetry: QueryTelemetry,
    recover_object_ids: bool,
}

impl<B: Debug> Debug for QueryCache<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("logs", &self.telemetry.logging_enabled())
            .field("recover_object_ids", &self.recover_object_ids)
            .finish_non_exhaustive()
    }
}

impl QueryCache<()> {
    /// Starts building a query cache.
    #[must_use]
    pub fn builder(clock: Clock) -> QueryCacheBuilder<()> {
        QueryCacheBuilder::new(clock)
    }
}

impl<B> QueryCache<B> {
    pub(crate) fn new(name: CacheName, backend: B, clock: Clock, telemetry: QueryTelemetry, recover_object_ids: bool) -> Self {
        Self {
            name,
            backend,
            clock,
            telemetry,
            recover_object_ids,
        }
    }

    /// Returns the cache name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the clock used to time operations.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns `true` if `_id` strings are recovered as object identifiers in raw results.
    #[must_use]
    pub fn recovers_object_ids(&self) -> bool {
        self.recover_object_ids
    }

    /// Returns a layer that routes a driver's queries through this cache.
    #[must_use]
    pub fn layer(self: &Arc<Self>) -> CachingLayer<B> {
        CachingLayer::new(Arc::clone(self))
    }

    fn stage(&self, key: &str, stage: Stage) {
        tracing::debug!(cache.name = self.name, cache.key = key, stage = ?stage, "query cache stage");
    }
}

impl<B: CacheBackend> QueryCache<B> {
    /// Runs `query`, serving and populating the cache according to its annotations.
    ///
    /// `run` executes the query against the database and returns its raw result.
    /// It is called at most once and only when the cache cannot answer.
    ///
    /// # Errors
    ///
    /// - a configuration error when the annotations need capabilities the backend
    ///   lacks, before any backend call is made, or when a derived key is missing;
    /// - a backend error when a lookup, store or script call fails;
    /// - an execution error when `run` fails;
    /// - a hydration error when the result cannot take the query's shape.
    pub async fn execute<M, F, Fut, E>(&self, query: &Query<M>, run: F) -> Result<QueryOutput<M::Document>, Error>
    where
        M: Model,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, E>> + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    {
        let annotations = query.annotations();
        let Some(ttl) = annotations.ttl() else {
            let raw = self.run(run, QueryActivity::Passthrough).await?;
            return reconstitute(raw, query, self.recover_object_ids);
        };

        if let Err(e) = annotations.validate(self.backend.supports_scripts()) {
            self.telemetry.record(self.name, QueryOperation::Lookup, QueryActivity::Error, None);
            return Err(e);
        }

        let key = query.cache_key();
        self.stage(key, Stage::LookingUp);
        if let Some(raw) = self.lookup(key, annotations).await? {
            self.stage(key, Stage::HitReconstituting);
            let output = reconstitute(raw, query, self.recover_object_ids);
            self.stage(key, Stage::Done);
            return output;
        }

        self.stage(key, Stage::Missed);
        self.stage(key, Stage::Executing);
        let raw = self.run(run, QueryActivity::Executed).await?;

        // Everything derived from the result is resolved before the first write.
        let storage_key = match annotations.derived_key_field() {
            Some(field) => derived_value(&raw, field)?,
            None => key.to_owned(),
        };
        let post_store = match annotations.post_store_script() {
            Some(script) => Some((script, post_store_args(script, &raw, annotations.derive_last_arg_field())?)),
            None => None,
        };

        self.stage(key, Stage::Storing);
        self.store(&storage_key, &raw, ttl).await?;

        if let Some((script, args)) = post_store {
            self.stage(key, Stage::RunningPostHook);
            self.post_store(script, &args).await?;
        }

        let output = reconstitute(raw, query, self.recover_object_ids);
        self.stage(key, Stage::Done);
        output
    }

    async fn run<F, Fut, E>(&self, run: F, activity: QueryActivity) -> Result<Value, Error>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, E>> + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
    {
        let timed = self.clock.timed_async(run()).await;
        match timed.result {
            Ok(raw) => {
                self.telemetry
                    .record(self.name, QueryOperation::Execute, activity, Some(timed.duration));
                Ok(raw)
            }
            Err(e) => {
                self.telemetry
                    .record(self.name, QueryOperation::Execute, QueryActivity::Error, Some(timed.duration));
                Err(Error::execution(e))
            }
        }
    }

    async fn lookup(&self, key: &str, annotations: &CacheAnnotations) -> Result<Option<Value>, Error> {
        let timed = match annotations.get_script() {
            Some(script) => {
                self.clock
                    .timed_async(async {
                        let reply = self.backend.evaluate_script(script.script(), script.args()).await?;
                        decode_script_reply(reply)
                    })
                    .await
            }
            None => self.clock.timed_async(self.backend.get(key)).await,
        };

        let activity = match &timed.result {
            Ok(Some(Value::Null) | None) => QueryActivity::Miss,
            Ok(Some(_)) => QueryActivity::Hit,
            Err(_) => QueryActivity::Error,
        };
        self.telemetry
            .record(self.name, QueryOperation::Lookup, activity, Some(timed.duration));

        // A stored null is indistinguishable from a missing entry.
        Ok(timed.result?.filter(|raw| !raw.is_null()))
    }

    async fn store(&self, key: &str, raw: &Value, ttl: Ttl) -> Result<(), Error> {
        let timed = self
            .clock
            .timed_async(self.backend.set(key, raw.clone(), ttl.expiry()))
            .await;
        let activity = if timed.result.is_ok() {
            QueryActivity::Stored
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::Store, activity, Some(timed.duration));
        timed.result
    }

    async fn post_store(&self, script: &ScriptCall, args: &[Value]) -> Result<(), Error> {
        let timed = self
            .clock
            .timed_async(self.backend.evaluate_script(script.script(), args))
            .await;
        let activity = if timed.result.is_ok() {
            QueryActivity::ScriptEvaluated
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::PostStore, activity, Some(timed.duration));
        timed.result.map(|_| ())
    }

    /// Reads a raw value from the backend.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the lookup fails.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let timed = self.clock.timed_async(self.backend.get(key)).await;
        let activity = match &timed.result {
            Ok(Some(_)) => QueryActivity::Hit,
            Ok(None) => QueryActivity::Miss,
            Err(_) => QueryActivity::Error,
        };
        self.telemetry
            .record(self.name, QueryOperation::Lookup, activity, Some(timed.duration));
        timed.result
    }

    /// Writes a raw value. [`Ttl::FOREVER`] keeps it until deleted.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the write fails.
    pub async fn set(&self, key: &str, value: Value, ttl: Ttl) -> Result<(), Error> {
        tracing::info!(cache.name = self.name, cache.key = key, cache.ttl_secs = ttl.as_secs(), "setting cache entry");
        let timed = self.clock.timed_async(self.backend.set(key, value, ttl.expiry())).await;
        let activity = if timed.result.is_ok() {
            QueryActivity::Stored
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::Store, activity, Some(timed.duration));
        timed.result
    }

    /// Deletes one entry.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the delete fails.
    pub async fn del(&self, key: &str) -> Result<(), Error> {
        tracing::info!(cache.name = self.name, cache.key = key, "deleting cache entry");
        let timed = self.clock.timed_async(self.backend.del(key)).await;
        let activity = if timed.result.is_ok() {
            QueryActivity::Deleted
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::Delete, activity, Some(timed.duration));
        timed.result
    }

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the backend cannot be cleared.
    pub async fn clear(&self) -> Result<(), Error> {
        tracing::info!(cache.name = self.name, "clearing cache");
        let timed = self.clock.timed_async(self.backend.clear()).await;
        let activity = if timed.result.is_ok() {
            QueryActivity::Cleared
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::Clear, activity, Some(timed.duration));
        timed.result
    }

    /// Deletes `key`, or clears the whole cache when no key is given.
    ///
    /// # Errors
    ///
    /// Returns a backend error when the delete or clear fails.
    pub async fn clear_cache(&self, key: Option<&str>) -> Result<(), Error> {
        match key {
            Some(key) => self.del(key).await,
            None => self.clear().await,
        }
    }

    /// Evaluates a backend script directly.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, without calling the backend, when the
    /// backend cannot evaluate scripts. Returns a backend error when the script
    /// call fails.
    pub async fn evaluate_script(&self, script: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        if !self.backend.supports_scripts() {
            self.telemetry.record(self.name, QueryOperation::Script, QueryActivity::Error, None);
            return Err(Error::configuration(format!(
                "cannot evaluate script {script}: the backend does not support script evaluation"
            )));
        }

        let timed = self.clock.timed_async(self.backend.evaluate_script(script, args)).await;
        let activity = if timed.result.is_ok() {
            QueryActivity::ScriptEvaluated
        } else {
            QueryActivity::Error
        };
        self.telemetry
            .record(self.name, QueryOperation::Script, activity, Some(timed.duration));
        timed.result
    }
}

/// Interprets a lookup script reply: strings hold JSON, empty means absent.
fn decode_script_reply(reply: Option<Value>) -> Result<Option<Value>, Error> {
    match reply {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text).map(Some).map_err(Error::backend),
        Some(other) => Ok(Some(other)),
    }
}

fn derived_value(raw: &Value, field: &str) -> Result<String, Error> {
    match raw.get(field) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::configuration(format!(
            "result field {field} must be a string or a number to derive a cache key"
        ))),
    }
}

/// Builds the post-store script arguments, forwarding a derived last argument as the result holds it.
fn post_store_args(script: &ScriptCall, raw: &Value, derive_last_arg: Option<&str>) -> Result<Vec<Value>, Error> {
    let mut args = script.args().to_vec();
    if let Some(field) = derive_last_arg {
        match raw.get(field) {
            Some(value @ (Value::String(_) | Value::Number(_))) => args.push(value.clone()),
            _ => {
                return Err(Error::configuration(format!(
                    "result field {field} must be a string or a number to derive a script argument"
                )));
            }
        }
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn script_replies_decode_json_strings() {
        assert_eq!(decode_script_reply(None).expect("none"), None);
        assert_eq!(decode_script_reply(Some(Value::Null)).expect("null"), None);
        assert_eq!(decode_script_reply(Some(json!(""))).expect("empty"), None);
        assert_eq!(
            decode_script_reply(Some(json!(r#"{"a":1}"#))).expect("json"),
            Some(json!({"a": 1}))
        );
        assert_eq!(decode_script_reply(Some(json!([1, 2]))).expect("array"), Some(json!([1, 2])));
        assert!(decode_script_reply(Some(json!("{not json"))).expect_err("invalid").kind() == doccache_backend::ErrorKind::Backend);
    }

    #[test]
    fn derived_values_must_be_scalars() {
        assert_eq!(derived_value(&json!({"id": "a1"}), "id").expect("string"), "a1");
        assert_eq!(derived_value(&json!({"id": 42}), "id").expect("number"), "42");
        assert!(derived_value(&json!({"id": [1]}), "id").expect_err("array").is_configuration());
        assert!(derived_value(&json!({}), "id").expect_err("missing").is_configuration());
        assert!(derived_value(&json!([{"id": 1}]), "id").expect_err("sequence").is_configuration());
    }

    #[test]
    fn post_store_args_keep_the_derived_value_type() {
        let script = ScriptCall::new("sha", [json!("idx")]);
        assert_eq!(
            post_store_args(&script, &json!({"id": 42}), Some("id")).expect("number"),
            vec![json!("idx"), json!(42)]
        );
        assert_eq!(
            post_store_args(&script, &json!({"id": "a1"}), Some("id")).expect("string"),
            vec![json!("idx"), json!("a1")]
        );
        assert_eq!(post_store_args(&script, &json!({}), None).expect("no derived"), vec![json!("idx")]);
        assert!(post_store_args(&script, &json!({"name": "ada"}), Some("id")).expect_err("missing").is_configuration());
        assert!(post_store_args(&script, &json!({"id": null}), Some("id")).expect_err("null").is_configuration());
    }
}
