// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Callback-style notification on top of [`QueryCache::execute`].

use doccache_backend::{CacheBackend, Error};
use serde_json::Value;

use crate::cache::QueryCache;
use crate::query::Query;
use crate::reconstitute::{Model, QueryOutput};

impl<B: CacheBackend> QueryCache<B> {
    /// Runs `query` like [`execute`](Self::execute) and notifies `callback` once.
    ///
    /// The callback sees the outcome before it is returned, for callers that
    /// consume results through notification rather than by awaiting.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`execute`](Self::execute).
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
    /// let result = cache
    ///     .execute_with_callback(
    ///         &Query::count(users).cache(Ttl::DEFAULT),
    ///         || async { Ok::<_, std::io::Error>(json!(2)) },
    ///         |outcome| println!("count finished: {}", outcome.is_ok()),
    ///     )
    ///     .await;
    /// assert!(result.is_ok());
    /// # });
    /// ```
    pub async fn execute_with_callback<M, F, Fut, E, C>(
        &self,
        query: &Query<M>,
        run: F,
        callback: C,
    ) -> Result<QueryOutput<M::Document>, Error>
    where
        M: Model,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, E>> + Send,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
        C: FnOnce(&Result<QueryOutput<M::Document>, Error>) + Send,
    {
        let result = self.execute(query, run).await;
        callback(&result);
        result
    }
}
