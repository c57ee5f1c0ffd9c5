// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query caching as a [`layered`] middleware.
//!
//! A query driver is any [`Service`] that takes a [`Query`] and returns its raw
//! result. Wrapping it with a [`CachingLayer`] yields a [`CachedDriver`] that runs
//! every query through [`QueryCache::execute`], leaving the driver itself untouched.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use doccache::{JsonModel, Query, QueryCache, Ttl};
//! use layered::{Execute, Service, Stack};
//! use serde_json::{Value, json};
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let cache = Arc::new(QueryCache::builder(Clock::new_frozen()).memory().build());
//! let driver = Execute::new(|_query: Query<JsonModel<Value>>| async {
//!     Ok::<_, std::io::Error>(json!([{"name": "ada"}]))
//! });
//!
//! let cached = (cache.layer(), driver).into_service();
//! let users = Arc::new(JsonModel::<Value>::new("User"));
//! let found = cached.execute(Query::find(users).cache(Ttl::DEFAULT)).await?;
//!
//! assert_eq!(found.into_many(), vec![json!({"name": "ada"})]);
//! # Ok::<(), doccache::Error>(())
//! # });
//! ```

use std::fmt::{self, Debug};
use std::sync::Arc;

use doccache_backend::{CacheBackend, Error};
use layered::{Layer, Service};
use serde_json::Value;

use crate::cache::QueryCache;
use crate::query::Query;
use crate::reconstitute::{Model, QueryOutput};

/// Wraps a query driver so that its queries are cached.
pub struct CachingLayer<B> {
    cache: Arc<QueryCache<B>>,
}

impl<B> CachingLayer<B> {
    /// Creates a layer that routes queries through `cache`.
    #[must_use]
    pub fn new(cache: Arc<QueryCache<B>>) -> Self {
        Self { cache }
    }
}

impl<B> Clone for CachingLayer<B> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.cache))
    }
}

impl<B: Debug> Debug for CachingLayer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachingLayer").field("cache", &self.cache).finish()
    }
}

impl<B, S> Layer<S> for CachingLayer<B> {
    type Service = CachedDriver<S, B>;

    fn layer(&self, inner: S) -> Self::Service {
        CachedDriver {
            inner,
            cache: Arc::clone(&self.cache),
        }
    }
}

/// A query driver whose queries go through a [`QueryCache`].
pub struct CachedDriver<S, B> {
    inner: S,
    cache: Arc<QueryCache<B>>,
}

impl<S, B> CachedDriver<S, B> {
    /// Returns the wrapped driver.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns the cache queries are routed through.
    #[must_use]
    pub fn cache(&self) -> &Arc<QueryCache<B>> {
        &self.cache
    }
}

impl<S: Clone, B> Clone for CachedDriver<S, B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: Debug, B: Debug> Debug for CachedDriver<S, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedDriver")
            .field("inner", &self.inner)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<S, B, M, E> Service<Query<M>> for CachedDriver<S, B>
where
    S: Service<Query<M>, Out = Result<Value, E>>,
    B: CacheBackend,
    M: Model,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + Send,
{
    type Out = Result<QueryOutput<M::Document>, Error>;

    async fn execute(&self, query: Query<M>) -> Self::Out {
        let forwarded = query.clone();
        self.cache.execute(&query, || self.inner.execute(forwarded)).await
    }
}
