// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Cache-aside result caching for document database queries.
//!
//! A [`Query`] describes a find, count, distinct or aggregate operation over a
//! [`Model`]. Annotating it with [`Query::cache`] makes a [`QueryCache`] look its
//! result up in a [`CacheBackend`] before running it, and store the raw result
//! after a miss. Cached and fresh results go through the same reconstitution
//! step, so a caller always receives the shape the operation produces.
//!
//! - Keys are computed from the query's structure with [`key::compute_key`]
//!   unless a custom key is given.
//! - Stored results can be keyed by a field of the result instead.
//! - Backends that evaluate scripts can replace the lookup with a script and run
//!   another script after each store.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use doccache::{JsonModel, Query, QueryCache, Ttl};
//! use doccache::key::Structured;
//! use serde_json::json;
//! use tick::Clock;
//!
//! #[derive(Debug, serde::Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! # futures::executor::block_on(async {
//! let cache = QueryCache::builder(Clock::new_frozen()).memory().build();
//! let users = Arc::new(JsonModel::<User>::new("User"));
//!
//! let query = Query::find(users)
//!     .filter(Structured::mapping([("active", true)]))
//!     .cache(Ttl::secs(60));
//!
//! // The first call runs the query, the second is served from the cache.
//! for _ in 0..2 {
//!     let found = cache
//!         .execute(&query, || async { Ok::<_, std::io::Error>(json!([{"name": "ada"}])) })
//!         .await?;
//!     assert_eq!(found.into_many()[0].name, "ada");
//! }
//! # Ok::<(), doccache::Error>(())
//! # });
//! ```

mod annotations;
mod builder;
mod cache;
mod callback;
pub mod key;
pub mod layer;
mod query;
pub mod reconstitute;
pub mod registry;
mod telemetry;

pub use annotations::{CacheAnnotations, CacheSpec, ScriptCall, Ttl};
pub use builder::QueryCacheBuilder;
pub use cache::{CacheName, QueryCache};
pub use doccache_backend::{CacheBackend, DynamicBackend, Error, ErrorKind, Expiry, Result};
pub use layer::{CachedDriver, CachingLayer};
pub use query::{OperationKind, Query, QueryDescription, ResultShape};
pub use reconstitute::{JsonModel, Model, QueryOutput};

#[cfg(feature = "memory")]
pub use doccache_memory::MemoryBackend;
#[cfg(feature = "redis")]
pub use doccache_redis::{RedisBackend, RedisBackendBuilder};
