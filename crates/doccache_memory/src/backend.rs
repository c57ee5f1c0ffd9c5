// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Memory backend implementation using moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use doccache_backend::{CacheBackend, Error, Expiry};
use moka::future::Cache;
use serde_json::Value;

use crate::builder::MemoryBackendBuilder;

#[derive(Debug, Clone)]
struct StoredValue {
    value: Arc<Value>,
    expiry: Expiry,
}

/// Reads the lifetime of each entry from the entry itself.
struct PerEntryExpiry;

impl moka::Expiry<String, StoredValue> for PerEntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        value.expiry.duration()
    }

    // An overwrite restarts the clock with the new entry's lifetime.
    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.expiry.duration()
    }
}

/// An in-process query result backend backed by moka.
///
/// Cloning is cheap and clones share the same store.
///
/// # Examples
///
/// ```
/// use doccache_backend::{CacheBackend, Expiry};
/// use doccache_memory::MemoryBackend;
/// use serde_json::json;
/// # futures::executor::block_on(async {
///
/// let backend = MemoryBackend::new();
/// backend.set("k", json!(3), Expiry::Never).await.unwrap();
/// assert_eq!(backend.get("k").await.unwrap(), Some(json!(3)));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Cache<String, StoredValue>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a new unbounded memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new memory backend holding at most `max_capacity` results.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring a memory backend.
    #[must_use]
    pub fn builder() -> MemoryBackendBuilder {
        MemoryBackendBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryBackendBuilder) -> Self {
        let mut moka_builder = Cache::builder().expire_after(PerEntryExpiry);

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
        }
    }
}

impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.inner.get(key).await.map(|stored| Value::clone(&stored.value)))
    }

    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<(), Error> {
        let stored = StoredValue {
            value: Arc::new(value),
            expiry,
        };
        self.inner.insert(key.to_owned(), stored).await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        self.inner.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.invalidate_all();
        Ok(())
    }

    fn len(&self) -> Option<u64> {
        Some(self.inner.entry_count())
    }
}
