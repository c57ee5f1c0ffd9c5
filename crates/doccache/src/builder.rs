// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Query cache construction.

#[cfg(feature = "memory")]
use doccache_memory::MemoryBackend;
#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use doccache_backend::{CacheBackend, DynamicBackend, DynamicBackendExt};
use tick::Clock;

use crate::cache::{CacheName, QueryCache};
use crate::registry;
use crate::telemetry::QueryTelemetry;

const DEFAULT_NAME: CacheName = "doccache";

/// Builder for [`QueryCache`].
///
/// Created by [`QueryCache::builder`]. A backend must be chosen before the cache
/// can be built.
///
/// # Examples
///
/// ```
/// use doccache::QueryCache;
/// use tick::Clock;
///
/// let cache = QueryCache::builder(Clock::new_frozen())
///     .memory()
///     .name("users")
///     .logs()
///     .recover_object_ids(true)
///     .build();
///
/// assert_eq!(cache.name(), "users");
/// ```
#[derive(Debug)]
pub struct QueryCacheBuilder<B = ()> {
    name: Option<CacheName>,
    backend: B,
    clock: Clock,
    logs: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
    recover_object_ids: bool,
}

impl QueryCacheBuilder<()> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            name: None,
            backend: (),
            clock,
            logs: false,
            #[cfg(any(feature = "metrics", test))]
            meter: None,
            recover_object_ids: false,
        }
    }

    /// Uses `backend` for storage.
    ///
    /// # Examples
    ///
    /// ```
    /// use doccache::QueryCache;
    /// use doccache_memory::MemoryBackend;
    /// use tick::Clock;
    ///
    /// let cache = QueryCache::builder(Clock::new_frozen())
    ///     .backend(MemoryBackend::with_capacity(1_000))
    ///     .build();
    /// ```
    pub fn backend<B>(self, backend: B) -> QueryCacheBuilder<B>
    where
        B: CacheBackend,
    {
        QueryCacheBuilder {
            name: self.name,
            backend,
            clock: self.clock,
            logs: self.logs,
            #[cfg(any(feature = "metrics", test))]
            meter: self.meter,
            recover_object_ids: self.recover_object_ids,
        }
    }

    /// Uses an unbounded in-process backend.
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory(self) -> QueryCacheBuilder<MemoryBackend> {
        self.backend(MemoryBackend::new())
    }
}

impl<B> QueryCacheBuilder<B> {
    /// Sets the name reported in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = Some(name);
        self
    }

    /// Emits a structured `tracing` event for every cache operation.
    #[must_use]
    pub fn logs(mut self) -> Self {
        self.logs = true;
        self
    }

    /// Records counters and duration histograms through `provider`.
    #[cfg(any(feature = "metrics", test))]
    #[must_use]
    pub fn metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    /// Rewrites `_id` strings that look like object identifiers in lean, distinct
    /// and aggregate results. Off by default.
    #[must_use]
    pub fn recover_object_ids(mut self, enabled: bool) -> Self {
        self.recover_object_ids = enabled;
        self
    }

    fn telemetry(&self) -> QueryTelemetry {
        #[cfg(any(feature = "metrics", test))]
        if let Some(meter) = &self.meter {
            return QueryTelemetry::with_meter(self.logs, meter);
        }
        QueryTelemetry::new(self.logs)
    }
}

impl<B: CacheBackend> QueryCacheBuilder<B> {
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> QueryCache<B> {
        let telemetry = self.telemetry();
        QueryCache::new(
            self.name.unwrap_or(DEFAULT_NAME),
            self.backend,
            self.clock,
            telemetry,
            self.recover_object_ids,
        )
    }
}

impl<B: CacheBackend + 'static> QueryCacheBuilder<B> {
    /// Builds the cache and installs it as the process-wide instance.
    ///
    /// Only the first installation takes effect; later calls return the cache
    /// installed first and drop this one.
    ///
    /// # Examples
    ///
    /// ```
    /// use doccache::QueryCache;
    /// use tick::Clock;
    ///
    /// let first = QueryCache::builder(Clock::new_frozen()).memory().name("first").install();
    /// let second = QueryCache::builder(Clock::new_frozen()).memory().name("second").install();
    ///
    /// assert_eq!(first.name(), "first");
    /// assert!(std::ptr::eq(first, second));
    /// ```
    pub fn install(self) -> &'static QueryCache<DynamicBackend> {
        let telemetry = self.telemetry();
        let cache = QueryCache::new(
            self.name.unwrap_or(DEFAULT_NAME),
            self.backend.into_dynamic(),
            self.clock,
            telemetry,
            self.recover_object_ids,
        );
        registry::install(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccache_backend::testing::MockBackend;

    #[test]
    fn defaults() {
        let cache = QueryCache::builder(Clock::new_frozen()).backend(MockBackend::new()).build();
        assert_eq!(cache.name(), DEFAULT_NAME);
        assert!(!cache.recovers_object_ids());
    }

    #[test]
    fn settings_carry_across_backend_selection() {
        let cache = QueryCache::builder(Clock::new_frozen())
            .name("before")
            .recover_object_ids(true)
            .backend(MockBackend::new())
            .build();
        assert_eq!(cache.name(), "before");
        assert!(cache.recovers_object_ids());
    }

    #[test]
    fn metrics_enable_meter_backed_telemetry() {
        let tester = crate::telemetry::testing::MetricTester::new();
        let builder = QueryCache::builder(Clock::new_frozen())
            .backend(MockBackend::new())
            .logs()
            .metrics(tester.meter_provider());
        assert!(builder.meter.is_some());
        assert!(builder.telemetry().logging_enabled());
    }
}
