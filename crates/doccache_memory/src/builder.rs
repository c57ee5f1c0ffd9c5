// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring memory backends.

use crate::backend::MemoryBackend;

/// Builder for configuring a [`MemoryBackend`].
///
/// There is no backend-wide TTL: lifetimes come from each write's expiry.
///
/// # Examples
///
/// ```
/// use doccache_memory::MemoryBackend;
///
/// let backend = MemoryBackend::builder()
///     .max_capacity(10_000)
///     .initial_capacity(100)
///     .name("query-results")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackendBuilder {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
}

impl MemoryBackendBuilder {
    /// Creates a new builder for an unbounded backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of stored results.
    ///
    /// Once the capacity is reached, entries are evicted using the `TinyLFU` policy.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity (pre-allocation hint).
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name that may appear in moka's debugging output.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured [`MemoryBackend`].
    #[must_use]
    pub fn build(self) -> MemoryBackend {
        MemoryBackend::from_builder(&self)
    }
}
