// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The process-wide query cache.
//!
//! Applications that configure caching once at startup can install a cache here
//! and reach it from anywhere through [`installed`]. Installation happens at most
//! once per process.

use doccache_backend::DynamicBackend;
use once_cell::sync::OnceCell;

use crate::cache::QueryCache;

static INSTALLED: OnceCell<QueryCache<DynamicBackend>> = OnceCell::new();

/// Installs `cache` as the process-wide instance and returns the installed cache.
///
/// If a cache is already installed, `cache` is dropped and the existing one is
/// returned unchanged.
pub fn install(cache: QueryCache<DynamicBackend>) -> &'static QueryCache<DynamicBackend> {
    let name = cache.name();
    let mut fresh = false;
    let installed = INSTALLED.get_or_init(|| {
        fresh = true;
        cache
    });

    if fresh {
        tracing::info!(cache.name = name, "installed process-wide query cache");
    } else {
        tracing::debug!(
            cache.name = name,
            cache.installed = installed.name(),
            "query cache already installed, keeping the existing instance"
        );
    }
    installed
}

/// Returns the process-wide cache, if one was installed.
#[must_use]
pub fn installed() -> Option<&'static QueryCache<DynamicBackend>> {
    INSTALLED.get()
}
