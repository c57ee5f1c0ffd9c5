// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for cache storage backends.

use serde_json::Value;

use crate::{Error, Expiry};

/// Trait for cache storage backends.
///
/// All four storage methods are required: `get`, `set`, `del`, and `clear`.
/// Script evaluation is optional:
/// - `supports_scripts`: Returns `false` unless overridden
/// - `evaluate_script`: Reports a configuration error unless overridden
/// - `len`: Returns `None` (not all backends track size)
///
/// Values are stored as raw JSON documents. A backend must never interpret an
/// [`Expiry::Never`] write as an immediate expiration.
#[cfg_attr(
    any(test, feature = "dynamic"),
    dynosaur::dynosaur(pub(crate) DynCacheBackend = dyn(box) CacheBackend, bridge(none))
)]
pub trait CacheBackend: Send + Sync {
    /// Looks up a value, returning `None` when the key is absent or expired.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, Error>> + Send;

    /// Stores a value under `key` with the given expiry.
    fn set(&self, key: &str, value: Value, expiry: Expiry) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes the value stored under `key`, if any.
    fn del(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes every value owned by this backend.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns `true` if this backend can evaluate server-side scripts.
    ///
    /// Callers check this before issuing script calls so that a misconfiguration
    /// is reported without touching the backend.
    fn supports_scripts(&self) -> bool {
        false
    }

    /// Evaluates a server-side script identified by `script` with the given arguments.
    ///
    /// Returns `None` when the script produced no value.
    fn evaluate_script(&self, script: &str, args: &[Value]) -> impl Future<Output = Result<Option<Value>, Error>> + Send {
        let error = Error::scripts_unsupported(script, args.len());
        async move { Err(error) }
    }

    /// Returns the number of stored entries, if supported.
    fn len(&self) -> Option<u64> {
        None
    }

    /// Returns `true` if the backend holds no entries.
    ///
    /// Returns `None` for backends that don't track size.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}
