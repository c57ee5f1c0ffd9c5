// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-erased backend wrapper.

use std::{fmt::Debug, sync::Arc};

use serde_json::Value;

use crate::{CacheBackend, Error, Expiry, backend::DynCacheBackend};

/// Extension trait for converting any `CacheBackend` into a `DynamicBackend`.
///
/// # Examples
///
/// ```
/// use doccache_backend::{CacheBackend, DynamicBackend, DynamicBackendExt};
///
/// fn erase<B>(backend: B) -> DynamicBackend
/// where
///     B: CacheBackend + 'static,
/// {
///     backend.into_dynamic()
/// }
/// ```
pub trait DynamicBackendExt: Sized {
    /// Converts this backend into a `DynamicBackend`.
    fn into_dynamic(self) -> DynamicBackend;
}

impl<B> DynamicBackendExt for B
where
    B: CacheBackend + 'static,
{
    fn into_dynamic(self) -> DynamicBackend {
        DynamicBackend::new(self)
    }
}

/// A cloneable backend with type erasure.
///
/// Wraps a trait object in an `Arc` so a single backend can be shared by handles
/// that don't know its concrete type, such as the process-wide query cache.
pub struct DynamicBackend(Arc<DynCacheBackend<'static>>);

impl DynamicBackend {
    pub(crate) fn new<B>(backend: B) -> Self
    where
        B: CacheBackend + 'static,
    {
        Self(DynCacheBackend::new_arc(backend))
    }
}

impl Debug for DynamicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBackend")
            .field("supports_scripts", &self.0.supports_scripts())
            .finish()
    }
}

impl Clone for DynamicBackend {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl CacheBackend for DynamicBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<(), Error> {
        self.0.set(key, value, expiry).await
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        self.0.del(key).await
    }

    async fn clear(&self) -> Result<(), Error> {
        self.0.clear().await
    }

    fn supports_scripts(&self) -> bool {
        self.0.supports_scripts()
    }

    async fn evaluate_script(&self, script: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        self.0.evaluate_script(script, args).await
    }

    fn len(&self) -> Option<u64> {
        self.0.len()
    }

    fn is_empty(&self) -> Option<bool> {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn forwards_all_operations() {
        block_on(async {
            let mock = MockBackend::new();
            let dynamic = mock.clone().into_dynamic();

            dynamic.set("k", json!({"a": 1}), Expiry::Never).await.expect("set");
            assert_eq!(dynamic.get("k").await.expect("get"), Some(json!({"a": 1})));
            assert_eq!(dynamic.len(), Some(1));

            dynamic.del("k").await.expect("del");
            assert_eq!(dynamic.get("k").await.expect("get"), None);

            dynamic.set("j", json!(2), Expiry::Never).await.expect("set");
            dynamic.clear().await.expect("clear");
            assert_eq!(dynamic.is_empty(), Some(true));
            assert!(!dynamic.supports_scripts());
            assert_eq!(mock.operations().len(), 6);
        });
    }

    #[test]
    fn clones_share_the_backend() {
        block_on(async {
            let dynamic = MockBackend::new().into_dynamic();
            let clone = dynamic.clone();
            dynamic.set("shared", json!("v"), Expiry::Never).await.expect("set");
            assert_eq!(clone.get("shared").await.expect("get"), Some(json!("v")));
        });
    }

    #[test]
    fn script_support_is_forwarded() {
        block_on(async {
            let dynamic = MockBackend::with_scripts(|_, args| args.first().cloned()).into_dynamic();
            assert!(dynamic.supports_scripts());
            let result = dynamic.evaluate_script("sha", &[json!("x")]).await.expect("script");
            assert_eq!(result, Some(json!("x")));
        });
    }
}
