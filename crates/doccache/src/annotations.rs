// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Caching annotations attached to a query.

use std::time::Duration;

use doccache_backend::{Error, Expiry};
use serde_json::Value;

/// Caller-facing time-to-live in whole seconds.
///
/// Zero means "cache forever" and is never forwarded to a backend as a zero
/// duration; see [`Ttl::expiry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ttl(u64);

impl Ttl {
    /// Cache without expiry.
    pub const FOREVER: Self = Self(0);

    /// The TTL used when a query is cached by custom key only: 60 seconds.
    pub const DEFAULT: Self = Self(60);

    /// Creates a TTL of `secs` seconds. Zero means [`Ttl::FOREVER`].
    #[must_use]
    pub const fn secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns the TTL in seconds.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Returns `true` if values are kept forever.
    #[must_use]
    pub const fn is_forever(self) -> bool {
        self.0 == 0
    }

    /// Converts to the backend expiry.
    ///
    /// # Examples
    ///
    /// ```
    /// use doccache::Ttl;
    /// use doccache_backend::Expiry;
    /// use std::time::Duration;
    ///
    /// assert_eq!(Ttl::FOREVER.expiry(), Expiry::Never);
    /// assert_eq!(Ttl::secs(60).expiry(), Expiry::After(Duration::from_secs(60)));
    /// ```
    #[must_use]
    pub fn expiry(self) -> Expiry {
        Expiry::after(Duration::from_secs(self.0))
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The argument of [`Query::cache`](crate::Query::cache).
///
/// A bare string is a custom key with the default TTL, matching how callers
/// usually pin a result to a well-known key.
///
/// # Examples
///
/// ```
/// use doccache::{CacheSpec, Ttl};
///
/// let by_ttl = CacheSpec::from(Ttl::secs(30));
/// let by_key = CacheSpec::from("user:42");
/// let both = CacheSpec::from((Ttl::FOREVER, "settings"));
///
/// assert_eq!(by_key.ttl(), Ttl::DEFAULT);
/// assert_eq!(both.key(), Some("settings"));
/// # let _ = by_ttl;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheSpec {
    ttl: Ttl,
    key: Option<String>,
}

impl CacheSpec {
    /// Creates a spec with the given TTL and no custom key.
    #[must_use]
    pub fn new(ttl: Ttl) -> Self {
        Self { ttl, key: None }
    }

    /// Sets a custom key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Returns the TTL.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Returns the custom key, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl From<Ttl> for CacheSpec {
    fn from(ttl: Ttl) -> Self {
        Self::new(ttl)
    }
}

impl From<&str> for CacheSpec {
    fn from(key: &str) -> Self {
        Self::default().with_key(key)
    }
}

impl From<String> for CacheSpec {
    fn from(key: String) -> Self {
        Self::default().with_key(key)
    }
}

impl From<(Ttl, &str)> for CacheSpec {
    fn from((ttl, key): (Ttl, &str)) -> Self {
        Self::new(ttl).with_key(key)
    }
}

impl From<(Ttl, String)> for CacheSpec {
    fn from((ttl, key): (Ttl, String)) -> Self {
        Self::new(ttl).with_key(key)
    }
}

/// A backend script call: identifier plus arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
    pub(crate) script: String,
    pub(crate) args: Vec<Value>,
}

impl ScriptCall {
    pub(crate) fn new(script: impl Into<String>, args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            script: script.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Returns the script identifier.
    #[must_use]
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Returns the configured arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// Everything a query carries about how it is cached.
///
/// A query without a TTL is not cached at all, regardless of the other fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheAnnotations {
    pub(crate) ttl: Option<Ttl>,
    pub(crate) key: Option<String>,
    pub(crate) derived_key_field: Option<String>,
    pub(crate) get_script: Option<ScriptCall>,
    pub(crate) post_store_script: Option<ScriptCall>,
    pub(crate) derive_last_arg_field: Option<String>,
}

impl CacheAnnotations {
    /// Returns `true` if caching was enabled with a TTL.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.ttl.is_some()
    }

    /// Returns the TTL, if caching was enabled.
    #[must_use]
    pub fn ttl(&self) -> Option<Ttl> {
        self.ttl
    }

    /// Returns the custom key. An empty key counts as no key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.is_empty())
    }

    /// Returns the result field the storage key is taken from.
    #[must_use]
    pub fn derived_key_field(&self) -> Option<&str> {
        self.derived_key_field.as_deref()
    }

    /// Returns the script used instead of a plain lookup.
    #[must_use]
    pub fn get_script(&self) -> Option<&ScriptCall> {
        self.get_script.as_ref()
    }

    /// Returns the script run after a successful store.
    #[must_use]
    pub fn post_store_script(&self) -> Option<&ScriptCall> {
        self.post_store_script.as_ref()
    }

    /// Returns the result field appended as the post-store script's final argument.
    #[must_use]
    pub fn derive_last_arg_field(&self) -> Option<&str> {
        self.derive_last_arg_field.as_deref()
    }

    /// Returns `true` if any annotation needs backend script support.
    #[must_use]
    pub fn uses_scripts(&self) -> bool {
        self.get_script.is_some() || self.post_store_script.is_some()
    }

    /// Checks the annotations against the backend's capabilities.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a script hook is set but the backend
    /// cannot evaluate scripts, or when a derived last argument is set without a
    /// post-store script.
    pub fn validate(&self, scripts_supported: bool) -> Result<(), Error> {
        if self.uses_scripts() && !scripts_supported {
            return Err(Error::configuration(
                "script hooks are configured but the backend does not support script evaluation",
            ));
        }
        if self.derive_last_arg_field.is_some() && self.post_store_script.is_none() {
            return Err(Error::configuration(
                "a derived last script argument needs a post-store script",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doccache_backend::ErrorKind;
    use serde_json::json;

    #[test]
    fn ttl_zero_never_expires() {
        assert!(Ttl::FOREVER.is_forever());
        assert_eq!(Ttl::secs(0).expiry(), Expiry::Never);
        assert_eq!(Ttl::default(), Ttl::DEFAULT);
        assert_eq!(Ttl::DEFAULT.as_secs(), 60);
    }

    #[test]
    fn string_spec_is_custom_key_with_default_ttl() {
        let spec = CacheSpec::from("k".to_string());
        assert_eq!(spec.ttl(), Ttl::DEFAULT);
        assert_eq!(spec.key(), Some("k"));
        assert_eq!(CacheSpec::from(Ttl::secs(5)).key(), None);
    }

    #[test]
    fn empty_key_counts_as_absent() {
        let annotations = CacheAnnotations {
            ttl: Some(Ttl::DEFAULT),
            key: Some(String::new()),
            ..CacheAnnotations::default()
        };
        assert_eq!(annotations.key(), None);
    }

    #[test]
    fn scripts_need_backend_support() {
        let annotations = CacheAnnotations {
            ttl: Some(Ttl::DEFAULT),
            get_script: Some(ScriptCall::new("sha", [json!(1)])),
            ..CacheAnnotations::default()
        };
        assert_eq!(
            annotations.validate(false).expect_err("unsupported").kind(),
            ErrorKind::Configuration
        );
        annotations.validate(true).expect("supported");
    }

    #[test]
    fn derive_last_arg_needs_post_store_script() {
        let annotations = CacheAnnotations {
            ttl: Some(Ttl::DEFAULT),
            derive_last_arg_field: Some("id".to_string()),
            ..CacheAnnotations::default()
        };
        assert!(annotations.validate(true).expect_err("no script").is_configuration());
    }

    #[test]
    fn plain_annotations_validate_everywhere() {
        let annotations = CacheAnnotations {
            ttl: Some(Ttl::FOREVER),
            derived_key_field: Some("id".to_string()),
            ..CacheAnnotations::default()
        };
        annotations.validate(false).expect("no scripts involved");
        assert!(!annotations.uses_scripts());
    }
}
