// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Storage backend contract for the doccache query result cache.
//!
//! This crate defines the [`CacheBackend`] trait that every storage backend must satisfy,
//! the [`Expiry`] type backends receive on writes, and the [`Error`] type shared by the
//! whole doccache family.
//!
//! # Overview
//!
//! The query cache only needs a small contract from its storage: get, set with expiry,
//! delete, clear, and (optionally) server-side script evaluation. Values are raw JSON
//! documents, keys are strings. Implement [`CacheBackend`] for your store and hand it to
//! `doccache` to get cache-aside behavior on top of it.
//!
//! # Implementing a Backend
//!
//! ```
//! use doccache_backend::{CacheBackend, Error, Expiry};
//! use serde_json::Value;
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleBackend(RwLock<HashMap<String, Value>>);
//!
//! impl CacheBackend for SimpleBackend {
//!     async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
//!         Ok(self.0.read().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &str, value: Value, _expiry: Expiry) -> Result<(), Error> {
//!         self.0.write().unwrap().insert(key.to_owned(), value);
//!         Ok(())
//!     }
//!
//!     async fn del(&self, key: &str) -> Result<(), Error> {
//!         self.0.write().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     async fn clear(&self) -> Result<(), Error> {
//!         self.0.write().unwrap().clear();
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Backends that cannot evaluate scripts keep the default [`CacheBackend::supports_scripts`]
//! and [`CacheBackend::evaluate_script`], which report a configuration error.
//!
//! # Dynamic Dispatch
//!
//! Enable the `dynamic` feature (on by default) for [`DynamicBackend`], a cloneable,
//! type-erased backend used by the process-wide query cache registry.

mod backend;
pub mod error;
mod expiry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[cfg(any(test, feature = "dynamic"))]
mod dynamic;

#[doc(inline)]
pub use backend::CacheBackend;
#[cfg(any(test, feature = "dynamic"))]
#[doc(inline)]
pub use dynamic::{DynamicBackend, DynamicBackendExt};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use expiry::Expiry;
