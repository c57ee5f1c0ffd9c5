// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process query cache backend backed by moka.
//!
//! This crate provides [`MemoryBackend`], a concurrent in-memory store for raw query
//! results. Every entry carries its own expiry, so results written with different
//! TTLs share one store. Use [`MemoryBackendBuilder`] to configure capacity without
//! exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use doccache_backend::{CacheBackend, Expiry};
//! use doccache_memory::MemoryBackend;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let backend = MemoryBackend::builder().max_capacity(1000).build();
//!
//! backend
//!     .set("key", json!({"name": "ada"}), Expiry::after(Duration::from_secs(60)))
//!     .await
//!     .unwrap();
//! assert_eq!(backend.get("key").await.unwrap(), Some(json!({"name": "ada"})));
//! # });
//! ```
//!
//! The memory backend does not evaluate scripts; script annotations against it are
//! reported as configuration errors.

pub mod backend;
pub mod builder;

#[doc(inline)]
pub use backend::MemoryBackend;
#[doc(inline)]
pub use builder::MemoryBackendBuilder;
