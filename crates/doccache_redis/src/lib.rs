// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis query cache backend.
//!
//! [`RedisBackend`] stores raw query results as JSON text in Redis and is the only
//! bundled backend that evaluates server-side scripts, which makes it the backend to
//! pick when queries use script lookups or post-store script hooks.
//!
//! # Quick Start
//!
//! ```no_run
//! use doccache_backend::{CacheBackend, Expiry};
//! use doccache_redis::RedisBackend;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), doccache_backend::Error> {
//! let backend = RedisBackend::builder()
//!     .url("redis://127.0.0.1:6379")
//!     .key_prefix("doccache:")
//!     .build()
//!     .await?;
//!
//! backend.set("key", json!([1, 2, 3]), Expiry::Never).await?;
//!
//! // Scripts are addressed by their SHA1 digest; the first argument is `numkeys`.
//! let reply = backend
//!     .evaluate_script("e0e1f9fabfc9d4800c877a703b823ac0578ff8db", &[json!(1), json!("key")])
//!     .await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod builder;
mod convert;

#[doc(inline)]
pub use backend::RedisBackend;
#[doc(inline)]
pub use builder::RedisBackendBuilder;
