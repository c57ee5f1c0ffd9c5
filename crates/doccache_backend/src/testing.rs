// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock backend implementation for testing.
//!
//! This module provides `MockBackend`, a configurable in-memory backend that
//! records all operations and supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde_json::Value;

use crate::{CacheBackend, Error, Expiry};

/// Recorded backend operation with full context.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation was performed.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: Value,
        /// The expiry the value was written with.
        expiry: Expiry,
    },
    /// A delete operation was performed with the given key.
    Del(String),
    /// A clear operation was performed.
    Clear,
    /// A script evaluation was requested.
    EvaluateScript {
        /// The script identifier.
        script: String,
        /// The script arguments.
        args: Vec<Value>,
    },
}

type FailPredicate = Box<dyn Fn(&BackendOp) -> bool + Send + Sync>;
type ScriptHandler = Box<dyn Fn(&str, &[Value]) -> Option<Value> + Send + Sync>;

/// A configurable mock backend for testing.
///
/// Values live in memory and every call is recorded, including script calls on a
/// backend without script support, so tests can assert that a call was never made.
///
/// # Examples
///
/// ```
/// use doccache_backend::{CacheBackend, Expiry, testing::{BackendOp, MockBackend}};
/// use serde_json::json;
///
/// # futures::executor::block_on(async {
/// let backend = MockBackend::new();
/// backend.set("key", json!(42), Expiry::Never).await.unwrap();
/// assert_eq!(backend.get("key").await.unwrap(), Some(json!(42)));
///
/// assert_eq!(backend.operations(), vec![
///     BackendOp::Set { key: "key".to_string(), value: json!(42), expiry: Expiry::Never },
///     BackendOp::Get("key".to_string()),
/// ]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use doccache_backend::{CacheBackend, testing::{BackendOp, MockBackend}};
///
/// # futures::executor::block_on(async {
/// let backend = MockBackend::new();
/// backend.fail_when(|op| matches!(op, BackendOp::Get(k) if k == "forbidden"));
/// assert!(backend.get("forbidden").await.is_err());
/// assert!(backend.get("allowed").await.is_ok());
/// # });
/// ```
pub struct MockBackend {
    data: Arc<Mutex<HashMap<String, (Value, Expiry)>>>,
    operations: Arc<Mutex<Vec<BackendOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    scripts: Option<Arc<ScriptHandler>>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("scripts", &self.scripts.is_some())
            .finish()
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            scripts: self.scripts.clone(),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a new empty mock backend without script support.
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// Creates a mock backend with pre-populated values that never expire.
    #[must_use]
    pub fn with_data(data: HashMap<String, Value>) -> Self {
        Self {
            data: Arc::new(Mutex::new(data.into_iter().map(|(k, v)| (k, (v, Expiry::Never))).collect())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            scripts: None,
        }
    }

    /// Creates an empty mock backend that supports scripts.
    ///
    /// Every script call is answered by `handler`, which receives the script
    /// identifier and its arguments.
    #[must_use]
    pub fn with_scripts<F>(handler: F) -> Self
    where
        F: Fn(&str, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        Self {
            scripts: Some(Arc::new(Box::new(handler))),
            ..Self::new()
        }
    }

    /// Returns the value stored under `key`, bypassing operation recording.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<Value> {
        self.data.lock().get(key).map(|(value, _)| value.clone())
    }

    /// Returns the expiry `key` was last written with.
    #[must_use]
    pub fn expiry_of(&self, key: &str) -> Option<Expiry> {
        self.data.lock().get(key).map(|(_, expiry)| *expiry)
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the backend holds a value for the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should fail.
    /// Failed operations are still recorded.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&BackendOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<BackendOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: BackendOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let name = match &op {
            BackendOp::Get(_) => "get",
            BackendOp::Set { .. } => "set",
            BackendOp::Del(_) => "del",
            BackendOp::Clear => "clear",
            BackendOp::EvaluateScript { .. } => "evaluate_script",
        };
        self.operations.lock().push(op);
        if fail {
            return Err(Error::backend(format!("mock: {name} failed")));
        }
        Ok(())
    }
}

impl CacheBackend for MockBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.record(BackendOp::Get(key.to_owned()))?;
        Ok(self.stored(key))
    }

    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<(), Error> {
        self.record(BackendOp::Set {
            key: key.to_owned(),
            value: value.clone(),
            expiry,
        })?;
        self.data.lock().insert(key.to_owned(), (value, expiry));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        self.record(BackendOp::Del(key.to_owned()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.record(BackendOp::Clear)?;
        self.data.lock().clear();
        Ok(())
    }

    fn supports_scripts(&self) -> bool {
        self.scripts.is_some()
    }

    async fn evaluate_script(&self, script: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        self.record(BackendOp::EvaluateScript {
            script: script.to_owned(),
            args: args.to_vec(),
        })?;
        match &self.scripts {
            Some(handler) => Ok(handler(script, args)),
            None => Err(Error::scripts_unsupported(script, args.len())),
        }
    }

    fn len(&self) -> Option<u64> {
        Some(self.data.lock().len() as u64)
    }
}
