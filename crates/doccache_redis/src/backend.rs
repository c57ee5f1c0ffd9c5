// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Redis backend implementation.

use doccache_backend::{CacheBackend, Error, Expiry};
use redis::aio::ConnectionManager;
use serde_json::Value;

use crate::builder::RedisBackendBuilder;
use crate::convert::{decode_stored, reply_to_json, script_arg};

const SCAN_BATCH: usize = 100;

/// A query result backend stored in Redis.
///
/// Results are written as JSON text. Writes with [`Expiry::After`] use `SET .. EX`
/// (rounded up to whole seconds); [`Expiry::Never`] writes use a plain `SET`.
/// Scripts are evaluated with `EVALSHA`.
///
/// Cloning is cheap: clones share the underlying connection manager.
#[derive(Clone)]
pub struct RedisBackend {
    connection: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend").field("key_prefix", &self.key_prefix).finish()
    }
}

impl RedisBackend {
    /// Creates a new builder for connecting a Redis backend.
    #[must_use]
    pub fn builder() -> RedisBackendBuilder {
        RedisBackendBuilder::new()
    }

    /// Wraps an existing connection manager.
    #[must_use]
    pub fn new(connection: ConnectionManager, key_prefix: impl Into<String>) -> Self {
        Self {
            connection,
            key_prefix: key_prefix.into(),
        }
    }

    /// Returns the prefix prepended to every key.
    #[must_use]
    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    fn full_key(&self, key: &str) -> String {
        prefixed(&self.key_prefix, key)
    }
}

fn prefixed(prefix: &str, key: &str) -> String {
    let mut full = String::with_capacity(prefix.len() + key.len());
    full.push_str(prefix);
    full.push_str(key);
    full
}

fn expiry_seconds(expiry: Expiry) -> Option<u64> {
    expiry.duration().map(|duration| {
        let secs = duration.as_secs();
        if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
    })
}

impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let mut connection = self.connection.clone();
        let stored: Option<String> = redis::cmd("GET")
            .arg(self.full_key(key))
            .query_async(&mut connection)
            .await
            .map_err(Error::backend)?;
        stored.as_deref().map(decode_stored).transpose()
    }

    async fn set(&self, key: &str, value: Value, expiry: Expiry) -> Result<(), Error> {
        let mut connection = self.connection.clone();
        let mut command = redis::cmd("SET");
        command.arg(self.full_key(key)).arg(value.to_string());
        if let Some(seconds) = expiry_seconds(expiry) {
            command.arg("EX").arg(seconds);
        }
        let () = command.query_async(&mut connection).await.map_err(Error::backend)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), Error> {
        let mut connection = self.connection.clone();
        let _removed: u64 = redis::cmd("DEL")
            .arg(self.full_key(key))
            .query_async(&mut connection)
            .await
            .map_err(Error::backend)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut connection = self.connection.clone();
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut connection)
                .await
                .map_err(Error::backend)?;
            if !keys.is_empty() {
                let _removed: u64 = redis::cmd("DEL")
                    .arg(&keys)
                    .query_async(&mut connection)
                    .await
                    .map_err(Error::backend)?;
            }
            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }

    fn supports_scripts(&self) -> bool {
        true
    }

    async fn evaluate_script(&self, script: &str, args: &[Value]) -> Result<Option<Value>, Error> {
        let mut connection = self.connection.clone();
        let mut command = redis::cmd("EVALSHA");
        command.arg(script);
        for arg in args {
            command.arg(script_arg(arg));
        }
        let reply: redis::Value = command.query_async(&mut connection).await.map_err(Error::backend)?;
        reply_to_json(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(prefixed("orders:", "abc"), "orders:abc");
        assert_eq!(prefixed("", "abc"), "abc");
    }

    #[test]
    fn expiry_rounds_up_to_whole_seconds() {
        assert_eq!(expiry_seconds(Expiry::Never), None);
        assert_eq!(expiry_seconds(Expiry::after(Duration::from_secs(60))), Some(60));
        assert_eq!(expiry_seconds(Expiry::after(Duration::from_millis(1500))), Some(2));
        assert_eq!(expiry_seconds(Expiry::after(Duration::from_millis(1))), Some(1));
    }
}
