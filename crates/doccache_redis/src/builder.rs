// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for connecting Redis backends.

use doccache_backend::Error;
use redis::Client;
use redis::aio::ConnectionManager;

use crate::backend::RedisBackend;

#[derive(Debug)]
enum Target {
    Url(String),
    Client(Client),
}

/// Builder for configuring a [`RedisBackend`].
///
/// # Examples
///
/// ```no_run
/// use doccache_redis::RedisBackend;
///
/// # async fn example() -> Result<(), doccache_backend::Error> {
/// let backend = RedisBackend::builder()
///     .url("redis://cache.internal:6379/2")
///     .key_prefix("orders:")
///     .build()
///     .await?;
/// # let _ = backend;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RedisBackendBuilder {
    target: Target,
    key_prefix: String,
}

impl Default for RedisBackendBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RedisBackendBuilder {
    /// Creates a builder pointing at a local Redis on the default port.
    #[must_use]
    pub fn new() -> Self {
        Self {
            target: Target::Url("redis://127.0.0.1:6379".to_string()),
            key_prefix: String::new(),
        }
    }

    /// Sets the connection URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.target = Target::Url(url.into());
        self
    }

    /// Uses an already configured client instead of a URL.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.target = Target::Client(client);
        self
    }

    /// Sets a prefix prepended to every key this backend touches.
    ///
    /// `clear` only removes keys under this prefix. With an empty prefix, `clear`
    /// removes every key in the selected database.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Connects and builds the configured [`RedisBackend`].
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid URL and a backend error when the
    /// connection cannot be established.
    pub async fn build(self) -> Result<RedisBackend, Error> {
        let client = match self.target {
            Target::Url(url) => Client::open(url.as_str()).map_err(Error::configuration)?,
            Target::Client(client) => client,
        };
        let connection = ConnectionManager::new(client).await.map_err(Error::backend)?;
        Ok(RedisBackend::new(connection, self.key_prefix))
    }
}
