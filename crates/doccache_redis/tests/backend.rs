// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `RedisBackend`.
//!
//! These tests need a live server and only run when `DOCCACHE_REDIS_URL` is set.

use doccache_backend::{CacheBackend, Expiry};
use doccache_redis::RedisBackend;
use serde_json::json;
use std::time::Duration;

async fn connect(prefix: &str) -> Option<RedisBackend> {
    let url = std::env::var("DOCCACHE_REDIS_URL").ok()?;
    Some(
        RedisBackend::builder()
            .url(url)
            .key_prefix(prefix)
            .build()
            .await
            .expect("failed to connect to redis"),
    )
}

#[tokio::test]
async fn set_get_del_round_trip() {
    let Some(backend) = connect("doccache-test-rt:").await else {
        return;
    };

    backend
        .set("doc", json!({"name": "ada", "tags": ["x"]}), Expiry::after(Duration::from_secs(30)))
        .await
        .expect("set failed");
    assert_eq!(
        backend.get("doc").await.expect("get failed"),
        Some(json!({"name": "ada", "tags": ["x"]}))
    );

    backend.del("doc").await.expect("del failed");
    assert_eq!(backend.get("doc").await.expect("get failed"), None);
}

#[tokio::test]
async fn clear_only_touches_prefix() {
    let Some(mine) = connect("doccache-test-mine:").await else {
        return;
    };
    let Some(theirs) = connect("doccache-test-theirs:").await else {
        return;
    };

    mine.set("a", json!(1), Expiry::Never).await.expect("set failed");
    theirs.set("a", json!(2), Expiry::Never).await.expect("set failed");

    mine.clear().await.expect("clear failed");

    assert_eq!(mine.get("a").await.expect("get failed"), None);
    assert_eq!(theirs.get("a").await.expect("get failed"), Some(json!(2)));
    theirs.clear().await.expect("clear failed");
}

#[tokio::test]
async fn supports_scripts() {
    let Some(backend) = connect("doccache-test-scripts:").await else {
        return;
    };
    assert!(backend.supports_scripts());
    assert_eq!(backend.key_prefix(), "doccache-test-scripts:");
}
