// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Caching a user lookup in front of a slow driver.

use std::sync::Arc;
use std::time::Duration;

use doccache::key::Structured;
use doccache::{JsonModel, Query, QueryCache, Ttl};
use layered::{Execute, Service, Stack};
use serde::Deserialize;
use serde_json::{Value, json};
use tick::Clock;

#[derive(Debug, Deserialize)]
#[expect(dead_code, reason = "fields are shown through Debug")]
struct User {
    id: String,
    name: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), doccache::Error> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let cache = Arc::new(
        QueryCache::builder(Clock::new_tokio())
            .memory()
            .name("users")
            .logs()
            .build(),
    );

    let driver = Execute::new(|query: Query<JsonModel<User>>| async move {
        println!("driver: running {} on {}", query.kind().as_str(), query.description().model());
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok::<Value, std::io::Error>(json!([{"id": "u1", "name": "ada"}]))
    });
    let users = (cache.layer(), driver).into_service();

    let model = Arc::new(JsonModel::<User>::new("User"));
    let query = Query::find(model)
        .filter(Structured::mapping([("active", true)]))
        .cache(Ttl::secs(30));

    for attempt in 1..=2 {
        let found = users.execute(query.clone()).await?;
        println!("attempt {attempt}: {:?}", found.into_many());
    }

    cache.clear_cache(None).await?;
    Ok(())
}
