// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for caching a query driver through a layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use doccache::{Error, ErrorKind, JsonModel, Query, QueryCache, QueryOutput, Ttl};
use doccache_backend::testing::{BackendOp, MockBackend};
use layered::{Execute, Layer, Service, Stack};
use serde_json::{Value, json};
use tick::Clock;

type TestResult = Result<(), Error>;
type Users = JsonModel<Value>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn users() -> Arc<Users> {
    Arc::new(JsonModel::new("User"))
}

/// A driver answering every query with the model name and operation.
fn counting_driver(calls: &Arc<AtomicUsize>) -> impl Service<Query<Users>, Out = Result<Value, std::io::Error>> {
    let calls = Arc::clone(calls);
    Execute::new(move |query: Query<Users>| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
            Ok(json!([{
                "model": query.description().model(),
                "op": query.kind().as_str(),
            }]))
        }
    })
}

#[test]
fn driver_runs_once_per_cached_query() -> TestResult {
    block_on(async {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(QueryCache::builder(Clock::new_frozen()).memory().build());
        let driver = (cache.layer(), counting_driver(&calls)).into_service();

        let query = Query::find(users()).cache(Ttl::DEFAULT);
        let first = driver.execute(query.clone()).await?;
        let second = driver.execute(query).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert_eq!(first.into_many(), vec![json!({"model": "User", "op": "find"})]);
        Ok(())
    })
}

#[test]
fn uncached_queries_reach_the_driver_every_time() -> TestResult {
    block_on(async {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = MockBackend::new();
        let cache = Arc::new(QueryCache::builder(Clock::new_frozen()).backend(backend.clone()).build());
        let driver = cache.layer().layer(counting_driver(&calls));

        driver.execute(Query::find(users())).await?;
        driver.execute(Query::find(users())).await?;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(backend.operations().is_empty());
        Ok(())
    })
}

#[test]
fn driver_failures_become_execution_errors() {
    block_on(async {
        let backend = MockBackend::new();
        let cache = Arc::new(QueryCache::builder(Clock::new_frozen()).backend(backend.clone()).build());
        let failing = Execute::new(|_query: Query<Users>| async { Err::<Value, _>(std::io::Error::other("timeout")) });
        let driver = (cache.layer(), failing).into_service();

        let err = driver
            .execute(Query::count(users()).cache(Ttl::DEFAULT))
            .await
            .expect_err("driver fails");

        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(!backend.operations().iter().any(|op| matches!(op, BackendOp::Set { .. })));
    });
}

#[test]
fn layered_drivers_share_one_cache() -> TestResult {
    block_on(async {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = MockBackend::new();
        let cache = Arc::new(QueryCache::builder(Clock::new_frozen()).backend(backend.clone()).build());
        let layer = cache.layer();
        let a = layer.layer(counting_driver(&calls));
        let b = layer.clone().layer(counting_driver(&calls));

        let query = Query::count(users()).cache(Ttl::DEFAULT);
        let counting = Execute::new(|_query: Query<Users>| async { Ok::<_, std::io::Error>(json!(2)) });
        let c = layer.layer(counting);

        assert_eq!(c.execute(query.clone()).await?, QueryOutput::Count(2));
        // Both other drivers now hit the entry stored through the third one.
        assert_eq!(a.execute(query.clone()).await?.as_count(), Some(2));
        assert_eq!(b.execute(query).await?.as_count(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(a.cache(), b.cache()));
        Ok(())
    })
}
