//! Integration tests for the cache service against a real Redis.
//!
//! Covers the primary-store tier: round trips, native TTL expiry, prefix
//! invalidation, decode-error surfacing, and runtime degradation to the
//! in-process fallback.
//!
//! Tests use testcontainers to spin up a real Redis instance.

use serde_json::json;
use tastebase_cache::{CacheConfig, CacheService, ConnectionState, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests that don't kill the connection.
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{host_port}");

            (container, url)
        })
        .await;

    url.clone()
}

fn config_for(url: String) -> CacheConfig {
    CacheConfig {
        url: Some(url),
        pool_size: 5,
        timeout_ms: 2000,
        scan_batch: 10,
    }
}

async fn connected_service() -> CacheService {
    let cache = CacheService::new(config_for(get_redis_url().await));
    cache.init().await;
    assert_eq!(cache.state(), ConnectionState::Connected);
    cache
}

#[tokio::test]
async fn init_connects_to_primary_store() {
    let cache = connected_service().await;
    assert_eq!(cache.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn round_trip_through_primary_store() {
    let cache = connected_service().await;

    let value = json!({"title": "carbonara", "tags": ["pasta", "dinner"]});
    cache.set("it:recipe:42", &value, None).await.unwrap();

    assert_eq!(cache.get("it:recipe:42").await.unwrap(), Some(value));

    cache.del("it:recipe:42").await.unwrap();
    assert_eq!(cache.get("it:recipe:42").await.unwrap(), None);
}

#[tokio::test]
async fn ttl_expires_on_primary_store() {
    let cache = connected_service().await;

    cache.set("it:ttl:1", &json!("v"), Some(1)).await.unwrap();
    assert_eq!(cache.get("it:ttl:1").await.unwrap(), Some(json!("v")));

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;

    assert_eq!(cache.get("it:ttl:1").await.unwrap(), None);
}

#[tokio::test]
async fn invalidate_sweeps_prefix_on_primary_store() {
    let cache = connected_service().await;

    cache.set("it:sweep:recipe:1", &json!(1), None).await.unwrap();
    cache.set("it:sweep:recipe:2", &json!(2), None).await.unwrap();
    cache.set("it:sweep:user:5", &json!(5), None).await.unwrap();

    cache.invalidate("it:sweep:recipe:").await;

    assert_eq!(cache.get("it:sweep:recipe:1").await.unwrap(), None);
    assert_eq!(cache.get("it:sweep:recipe:2").await.unwrap(), None);
    assert_eq!(cache.get("it:sweep:user:5").await.unwrap(), Some(json!(5)));
}

#[tokio::test]
async fn invalidate_scans_past_one_batch() {
    let cache = connected_service().await;

    // More keys than scan_batch, so the cursor loop has to iterate.
    for i in 0..50 {
        cache
            .set(&format!("it:bulk:recipe:{i}"), &json!(i), None)
            .await
            .unwrap();
    }

    cache.invalidate("it:bulk:recipe:").await;

    for i in 0..50 {
        assert_eq!(
            cache.get(&format!("it:bulk:recipe:{i}")).await.unwrap(),
            None
        );
    }
}

#[tokio::test]
async fn malformed_payload_surfaces_as_decode_error() {
    let cache = connected_service().await;
    let url = get_redis_url().await;

    // Plant a payload that is not JSON, bypassing the service.
    let client = redis::Client::open(url).expect("redis client");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("raw connection");
    redis::cmd("SET")
        .arg("it:broken:1")
        .arg("not json at all")
        .query_async::<()>(&mut conn)
        .await
        .expect("raw set");

    let err = cache.get("it:broken:1").await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }));

    // A bad payload is not a connection problem: no degradation.
    assert_eq!(cache.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn runtime_store_loss_degrades_irreversibly() {
    // Dedicated container: this test kills it.
    let container = Redis::default().start().await.expect("start redis");
    let host_port = container.get_host_port_ipv4(6379).await.expect("get port");

    let cache = CacheService::new(CacheConfig {
        url: Some(format!("redis://127.0.0.1:{host_port}")),
        pool_size: 2,
        timeout_ms: 1000,
        scan_batch: 10,
    });
    cache.init().await;
    assert_eq!(cache.state(), ConnectionState::Connected);

    cache.set("it:lost:1", &json!("v"), None).await.unwrap();

    container.stop().await.expect("stop redis");

    // The failing call falls through to the fallback store instead of
    // raising, and flips the state.
    assert_eq!(cache.get("it:lost:1").await.unwrap(), None);
    assert_eq!(cache.state(), ConnectionState::Degraded);

    // All subsequent operations are served locally and keep working.
    cache.set("it:lost:2", &json!({"a": 1}), None).await.unwrap();
    assert_eq!(cache.get("it:lost:2").await.unwrap(), Some(json!({"a": 1})));

    cache.invalidate("it:lost:").await;
    assert_eq!(cache.get("it:lost:2").await.unwrap(), None);

    // Still degraded: the transition never reverses.
    assert_eq!(cache.state(), ConnectionState::Degraded);
}
