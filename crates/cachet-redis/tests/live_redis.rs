//! Integration tests against a running Redis.
//!
//! Ignored by default; run with a local server (or point `REDIS_HOST` /
//! `REDIS_PORT` elsewhere) via `cargo test -- --ignored`.

use cachet_redis::{Cache, CacheConfig, CacheExt, RedisCache};
use std::sync::Arc;

fn test_config() -> CacheConfig {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);

    CacheConfig::builder()
        .host(host)
        .port(port)
        .max_connect_attempts(3)
        .connect_retry_delay_ms(100)
        .build()
        .unwrap()
}

async fn connect() -> RedisCache {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    RedisCache::connect(test_config()).await.unwrap()
}

fn key(name: &str) -> String {
    format!("cachet:test:{}:{}", std::process::id(), name)
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn store_then_get_returns_raw_value() {
    let cache = connect().await;
    let key = key("raw");

    cache.store_raw(&key, "opaque-token", Some(60)).await.unwrap();
    assert_eq!(cache.get_raw(&key).await.as_deref(), Some("opaque-token"));

    cache.delete(&[&key]).await;
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn store_bytes_round_trips_json_payload() {
    let cache = connect().await;
    let key = key("bytes");

    cache
        .store_bytes(&key, br#"{"n": 7}"#, Some(60))
        .await
        .unwrap();
    assert_eq!(cache.get_raw(&key).await.as_deref(), Some(r#"{"n": 7}"#));

    cache.delete(&[&key]).await;
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn typed_store_then_get_round_trips() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Entry {
        id: u64,
        name: String,
    }

    let cache = connect().await;
    let key = key("typed");
    let entry = Entry {
        id: 9,
        name: "ada".to_string(),
    };

    cache.store(&key, &entry, Some(60)).await.unwrap();
    let loaded: Entry = cache.get(&key).await.unwrap();
    assert_eq!(loaded, entry);

    cache.delete(&[&key]).await;
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn store_exists_delete_scenario() {
    let cache = connect().await;
    let key = key("scenario");

    cache.store_raw(&key, "1", Some(60)).await.unwrap();
    assert!(cache.contains_key(&key).await);

    assert_eq!(cache.delete(&[&key]).await, 1);
    assert!(!cache.contains_key(&key).await);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn never_stored_key_reads_as_absent() {
    let cache = connect().await;
    let key = key("never-stored");

    assert!(!cache.contains_key(&key).await);
    assert_eq!(cache.get_raw(&key).await, None);
    assert_eq!(cache.delete(&[&key]).await, 0);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn delete_removes_all_given_keys() {
    let cache = connect().await;
    let (a, b) = (key("multi-a"), key("multi-b"));

    cache.store_raw(&a, "1", Some(60)).await.unwrap();
    cache.store_raw(&b, "2", Some(60)).await.unwrap();

    assert_eq!(cache.delete(&[&a, &b]).await, 2);
    assert!(!cache.contains_key(&a).await);
    assert!(!cache.contains_key(&b).await);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn update_rewrites_value_without_resetting_ttl() {
    let cache = connect().await;
    let key = key("update-ttl");

    cache.store_raw(&key, "before", Some(100)).await.unwrap();
    cache.update_preserving_ttl(&key, "after").await.unwrap();

    assert_eq!(cache.get_raw(&key).await.as_deref(), Some("after"));

    let mut conn = cache.connection().await.unwrap();
    let remaining: i64 = redis::cmd("TTL").arg(&key).query_async(&mut conn).await.unwrap();
    assert!(remaining > 0 && remaining <= 100, "ttl was {remaining}");

    cache.delete(&[&key]).await;
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn update_leaves_persistent_key_untouched() {
    let cache = connect().await;
    let key = key("update-persistent");

    let mut conn = cache.connection().await.unwrap();
    let _: () = redis::cmd("SET").arg(&key).arg("orig").query_async(&mut conn).await.unwrap();

    cache.update_preserving_ttl(&key, "changed").await.unwrap();
    assert_eq!(cache.get_raw(&key).await.as_deref(), Some("orig"));

    cache.delete(&[&key]).await;
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn update_of_absent_key_is_a_silent_noop() {
    let cache = connect().await;
    let key = key("update-absent");

    cache.update_preserving_ttl(&key, "value").await.unwrap();
    assert!(!cache.contains_key(&key).await);
}

#[tokio::test]
#[ignore = "requires a running redis"]
async fn concurrent_first_use_shares_one_connection() {
    let cache = Arc::new(RedisCache::connect_lazy(test_config()).unwrap());
    let key = key("concurrent");

    let mut tasks = Vec::new();
    for i in 0..8 {
        let cache = Arc::clone(&cache);
        let key = format!("{key}:{i}");
        tasks.push(tokio::spawn(async move {
            cache.store_raw(&key, "v", Some(60)).await.unwrap();
            assert!(cache.contains_key(&key).await);
            key
        }));
    }

    let mut keys = Vec::new();
    for task in tasks {
        keys.push(task.await.unwrap());
    }

    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    assert_eq!(cache.delete(&refs).await, 8);
}
