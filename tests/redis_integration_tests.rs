//! Integration tests for the redis backend
//!
//! These tests require a running redis instance. Connection details come from
//! `REDIS_ADDR` (default `127.0.0.1:6379`).
//!
//! Run with: cargo test --features redis-backend -- --ignored
#![cfg(feature = "redis-backend")]

use std::time::Duration;
use tagcache::{AdapterRegistry, Engine, Options, TagCacheError};

const TTL: Duration = Duration::from_secs(300);

fn redis_options(section: &str) -> Options {
    let addr = std::env::var("REDIS_ADDR").unwrap_or_else(|_| "127.0.0.1:6379".to_string());
    Options::builder()
        .adapter("redis")
        .adapter_config(format!(r#"{{"Addr":"{}"}}"#, addr))
        .section(section)
        .build()
}

fn unique_section() -> String {
    format!("tc-test-{}", uuid::Uuid::new_v4().simple())
}

#[tokio::test]
#[ignore]
async fn test_tag_cache_scenario() {
    let section = unique_section();
    let cache = Engine::new(&AdapterRegistry::with_defaults(), redis_options(&section))
        .await
        .expect("Failed to connect to redis");

    cache.set("da", "weisd", TTL).await.unwrap();
    assert_eq!(cache.get("da").await.unwrap(), Some("weisd".to_string()));

    cache.with_tags(["dd"]).set("da", "weisd", TTL).await.unwrap();
    assert_eq!(
        cache.with_tags(["dd"]).get("da").await.unwrap(),
        Some("weisd".to_string())
    );

    cache.with_tags(["aa"]).set("aa", "aaa", TTL).await.unwrap();
    cache.with_tags(["aa", "cc"]).set("cc", "dada", TTL).await.unwrap();
    assert_eq!(
        cache.with_tags(["aa", "cc"]).get("cc").await.unwrap(),
        Some("dada".to_string())
    );

    cache.with_tags(["aa"]).flush().await.unwrap();

    assert_eq!(cache.with_tags(["aa"]).get("aa").await.unwrap(), None);
    assert_eq!(cache.with_tags(["aa", "cc"]).get("cc").await.unwrap(), None);
    assert_eq!(cache.with_tags(["aa"]).get("bb").await.unwrap(), None);
    assert_eq!(
        cache.with_tags(["dd"]).get("da").await.unwrap(),
        Some("weisd".to_string())
    );

    cache.flush().await.unwrap();
    assert_eq!(cache.get("da").await.unwrap(), None);
}

#[tokio::test]
#[ignore]
async fn test_counters_batch_and_touch() {
    let section = unique_section();
    let cache = Engine::new(&AdapterRegistry::with_defaults(), redis_options(&section))
        .await
        .expect("Failed to connect to redis");

    assert_eq!(cache.increment("n").await.unwrap(), 1);
    assert_eq!(cache.decrement("n").await.unwrap(), 0);

    let mut items = std::collections::HashMap::new();
    items.insert("a".to_string(), "1".to_string());
    items.insert("b".to_string(), String::new());
    cache.batch_set(&items, TTL).await.unwrap();

    let values = cache
        .batch_get(&["a".to_string(), "missing".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(
        values,
        vec![Some("1".to_string()), None, Some(String::new())]
    );

    cache.touch("a", Duration::ZERO).await.unwrap();
    cache.delete("a").await.unwrap();
    assert_eq!(cache.get("a").await.unwrap(), None);

    cache.flush().await.unwrap();
}

#[tokio::test]
async fn test_connection_failure() {
    let options = Options::builder()
        .adapter("redis")
        .adapter_config(r#"{"addr":"127.0.0.1:1"}"#)
        .build();

    let err = Engine::new(&AdapterRegistry::with_defaults(), options)
        .await
        .unwrap_err();
    assert!(matches!(err, TagCacheError::ConnectionError(_)));
}
