//! Integration tests for the tool result cache and its durable tier

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tool_guardrails::cache::clock::ManualClock;
use tool_guardrails::cache::store::{DurableStore, MemoryStore};
use tool_guardrails::cache::{CacheOptions, CachePolicies, ToolResult, ToolResultCache};
use tool_guardrails::StoreError;

/// Store that fails every call
struct BrokenStore {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl DurableStore for BrokenStore {
    async fn get(&self, _: &str, _: &str) -> Result<Option<String>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn put(&self, _: &str, _: &str, _: String, _: u64) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn delete_namespace(&self, _: &str) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }
}

/// Store that never answers in time
struct StalledStore;

#[async_trait::async_trait]
impl DurableStore for StalledStore {
    async fn get(&self, _: &str, _: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }

    async fn put(&self, _: &str, _: &str, _: String, _: u64) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }

    async fn delete(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn delete_namespace(&self, _: &str) -> Result<usize, StoreError> {
        Ok(0)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(0)
    }
}

fn options(timeout_ms: u64) -> CacheOptions {
    CacheOptions {
        durable_timeout: Duration::from_millis(timeout_ms),
        ..CacheOptions::default()
    }
}

#[tokio::test]
async fn test_broken_store_degrades_to_memory() {
    let store = Arc::new(BrokenStore {
        calls: AtomicUsize::new(0),
    });
    let cache = ToolResultCache::new(CachePolicies::builtin(), options(250)).with_durable(store.clone());
    let args = json!({"path": "/etc/hosts"});

    assert!(cache.get("read_file", &args, None).await.is_none());
    cache.set("read_file", &args, &ToolResult::ok("127.0.0.1 localhost"), None, None).await;

    let hit = cache.get("read_file", &args, None).await.unwrap();
    assert_eq!(hit.content, "127.0.0.1 localhost");
    assert!(store.calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(cache.clean_expired().await, 0);

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn test_stalled_store_bounded_by_timeout() {
    let cache = ToolResultCache::new(CachePolicies::builtin(), options(20))
        .with_durable(Arc::new(StalledStore));
    let args = json!({"pattern": "TODO", "path": "src"});

    let started = std::time::Instant::now();
    assert!(cache.get("grep", &args, None).await.is_none());
    cache.set("grep", &args, &ToolResult::ok("src/lib.rs:1"), None, None).await;
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(cache.get("grep", &args, None).await.is_some());
}

#[tokio::test]
async fn test_shared_durable_tier_across_instances() {
    let clock = Arc::new(ManualClock::new(1_000));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let writer = ToolResultCache::new(CachePolicies::builtin(), options(250))
        .with_durable(store.clone())
        .with_clock(clock.clone());
    let reader = ToolResultCache::new(CachePolicies::builtin(), options(250))
        .with_durable(store.clone())
        .with_clock(clock.clone());
    let args = json!({"url": "https://example.com"});

    writer.set("web_fetch", &args, &ToolResult::ok("<html>"), None, None).await;
    assert_eq!(store.len(), 1);

    let hit = reader.get("web_fetch", &args, None).await.unwrap();
    assert_eq!(hit.content, "<html>");
    assert_eq!(reader.stats().entries, 1);

    // Past the 15 minute TTL both tiers miss
    clock.advance(15 * 60_000 + 1);
    assert!(reader.get("web_fetch", &args, None).await.is_none());
}

#[tokio::test]
async fn test_path_invalidation_leaves_durable_tier() {
    let clock = Arc::new(ManualClock::new(0));
    let store = Arc::new(MemoryStore::with_clock(clock.clone()));
    let cache = ToolResultCache::new(CachePolicies::builtin(), options(250))
        .with_durable(store.clone())
        .with_clock(clock);
    let args = json!({"path": "/repo/README.md"});

    cache.set("read_file", &args, &ToolResult::ok("v1"), None, None).await;
    assert_eq!(cache.invalidate_for_path("/repo/README.md"), 1);
    assert_eq!(cache.stats().entries, 0);

    // The durable copy survives until its TTL and is promoted again
    assert_eq!(store.len(), 1);
    assert!(cache.get("read_file", &args, None).await.is_some());
}

#[tokio::test]
async fn test_invalidate_tool_clears_durable_namespace() {
    let store = Arc::new(MemoryStore::new());
    let cache = ToolResultCache::new(CachePolicies::builtin(), options(250)).with_durable(store.clone());

    for path in ["/a", "/b", "/c"] {
        cache
            .set("read_file", &json!({"path": path}), &ToolResult::ok(path), None, None)
            .await;
    }
    cache.set("glob", &json!({"pattern": "*.rs"}), &ToolResult::ok("x.rs"), None, None).await;
    assert_eq!(store.len(), 4);

    cache.invalidate("read_file", None, None).await;
    assert_eq!(store.len(), 1);
    assert_eq!(cache.stats().entries, 1);
}

#[tokio::test]
async fn test_ttl_override() {
    let clock = Arc::new(ManualClock::new(0));
    let cache = ToolResultCache::new(CachePolicies::builtin(), options(250)).with_clock(clock.clone());
    let args = json!({"query": "rust async"});

    cache
        .set("web_search", &args, &ToolResult::ok("results"), Some(1_000), None)
        .await;
    clock.advance(999);
    assert!(cache.get("web_search", &args, None).await.is_some());
    clock.advance(2);
    assert!(cache.get("web_search", &args, None).await.is_none());
}
