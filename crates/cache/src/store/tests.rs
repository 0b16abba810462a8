use std::time::Duration;

use super::*;

const TTL: Duration = Duration::from_secs(1);
const MAX_STALE: Duration = Duration::from_secs(5);

fn key(s: &str) -> RequestKey {
    RequestKey::named(s)
}

#[test_log::test(tokio::test(start_paused = true))]
async fn entries_go_from_fresh_to_stale_to_gone() {
    let cache = TieredCache::new(10);
    cache.insert(key("a"), 1u32, TTL, MAX_STALE, []);

    let hit = cache.get::<u32>(&key("a")).expect("present");
    assert!(hit.fresh);
    assert_eq!(hit.value, 1);

    tokio::time::advance(Duration::from_secs(3)).await;
    let hit = cache.get::<u32>(&key("a")).expect("still present");
    assert!(!hit.fresh);
    assert_eq!(hit.age, Duration::from_secs(3));

    tokio::time::advance(Duration::from_secs(3)).await;
    assert_eq!(cache.get::<u32>(&key("a")), None);
    assert!(cache.is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn lookup_with_other_type_is_a_miss() {
    let cache = TieredCache::new(10);
    cache.insert(key("a"), "text".to_string(), TTL, MAX_STALE, []);

    assert_eq!(cache.get::<u32>(&key("a")), None);
    assert_eq!(
        cache.get::<String>(&key("a")).map(|v| v.value),
        Some("text".to_string())
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn least_recently_used_is_evicted_first() {
    let cache = TieredCache::new(2);
    cache.insert(key("a"), 1u32, TTL, MAX_STALE, []);
    cache.insert(key("b"), 2u32, TTL, MAX_STALE, []);

    // Touch "a", so "b" becomes the least recently used
    assert!(cache.get::<u32>(&key("a")).is_some());
    cache.insert(key("c"), 3u32, TTL, MAX_STALE, []);

    assert_eq!(cache.len(), 2);
    assert!(cache.get::<u32>(&key("a")).is_some());
    assert!(cache.get::<u32>(&key("b")).is_none());
    assert!(cache.get::<u32>(&key("c")).is_some());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn dead_entries_are_evicted_before_live_ones() {
    let cache = TieredCache::new(2);
    cache.insert(key("old"), 1u32, TTL, Duration::from_secs(2), []);
    tokio::time::advance(Duration::from_secs(1)).await;
    cache.insert(key("a"), 2u32, TTL, MAX_STALE, []);
    tokio::time::advance(Duration::from_secs(2)).await;
    assert!(cache.get::<u32>(&key("a")).is_some());
    cache.insert(key("b"), 3u32, TTL, MAX_STALE, []);

    assert_eq!(cache.len(), 2);
    assert!(cache.get::<u32>(&key("a")).is_some());
    assert!(cache.get::<u32>(&key("b")).is_some());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn tags_invalidate_in_bulk() {
    let cache = TieredCache::new(10);
    cache.insert(
        key("post:alice/1"),
        1u32,
        TTL,
        MAX_STALE,
        ["author:alice".to_string(), "community:hive-1".to_string()],
    );
    cache.insert(
        key("post:alice/2"),
        2u32,
        TTL,
        MAX_STALE,
        ["author:alice".to_string()],
    );
    cache.insert(key("post:bob/1"), 3u32, TTL, MAX_STALE, ["author:bob".to_string()]);

    assert_eq!(cache.invalidate_tag("author:alice"), 2);
    assert_eq!(cache.invalidate_tag("author:alice"), 0);
    assert_eq!(cache.len(), 1);

    assert!(cache.invalidate(&key("post:bob/1")));
    assert!(!cache.invalidate(&key("post:bob/1")));

    cache.insert(key("x"), 1u32, TTL, MAX_STALE, []);
    cache.clear();
    assert!(cache.is_empty());
}
