//! Memory cache integration tests.
//!
//! Tests verify:
//! - Least-recently-used eviction order
//! - Pinned entries survive eviction, and releasing pins trims the cache
//! - Capacity accounting stays consistent under concurrent use

use std::thread;

use pixcache::{CacheConfig, ImageCacheService, MemoryCache};

use super::test_utils::{image, key};

// =============================================================================
// LRU Eviction
// =============================================================================

#[test]
fn test_recently_read_entry_survives() {
    // Capacity of two units, one unit per entry
    let cache = MemoryCache::with_capacity(2);
    let (k1, k2, k3) = (key(1, 1), key(2, 2), key(3, 3));

    cache.put(&k1, image(1, 1), 1);
    cache.put(&k2, image(2, 2), 1);
    assert!(cache.get(k1.exact()).is_some());
    cache.put(&k3, image(3, 3), 1);

    assert!(cache.exist(k1.exact()));
    assert!(!cache.exist(k2.exact()));
    assert!(cache.exist(k3.exact()));
    assert_eq!(cache.size(), 2);
    assert_eq!(cache.stats().evictions, 1);
}

#[test]
fn test_large_insert_evicts_several() {
    let cache = MemoryCache::with_capacity(100);
    for i in 1..=4 {
        cache.put(&key(i, i), image(i, i), 25);
    }
    assert_eq!(cache.len(), 4);

    cache.put(&key(50, 50), image(50, 50), 60);

    // The three oldest had to go to make room for 60 bytes
    assert_eq!(cache.len(), 2);
    assert!(cache.exist(key(4, 4).exact()));
    assert!(cache.exist(key(50, 50).exact()));
    assert_eq!(cache.size(), 85);
}

// =============================================================================
// Pinning
// =============================================================================

#[test]
fn test_pinned_entry_is_skipped() {
    let cache = MemoryCache::with_capacity(2);
    let (k1, k2, k3) = (key(1, 1), key(2, 2), key(3, 3));

    cache.put(&k1, image(1, 1), 1);
    cache.put(&k2, image(2, 2), 1);
    let pinned = cache.acquire(k1.exact()).unwrap();
    // Touch k2 so the pinned k1 is least recently used
    cache.get(k2.exact());

    cache.put(&k3, image(3, 3), 1);
    assert!(cache.exist(k1.exact()));
    assert!(!cache.exist(k2.exact()));
    assert_eq!(pinned.width(), 1);
}

#[test]
fn test_release_trims_back_to_capacity() {
    let cache = MemoryCache::with_capacity(2);
    let (k1, k2, k3) = (key(1, 1), key(2, 2), key(3, 3));

    cache.put(&k1, image(1, 1), 1);
    cache.put(&k2, image(2, 2), 1);
    let p1 = cache.acquire(k1.exact()).unwrap();
    let p2 = cache.acquire(k2.exact()).unwrap();

    cache.put(&k3, image(3, 3), 1);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.size(), 3);
    assert_eq!(cache.stats().overshoots, 1);

    drop(p1);
    assert_eq!(cache.size(), 2);
    assert!(!cache.exist(k1.exact()));

    drop(p2);
    assert_eq!(cache.size(), 2);
    assert!(cache.exist(k2.exact()));
    assert!(cache.exist(k3.exact()));
}

#[test]
fn test_nested_pins() {
    let cache = MemoryCache::with_capacity(1);
    let k1 = key(1, 1);
    cache.put(&k1, image(1, 1), 1);

    let a = cache.acquire(k1.exact()).unwrap();
    let b = cache.acquire(k1.exact()).unwrap();
    assert_eq!(cache.pin_count(k1.exact()), Some(2));

    drop(a);
    cache.put(&key(2, 2), image(2, 2), 1);
    assert!(cache.exist(k1.exact()));

    drop(b);
    assert_eq!(cache.len(), 1);
    assert!(cache.exist(key(2, 2).exact()));
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_puts_and_gets() {
    let cache = MemoryCache::with_capacity(1_000);

    thread::scope(|scope| {
        for t in 0..8u32 {
            let cache = cache.clone();
            scope.spawn(move || {
                for i in 0..200u32 {
                    let k = key(t * 1_000 + i + 1, 1);
                    cache.put(&k, image(1, 1), 10);
                    let _ = cache.get(k.exact());
                    if let Some(pinned) = cache.acquire(k.exact()) {
                        assert_eq!(pinned.height(), 1);
                    }
                }
            });
        }
    });

    // No pins remain, so the cache must be within capacity
    assert!(cache.size() <= 1_000);
    assert_eq!(cache.size(), cache.len() as u64 * 10);
    assert_eq!(cache.stats().insertions, 1_600);
    assert_eq!(
        cache.stats().evictions + cache.len() as u64,
        cache.stats().insertions
    );
}

#[test]
fn test_services_share_a_cache() {
    let cache = MemoryCache::with_capacity(1_000);
    let writer = ImageCacheService::with_cache(cache.clone(), CacheConfig::default());
    let reader = ImageCacheService::with_cache(cache, CacheConfig::default());

    let k = key(10, 10);
    writer.store(&k, image(10, 10), 400);

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                assert!(reader.acquire(&k).is_some());
            });
        }
    });
    assert_eq!(reader.cache().pin_count(k.exact()), Some(0));
    assert_eq!(reader.cache().stats().hits, 0);
}
