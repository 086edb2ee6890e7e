//! Memory cache for decoded images.
//!
//! This module provides an LRU cache for decoded images, preventing repeated
//! decodes of images that are already on screen or were shown recently.
//!
//! # Keys
//!
//! Entries are stored under the exact key of a [`CacheKey`]. The key also
//! carries the uri group and the spec it was derived from, which the
//! compatible lookup uses to find other variants of the same source image.
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached images in bytes and evicts
//! least-recently-used entries when the capacity is exceeded. Pinned entries
//! (see [`MemoryCache::acquire`]) are skipped; if only pinned entries and the
//! newest entry remain, the cache stays over capacity until a pin is released
//! or the next insertion.

use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::key::CacheKey;
use crate::request::{ImageSpec, PrecisionPolicy, TransformationId};

/// Default cache capacity: 100MB
pub const DEFAULT_MEMORY_CACHE_CAPACITY: u64 = 100 * 1024 * 1024;

// =============================================================================
// Cached Value
// =============================================================================

/// A decoded image as handed over by the decode pipeline.
///
/// The pixel data is opaque to the cache and shared by reference count;
/// cloning never copies pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    byte_size: u64,
    data: Bytes,
}

impl DecodedImage {
    /// Wrap decoded pixel data. The byte size is the length of `data`.
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            width,
            height,
            byte_size: data.len() as u64,
            data,
        }
    }

    /// Wrap an RGBA buffer produced by the `image` crate.
    pub fn from_rgba(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

struct CacheEntry {
    key: CacheKey,
    image: DecodedImage,
    size_bytes: u64,
    last_accessed_at: Instant,
    pin_count: u32,
    /// Distinguishes this entry from later entries stored under the same key
    generation: u64,
}

// =============================================================================
// Compatible Query
// =============================================================================

/// Constraints for [`MemoryCache::get_compatible`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibleQuery {
    pub uri_group: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub precision: PrecisionPolicy,
    pub transformations: Vec<TransformationId>,
}

impl CompatibleQuery {
    /// Build the query for the request described by `spec`.
    pub fn from_spec(spec: &ImageSpec) -> Self {
        Self {
            uri_group: spec.uri().to_string(),
            width: spec.width(),
            height: spec.height(),
            precision: spec.precision(),
            transformations: spec.transformations().to_vec(),
        }
    }

    /// Returns `true` if an entry cached for `cached` holding `image` can
    /// stand in for this request.
    pub fn accepts(&self, cached: &ImageSpec, image: &DecodedImage) -> bool {
        if cached.uri() != self.uri_group {
            return false;
        }

        // Only identical post-processing is reusable, in either direction.
        if cached.transformations() != self.transformations.as_slice() {
            return false;
        }

        if !self.precision.tolerates_smaller() {
            let too_narrow = self.width.is_some_and(|w| image.width() < w);
            let too_short = self.height.is_some_and(|h| image.height() < h);
            if too_narrow || too_short {
                return false;
            }
        }

        self.precision == PrecisionPolicy::LessPixels
            || cached.precision().rank() >= self.precision.rank()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Counters describing cache activity since creation.
///
/// `hits` and `misses` count exact-key reads through [`MemoryCache::get`]
/// only. A service lookup that misses its exact key and then finds a
/// compatible variant adds one to `misses` and one to `compatible_hits`.
/// Compatible lookups that find nothing are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Exact-key misses, including those later served by a compatible variant
    pub misses: u64,
    pub compatible_hits: u64,
    pub insertions: u64,
    pub evictions: u64,
    /// Insertions that left the cache over capacity (nothing evictable)
    pub overshoots: u64,
}

// =============================================================================
// Memory Cache
// =============================================================================

struct CacheState {
    lru: LruCache<String, CacheEntry>,
    total_bytes: u64,
    capacity: u64,
    next_generation: u64,
    stats: CacheStats,
}

impl CacheState {
    /// Evict unpinned entries, least recently used first, until the total
    /// size is at most `target`. The `protect`ed key is never chosen.
    /// Returns the number of evicted entries.
    fn evict_to(&mut self, target: u64, protect: Option<&str>) -> usize {
        let mut evicted = 0;
        while self.total_bytes > target {
            let victim = self
                .lru
                .iter()
                .rev()
                .find(|(exact, entry)| {
                    entry.pin_count == 0 && Some(exact.as_str()) != protect
                })
                .map(|(exact, _)| exact.clone());
            let Some(exact) = victim else {
                break;
            };
            if let Some(entry) = self.lru.pop(&exact) {
                self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
                self.stats.evictions += 1;
                evicted += 1;
                debug!(
                    key = %entry.key.short_fingerprint(),
                    size = entry.size_bytes,
                    "Evicted memory cache entry"
                );
            }
        }
        evicted
    }

    fn remove(&mut self, exact: &str) -> Option<CacheEntry> {
        let entry = self.lru.pop(exact)?;
        self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }
}

/// LRU cache for decoded images with size-based capacity and pinning.
///
/// # Thread Safety
///
/// All operations take a single internal lock for their whole duration.
/// `MemoryCache` is a cheap handle: clones share the same entries.
///
/// # Example
///
/// ```
/// use pixcache::cache::{DecodedImage, MemoryCache};
/// use pixcache::key::resolve;
/// use pixcache::request::ImageSpec;
///
/// let cache = MemoryCache::with_capacity(10 * 1024 * 1024);
/// let key = resolve(&ImageSpec::new("https://example.com/a.jpg").unwrap());
/// let image = DecodedImage::new(2, 2, vec![0u8; 16]);
///
/// cache.put(&key, image.clone(), 16);
/// assert_eq!(cache.get(key.exact()), Some(image));
/// ```
#[derive(Clone)]
pub struct MemoryCache {
    state: Arc<Mutex<CacheState>>,
}

impl MemoryCache {
    /// Create a new memory cache with default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CACHE_CAPACITY)
    }

    /// Create a new memory cache with the specified capacity in bytes.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                lru: LruCache::unbounded(),
                total_bytes: 0,
                capacity,
                next_generation: 0,
                stats: CacheStats::default(),
            })),
        }
    }

    /// Store an image under the exact key of `key`.
    ///
    /// Replaces any existing entry for the same key, then evicts
    /// least-recently-used unpinned entries until the cache is within
    /// capacity. The entry just stored is never evicted by its own insertion,
    /// so a following `get` always sees it.
    pub fn put(&self, key: &CacheKey, image: DecodedImage, size_bytes: u64) {
        let mut state = self.state.lock();

        if let Some(previous) = state.remove(key.exact()) {
            debug_assert!(
                previous.key.spec() == key.spec(),
                "KeyCollisionInvariantViolation: '{}' derived from unequal specs",
                key.exact()
            );
        }

        let generation = state.next_generation;
        state.next_generation += 1;
        state.lru.put(
            key.exact().to_string(),
            CacheEntry {
                key: key.clone(),
                image,
                size_bytes,
                last_accessed_at: Instant::now(),
                pin_count: 0,
                generation,
            },
        );
        state.total_bytes += size_bytes;
        state.stats.insertions += 1;

        let capacity = state.capacity;
        state.evict_to(capacity, Some(key.exact()));
        if state.total_bytes > capacity {
            state.stats.overshoots += 1;
            warn!(
                size = state.total_bytes,
                capacity, "Memory cache over capacity: remaining entries are pinned or just stored"
            );
        }
    }

    /// Get an image by exact key, marking it most recently used.
    pub fn get(&self, exact: &str) -> Option<DecodedImage> {
        let mut state = self.state.lock();
        match state.lru.get_mut(exact) {
            Some(entry) => {
                entry.last_accessed_at = Instant::now();
                let image = entry.image.clone();
                state.stats.hits += 1;
                Some(image)
            }
            None => {
                state.stats.misses += 1;
                None
            }
        }
    }

    /// Find the most recently used entry that can stand in for `query`.
    ///
    /// The chosen entry is marked most recently used.
    pub fn get_compatible(&self, query: &CompatibleQuery) -> Option<DecodedImage> {
        let mut state = self.state.lock();
        let exact = state
            .lru
            .iter()
            .find(|(_, entry)| query.accepts(entry.key.spec(), &entry.image))
            .map(|(exact, _)| exact.clone())?;

        let entry = state.lru.get_mut(&exact)?;
        entry.last_accessed_at = Instant::now();
        let image = entry.image.clone();
        state.stats.compatible_hits += 1;
        Some(image)
    }

    /// Get an image and pin it until the returned guard is dropped.
    ///
    /// Pinned entries are never evicted.
    pub fn acquire(&self, exact: &str) -> Option<PinnedImage> {
        let mut state = self.state.lock();
        let entry = state.lru.get_mut(exact)?;
        entry.last_accessed_at = Instant::now();
        entry.pin_count += 1;
        Some(PinnedImage {
            state: Arc::clone(&self.state),
            exact: exact.to_string(),
            generation: entry.generation,
            image: entry.image.clone(),
        })
    }

    /// Check if an entry exists without updating LRU order.
    pub fn exist(&self, exact: &str) -> bool {
        self.state.lock().lru.contains(exact)
    }

    /// Remove an entry. Returns `true` if it existed.
    ///
    /// Explicit removal ignores pins; holders keep their image data.
    pub fn remove(&self, exact: &str) -> bool {
        self.state.lock().remove(exact).is_some()
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.lru.clear();
        state.total_bytes = 0;
    }

    /// Evict unpinned entries until at most `target_bytes` remain.
    ///
    /// Returns the number of evicted entries.
    pub fn trim(&self, target_bytes: u64) -> usize {
        self.state.lock().evict_to(target_bytes, None)
    }

    /// Exact keys of all cached entries.
    pub fn keys(&self) -> HashSet<String> {
        self.state.lock().lru.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Current pin count of an entry.
    pub fn pin_count(&self, exact: &str) -> Option<u32> {
        self.state.lock().lru.peek(exact).map(|entry| entry.pin_count)
    }

    /// Time of the last read or write of an entry.
    pub fn last_accessed_at(&self, exact: &str) -> Option<Instant> {
        self.state
            .lock()
            .lru
            .peek(exact)
            .map(|entry| entry.last_accessed_at)
    }

    /// Get the current number of cached images.
    pub fn len(&self) -> usize {
        self.state.lock().lru.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().lru.is_empty()
    }

    /// Get the current total size of cached images in bytes.
    pub fn size(&self) -> u64 {
        self.state.lock().total_bytes
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.state.lock().capacity
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryCache")
            .field("len", &state.lru.len())
            .field("size", &state.total_bytes)
            .field("capacity", &state.capacity)
            .finish()
    }
}

// =============================================================================
// Pinned Image
// =============================================================================

/// A cached image pinned against eviction for as long as the guard lives.
pub struct PinnedImage {
    state: Arc<Mutex<CacheState>>,
    exact: String,
    generation: u64,
    image: DecodedImage,
}

impl PinnedImage {
    pub fn key(&self) -> &str {
        &self.exact
    }

    pub fn image(&self) -> &DecodedImage {
        &self.image
    }
}

impl Deref for PinnedImage {
    type Target = DecodedImage;

    fn deref(&self) -> &DecodedImage {
        &self.image
    }
}

impl fmt::Debug for PinnedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedImage")
            .field("key", &self.exact)
            .field("generation", &self.generation)
            .finish()
    }
}

impl Drop for PinnedImage {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        let Some(entry) = state.lru.peek_mut(&self.exact) else {
            return;
        };
        // The entry may have been replaced since this pin was taken.
        if entry.generation != self.generation {
            return;
        }
        entry.pin_count = entry.pin_count.saturating_sub(1);

        let capacity = state.capacity;
        if state.total_bytes > capacity {
            state.evict_to(capacity, None);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
