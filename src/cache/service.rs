//! Lookup service for the display and decode layers.
//!
//! The ImageCacheService is the entry point the rest of an image pipeline
//! talks to. It orchestrates:
//! - Cache key resolution
//! - Exact and compatible memory cache lookups
//! - Decode planning
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       ImageCacheService                         │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                   get_or_decode()                       │    │
//! │  │  1. Resolve key       3. Plan decode geometry           │    │
//! │  │  2. Exact lookup      4. Decode (caller) & store        │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │           │                    │                    │           │
//! │           ▼                    ▼                    ▼           │
//! │    ┌───────────┐      ┌──────────────┐    ┌──────────────────┐  │
//! │    │  resolve  │      │ MemoryCache  │    │    DecodePlan    │  │
//! │    └───────────┘      └──────────────┘    └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;

use crate::config::CacheConfig;
use crate::error::MappingError;
use crate::key::{resolve, CacheKey};
use crate::request::ImageSpec;
use crate::resize::DecodePlan;

use super::memory::{CompatibleQuery, DecodedImage, MemoryCache, PinnedImage};

// =============================================================================
// Lookup Result
// =============================================================================

/// Which lookup produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupSource {
    /// Hit on the exact key
    Exact,
    /// Another variant of the same source image
    Compatible,
    Miss,
}

/// Result of [`ImageCacheService::lookup`].
#[derive(Debug, Clone)]
pub struct Lookup {
    pub key: CacheKey,
    pub image: Option<DecodedImage>,
    pub source: LookupSource,
}

impl Lookup {
    pub fn is_hit(&self) -> bool {
        self.image.is_some()
    }
}

/// Response from [`ImageCacheService::get_or_decode`].
#[derive(Debug, Clone)]
pub struct ImageResponse {
    pub key: CacheKey,

    pub image: DecodedImage,

    /// Whether this image was served from cache
    pub cache_hit: bool,
}

// =============================================================================
// Image Cache Service
// =============================================================================

/// Service tying key resolution, the memory cache and decode planning
/// together.
///
/// Configuration is passed in explicitly; several services may share one
/// [`MemoryCache`] through [`with_cache`](Self::with_cache).
#[derive(Debug, Clone)]
pub struct ImageCacheService {
    cache: MemoryCache,
    config: CacheConfig,
}

impl ImageCacheService {
    /// Create a service with its own cache sized from `config`.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: MemoryCache::with_capacity(config.capacity_bytes),
            config,
        }
    }

    /// Create a service over an existing cache.
    pub fn with_cache(cache: MemoryCache, config: CacheConfig) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &MemoryCache {
        &self.cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Resolve the key for `spec` and look it up.
    ///
    /// Tries the exact key first and, if compatible lookups are enabled,
    /// falls back to another cached variant of the same source image.
    pub fn lookup(&self, spec: &ImageSpec) -> Lookup {
        let key = resolve(spec);

        if let Some(image) = self.cache.get(key.exact()) {
            debug!(key = %key.short_fingerprint(), "Memory cache hit");
            return Lookup {
                key,
                image: Some(image),
                source: LookupSource::Exact,
            };
        }

        if self.config.compatible_lookup {
            if let Some(image) = self.cache.get_compatible(&CompatibleQuery::from_spec(spec)) {
                debug!(
                    key = %key.short_fingerprint(),
                    uri = key.uri_group(),
                    "Memory cache compatible hit"
                );
                return Lookup {
                    key,
                    image: Some(image),
                    source: LookupSource::Compatible,
                };
            }
        }

        Lookup {
            key,
            image: None,
            source: LookupSource::Miss,
        }
    }

    /// Store a decoded image under `key`.
    pub fn store(&self, key: &CacheKey, image: DecodedImage, size_bytes: u64) {
        self.cache.put(key, image, size_bytes);
    }

    /// Pin the image cached under `key` while it is displayed.
    pub fn acquire(&self, key: &CacheKey) -> Option<PinnedImage> {
        self.cache.acquire(key.exact())
    }

    /// Plan the decode of `spec` against a source of the given natural size.
    pub fn plan_decode(
        &self,
        spec: &ImageSpec,
        source_width: u32,
        source_height: u32,
    ) -> Result<DecodePlan, MappingError> {
        DecodePlan::new(spec, source_width, source_height, self.config.thumbnail_ratio)
    }

    /// Get an image from the cache, decoding and storing it on a miss.
    ///
    /// Only exact hits are served; compatible variants are a placeholder
    /// concern (see [`StateImage`](crate::state::StateImage)). Nothing is
    /// stored if planning or `decode` fails.
    ///
    /// # Errors
    ///
    /// Returns the planning error converted into `E`, or the error of
    /// `decode`.
    pub fn get_or_decode<F, E>(
        &self,
        spec: &ImageSpec,
        source_width: u32,
        source_height: u32,
        decode: F,
    ) -> Result<ImageResponse, E>
    where
        F: FnOnce(&DecodePlan) -> Result<DecodedImage, E>,
        E: From<MappingError>,
    {
        let key = resolve(spec);

        if let Some(image) = self.cache.get(key.exact()) {
            return Ok(ImageResponse {
                key,
                image,
                cache_hit: true,
            });
        }

        let plan = self.plan_decode(spec, source_width, source_height)?;
        let image = decode(&plan)?;

        let size = image.byte_size();
        self.cache.put(&key, image.clone(), size);

        Ok(ImageResponse {
            key,
            image,
            cache_hit: false,
        })
    }
}

impl Default for ImageCacheService {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
