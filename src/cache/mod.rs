//! Memory caching layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Display / Decode pipeline        │
//! └────────────────────┬────────────────────┘
//!                      │ lookup / store / get_or_decode
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           ImageCacheService             │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ MemoryCache  │  │   DecodePlan    │  │
//! │  │ (LRU, pins,  │  │ (region, sample │  │
//! │  │  compatible) │  │  size)          │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`MemoryCache`]: LRU cache for decoded images with size-based eviction
//! - [`CompatibleQuery`]: constraints for reusing another variant of a source
//! - [`PinnedImage`]: scoped pin keeping an in-use entry from eviction
//! - [`ImageCacheService`]: lookup/store entry point for the rest of the pipeline
//!
//! # Example
//!
//! ```
//! use pixcache::cache::{DecodedImage, ImageCacheService, LookupSource};
//! use pixcache::config::CacheConfig;
//! use pixcache::request::ImageSpec;
//!
//! let service = ImageCacheService::new(CacheConfig::default());
//! let spec = ImageSpec::new("https://example.com/a.jpg").unwrap();
//!
//! let lookup = service.lookup(&spec);
//! assert_eq!(lookup.source, LookupSource::Miss);
//!
//! service.store(&lookup.key, DecodedImage::new(1, 1, vec![0u8; 4]), 4);
//! assert_eq!(service.lookup(&spec).source, LookupSource::Exact);
//! ```

mod memory;
mod service;

pub use memory::{
    CacheStats, CompatibleQuery, DecodedImage, MemoryCache, PinnedImage,
    DEFAULT_MEMORY_CACHE_CAPACITY,
};
pub use service::{ImageCacheService, ImageResponse, Lookup, LookupSource};
