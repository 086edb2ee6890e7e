//! # pixcache
//!
//! Memory-cache keys, a thumbnail-aware memory cache and decode geometry for
//! image loading pipelines.
//!
//! An image request resolves to an [`ImageSpec`]: the source uri plus every
//! option that affects the decoded pixels. The spec yields a stable
//! [`CacheKey`], under which the decoded image is kept in a [`MemoryCache`].
//! On a miss, [`DecodePlan`] works out which region of the source to decode
//! and at what sample size.
//!
//! ## Features
//!
//! - **Deterministic keys**: equal specs give equal keys, differing pixel
//!   options give differing keys
//! - **Compatible lookup**: reuse a larger or stricter cached variant of the
//!   same source when the exact key misses
//! - **Pinning**: images on screen are never evicted
//! - **Decode geometry**: crop rectangles, region decoding and power-of-two
//!   sample sizes
//!
//! ## Architecture
//!
//! - [`request`] - Request options, merging and the resolved spec
//! - [`key`] - Cache key derivation
//! - [`cache`] - Memory cache and lookup service
//! - [`resize`] - Resize mapping and decode planning
//! - [`state`] - Placeholder and error images
//! - [`replay`] - Scripted cache sessions
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```
//! use pixcache::{CacheConfig, DecodedImage, ImageCacheService, ImageSpec, PrecisionPolicy};
//!
//! let service = ImageCacheService::new(CacheConfig::default().with_capacity_mb(64));
//! let spec = ImageSpec::new("https://example.com/photo.jpg")
//!     .unwrap()
//!     .with_size(Some(100), Some(100))
//!     .unwrap()
//!     .with_precision(PrecisionPolicy::Exact);
//!
//! let response = service
//!     .get_or_decode(&spec, 1000, 500, |plan| -> Result<_, pixcache::MappingError> {
//!         let (w, h) = (plan.mapping.dest_rect.width(), plan.mapping.dest_rect.height());
//!         Ok(DecodedImage::new(w, h, vec![0u8; (w * h * 4) as usize]))
//!     })
//!     .unwrap();
//! assert!(!response.cache_hit);
//! assert_eq!(service.lookup(&spec).image, Some(response.image));
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod key;
pub mod replay;
pub mod request;
pub mod resize;
pub mod state;

// Re-export commonly used types
pub use cache::{
    CacheStats, CompatibleQuery, DecodedImage, ImageCacheService, ImageResponse, Lookup,
    LookupSource, MemoryCache, PinnedImage,
};
pub use config::{CacheConfig, Cli, Command};
pub use error::{MappingError, ParseError, ReplayError, SpecError};
pub use key::{resolve, CacheKey};
pub use replay::{ReplayReport, ReplayScript};
pub use request::{
    build_spec, ImageOptions, ImageSpec, LongImageDecider, Precision, PrecisionPolicy, Scale,
    ScalePolicy, TransformationId,
};
pub use resize::{
    calculate_sample_size, can_use_thumbnail_mode, compute_mapping, DecodePlan, Rect,
    ResizeMapping,
};
pub use state::{LoadFailure, ResolvedState, StateCondition, StateImage};
