//! Decode geometry.
//!
//! - [`compute_mapping`]: source crop, destination size and sample size
//! - [`calculate_sample_size`]: pixel-budget sample size for `LessPixels`
//! - [`can_use_thumbnail_mode`]: whether region decoding is worth it
//! - [`DecodePlan`]: all of the above applied to an [`ImageSpec`](crate::request::ImageSpec)
//!
//! # Example
//!
//! ```
//! use pixcache::request::ScalePolicy;
//! use pixcache::resize::{compute_mapping, Rect};
//!
//! let mapping = compute_mapping(1000, 500, 100, 100, &ScalePolicy::CenterCrop, false).unwrap();
//! assert_eq!(mapping.source_rect, Rect::new(250, 0, 750, 500));
//! assert_eq!(mapping.dest_rect, Rect::from_size(100, 100));
//! ```

mod mapping;
mod plan;

pub use mapping::{
    calculate_sample_size, can_use_thumbnail_mode, compute_mapping, Rect, ResizeMapping,
    DEFAULT_THUMBNAIL_RATIO,
};
pub use plan::DecodePlan;
