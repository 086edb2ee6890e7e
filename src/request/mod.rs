//! Request description layer.
//!
//! Turns layered options into the immutable [`ImageSpec`] consumed by the key
//! resolver, the memory cache and the decode planner.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   request    │ ▶ │  view layer  │ ▶ │   defaults   │   ImageOptions
//! └──────┬───────┘   └──────────────┘   └──────────────┘
//!        │ merge (most specific layer wins)
//!        ▼
//! ┌──────────────┐
//! │  ImageSpec   │   uri, size, precision, scale, transformations, parameters
//! └──────────────┘
//! ```

mod options;
mod spec;

pub use options::{build_spec, ImageOptions};
pub use spec::{
    normalize_uri, ImageSpec, LongImageDecider, Precision, PrecisionPolicy, Scale, ScalePolicy,
    TransformationId,
};
