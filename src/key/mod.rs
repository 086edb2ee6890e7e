//! Cache key resolution.
//!
//! - [`resolve`]: derives the exact key and the uri-group key for a spec
//! - [`CacheKey`]: the derived key, carrying the spec it came from
//!
//! # Example
//!
//! ```
//! use pixcache::key::resolve;
//! use pixcache::request::{ImageSpec, PrecisionPolicy};
//!
//! let spec = ImageSpec::new("https://example.com/cat.jpg")
//!     .unwrap()
//!     .with_size(Some(100), Some(100))
//!     .unwrap()
//!     .with_precision(PrecisionPolicy::Exact);
//!
//! let key = resolve(&spec);
//! assert_eq!(key.uri_group(), "https://example.com/cat.jpg");
//! assert!(key.exact().ends_with("?_size=100x100&_precision=Exact"));
//! ```

mod resolver;

pub use resolver::{resolve, CacheKey};
