//! Shared helpers for the integration tests.

use pixcache::{resolve, CacheKey, DecodedImage, ImageSpec, PrecisionPolicy};

pub const URI: &str = "https://example.com/photos/a.jpg";

/// Spec for `uri` with the given size and precision.
pub fn spec(uri: &str, width: u32, height: u32, precision: PrecisionPolicy) -> ImageSpec {
    ImageSpec::new(uri)
        .unwrap()
        .with_size(Some(width), Some(height))
        .unwrap()
        .with_precision(precision)
}

/// Key of [`URI`] at the given size with `LessPixels` precision.
pub fn key(width: u32, height: u32) -> CacheKey {
    resolve(&spec(URI, width, height, PrecisionPolicy::LessPixels))
}

/// Zero-filled RGBA image.
pub fn image(width: u32, height: u32) -> DecodedImage {
    DecodedImage::new(width, height, vec![0u8; (width * height * 4) as usize])
}
