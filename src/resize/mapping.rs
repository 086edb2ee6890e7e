//! Resize mapping and sub-sampling math.
//!
//! Given the natural size of a source image and a target box, these functions
//! decide which part of the source to decode, how large the decoded result
//! should be, and which power-of-two sub-sampling factor the decoder can use
//! without dropping below the destination size.

use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::request::{Scale, ScalePolicy};

/// Default aspect-ratio mismatch above which region decoding pays off.
pub const DEFAULT_THUMBNAIL_RATIO: f32 = 1.5;

// =============================================================================
// Geometry
// =============================================================================

/// Axis-aligned rectangle in pixel coordinates (right/bottom exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Rect {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle at the origin with the given size.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Where to read from the source, how big the output is, and the sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeMapping {
    /// Region of the source image to decode
    pub source_rect: Rect,

    /// Output rectangle the region is scaled into
    pub dest_rect: Rect,

    /// Power-of-two sub-sampling factor for the decoder (always >= 1)
    pub sample_size: u32,
}

impl ResizeMapping {
    fn identity(width: u32, height: u32) -> Self {
        Self {
            source_rect: Rect::from_size(width, height),
            dest_rect: Rect::from_size(width, height),
            sample_size: 1,
        }
    }
}

// =============================================================================
// Mapping
// =============================================================================

/// Compute the decode geometry for a source image and a target box.
///
/// With `exactly_same` the destination is the target verbatim. Otherwise the
/// target is shrunk, keeping its aspect ratio, until it fits inside the
/// source; a source smaller than the target is never upscaled.
///
/// # Errors
///
/// Returns [`MappingError::InvalidDimension`] if any dimension is zero.
pub fn compute_mapping(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    scale: &ScalePolicy,
    exactly_same: bool,
) -> Result<ResizeMapping, MappingError> {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return Err(MappingError::InvalidDimension {
            source_width,
            source_height,
            target_width,
            target_height,
        });
    }

    if source_width == target_width && source_height == target_height {
        return Ok(ResizeMapping::identity(source_width, source_height));
    }

    let (dest_width, dest_height) = if exactly_same {
        (target_width, target_height)
    } else {
        limited_size(source_width, source_height, target_width, target_height)
    };

    let source_rect = match scale.resolve(source_width, source_height) {
        Scale::Fill => Rect::from_size(source_width, source_height),
        concrete => {
            let (crop_width, crop_height) =
                crop_size(source_width, source_height, dest_width, dest_height);
            let (left, top) = match concrete {
                Scale::StartCrop => (0, 0),
                Scale::EndCrop => (source_width - crop_width, source_height - crop_height),
                _ => (
                    (source_width - crop_width) / 2,
                    (source_height - crop_height) / 2,
                ),
            };
            Rect::new(left, top, left + crop_width, top + crop_height)
        }
    };

    let sample_size = region_sample_size(
        source_rect.width(),
        source_rect.height(),
        dest_width,
        dest_height,
    );

    Ok(ResizeMapping {
        source_rect,
        dest_rect: Rect::from_size(dest_width, dest_height),
        sample_size,
    })
}

/// Shrink the target to fit inside the source while keeping its aspect ratio.
///
/// The axis with the larger overflow decides the factor; on a tie the axis
/// whose size is closer to the source wins.
fn limited_size(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> (u32, u32) {
    if target_width <= source_width && target_height <= source_height {
        return (target_width, target_height);
    }

    let width_ratio = source_width as f64 / target_width as f64;
    let height_ratio = source_height as f64 / target_height as f64;
    let fit_width = if width_ratio != height_ratio {
        width_ratio < height_ratio
    } else {
        source_width.abs_diff(target_width) <= source_height.abs_diff(target_height)
    };

    if fit_width {
        let height = (target_height as f64 * width_ratio).floor() as u32;
        (source_width, height.clamp(1, source_height))
    } else {
        let width = (target_width as f64 * height_ratio).floor() as u32;
        (width.clamp(1, source_width), source_height)
    }
}

/// Largest rectangle with the destination's aspect ratio inside the source.
fn crop_size(
    source_width: u32,
    source_height: u32,
    dest_width: u32,
    dest_height: u32,
) -> (u32, u32) {
    let width_scale = source_width as f64 / dest_width as f64;
    let height_scale = source_height as f64 / dest_height as f64;
    let scale = width_scale.min(height_scale);
    let width = (dest_width as f64 * scale).round() as u32;
    let height = (dest_height as f64 * scale).round() as u32;
    (width.clamp(1, source_width), height.clamp(1, source_height))
}

/// Largest power of two keeping the sampled region at least as large as the
/// destination on both axes.
fn region_sample_size(region_width: u32, region_height: u32, dest_width: u32, dest_height: u32) -> u32 {
    let limit = region_width.max(region_height);
    let mut sample_size: u32 = 1;
    while let Some(next) = sample_size.checked_mul(2) {
        if next > limit
            || region_width.div_ceil(next) < dest_width
            || region_height.div_ceil(next) < dest_height
        {
            break;
        }
        sample_size = next;
    }
    sample_size
}

// =============================================================================
// Sample Size and Thumbnail Mode
// =============================================================================

/// Sub-sampling factor for a "fewer pixels than the target" decode.
///
/// Returns the smallest power of two for which the sampled image has no more
/// pixels than the target box. Always at least 1.
pub fn calculate_sample_size(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> u32 {
    let target_pixels = target_width.max(1) as u64 * target_height.max(1) as u64;
    let mut sample_size: u32 = 1;
    loop {
        let sampled = source_width.div_ceil(sample_size) as u64
            * source_height.div_ceil(sample_size) as u64;
        if sampled <= target_pixels {
            return sample_size;
        }
        match sample_size.checked_mul(2) {
            Some(next) => sample_size = next,
            None => return sample_size,
        }
    }
}

/// Returns `true` if region-decoding a crop beats decoding the full image.
///
/// The target must fit inside the source on at least one axis, and the target
/// and source aspect ratios must differ by more than `threshold` times.
pub fn can_use_thumbnail_mode(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
    threshold: f32,
) -> bool {
    if source_width == 0 || source_height == 0 || target_width == 0 || target_height == 0 {
        return false;
    }
    let fits = target_width <= source_width || target_height <= source_height;
    let target_aspect = target_width as f64 / target_height as f64;
    let source_aspect = source_width as f64 / source_height as f64;
    let mismatch = target_aspect.max(source_aspect) / target_aspect.min(source_aspect);
    fits && mismatch > threshold as f64
}

// =============================================================================
// Tests
// =============================================================================
