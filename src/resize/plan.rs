//! Decode planning for a resolved request.

use serde::Serialize;

use crate::error::MappingError;
use crate::request::{ImageSpec, Precision, Scale, ScalePolicy};

use super::mapping::{
    calculate_sample_size, can_use_thumbnail_mode, compute_mapping, Rect, ResizeMapping,
};

/// Concrete decode geometry for one request against one source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecodePlan {
    /// Precision after the long-image decision
    pub precision: Precision,

    /// Scale after the long-image decision
    pub scale: Scale,

    pub mapping: ResizeMapping,

    /// Decode only `mapping.source_rect` with a region decoder
    pub thumbnail_mode: bool,
}

impl DecodePlan {
    /// Plan the decode of a `source_width` x `source_height` image.
    ///
    /// Unset target axes default to the source dimension. `LessPixels` decodes
    /// the whole source at a pixel-budget sample size; the cropping precisions
    /// go through [`compute_mapping`].
    pub fn new(
        spec: &ImageSpec,
        source_width: u32,
        source_height: u32,
        thumbnail_ratio: f32,
    ) -> Result<Self, MappingError> {
        let target_width = spec.width().unwrap_or(source_width);
        let target_height = spec.height().unwrap_or(source_height);
        if source_width == 0 || source_height == 0 {
            return Err(MappingError::InvalidDimension {
                source_width,
                source_height,
                target_width,
                target_height,
            });
        }

        let precision = spec.precision().resolve(source_width, source_height);
        let scale = spec.scale().resolve(source_width, source_height);

        let mapping = match precision {
            Precision::LessPixels => {
                let sample_size =
                    calculate_sample_size(source_width, source_height, target_width, target_height);
                ResizeMapping {
                    source_rect: Rect::from_size(source_width, source_height),
                    dest_rect: Rect::from_size(
                        source_width.div_ceil(sample_size),
                        source_height.div_ceil(sample_size),
                    ),
                    sample_size,
                }
            }
            Precision::SameAspectRatio | Precision::Exact => compute_mapping(
                source_width,
                source_height,
                target_width,
                target_height,
                &ScalePolicy::from(scale),
                precision == Precision::Exact,
            )?,
        };

        let crops = mapping.source_rect != Rect::from_size(source_width, source_height);
        let thumbnail_mode = precision != Precision::LessPixels
            && crops
            && can_use_thumbnail_mode(
                source_width,
                source_height,
                target_width,
                target_height,
                thumbnail_ratio,
            );

        Ok(Self {
            precision,
            scale,
            mapping,
            thumbnail_mode,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
