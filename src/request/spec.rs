//! Resolved request description and the policies that shape decoded output.
//!
//! An [`ImageSpec`] holds every parameter that changes the pixels a request
//! produces. It is built once (usually through
//! [`build_spec`](super::build_spec)) and never mutated afterwards; derived
//! requests are made with the consuming `with_*` methods.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ParseError, SpecError};

// =============================================================================
// Long Image Decider
// =============================================================================

/// Decides whether an image is "long" (panorama or scroll-shot).
///
/// An image is long when its longer side exceeds the shorter side by more
/// than `multiple` times.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct LongImageDecider {
    multiple: f32,
}

impl LongImageDecider {
    /// Default long-image multiple.
    pub const DEFAULT_MULTIPLE: f32 = 2.5;

    /// Create a decider with the given multiple.
    ///
    /// The multiple must be finite and greater than 1.
    pub fn new(multiple: f32) -> Result<Self, SpecError> {
        if !multiple.is_finite() || multiple <= 1.0 {
            return Err(SpecError::InvalidMultiple(multiple));
        }
        Ok(Self { multiple })
    }

    pub fn multiple(&self) -> f32 {
        self.multiple
    }

    /// Returns `true` if an image of the given size counts as long.
    pub fn is_long_image(&self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let longer = width.max(height) as f32;
        let shorter = width.min(height) as f32;
        longer / shorter > self.multiple
    }
}

impl Default for LongImageDecider {
    fn default() -> Self {
        Self {
            multiple: Self::DEFAULT_MULTIPLE,
        }
    }
}

// Multiples are validated finite, so bitwise comparison is a total equality.
impl PartialEq for LongImageDecider {
    fn eq(&self, other: &Self) -> bool {
        self.multiple.to_bits() == other.multiple.to_bits()
    }
}

impl Eq for LongImageDecider {}

impl Hash for LongImageDecider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.multiple.to_bits().hash(state);
    }
}

impl TryFrom<f32> for LongImageDecider {
    type Error = SpecError;

    fn try_from(multiple: f32) -> Result<Self, Self::Error> {
        Self::new(multiple)
    }
}

impl From<LongImageDecider> for f32 {
    fn from(decider: LongImageDecider) -> Self {
        decider.multiple
    }
}

fn parse_multiple(raw: Option<&str>) -> Result<LongImageDecider, ParseError> {
    match raw {
        None => Ok(LongImageDecider::default()),
        Some(raw) => raw
            .parse::<f32>()
            .ok()
            .and_then(|m| LongImageDecider::new(m).ok())
            .ok_or_else(|| ParseError::InvalidMultiple(raw.to_string())),
    }
}

// =============================================================================
// Precision
// =============================================================================

/// Concrete precision, after any long-image decision has been made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    /// Output must match the requested size exactly
    Exact,
    /// Output must match the requested aspect ratio, at most the source size
    SameAspectRatio,
    /// Output only needs fewer pixels than requested
    #[default]
    LessPixels,
}

/// How strictly decoded dimensions must match the requested size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecisionPolicy {
    Exact,
    #[default]
    LessPixels,
    SameAspectRatio,
    /// `SameAspectRatio` for long images, `LessPixels` otherwise
    LongImageClip(LongImageDecider),
}

impl PrecisionPolicy {
    /// Resolve against the natural size of the source image.
    pub fn resolve(&self, source_width: u32, source_height: u32) -> Precision {
        match self {
            PrecisionPolicy::Exact => Precision::Exact,
            PrecisionPolicy::LessPixels => Precision::LessPixels,
            PrecisionPolicy::SameAspectRatio => Precision::SameAspectRatio,
            PrecisionPolicy::LongImageClip(decider) => {
                if decider.is_long_image(source_width, source_height) {
                    Precision::SameAspectRatio
                } else {
                    Precision::LessPixels
                }
            }
        }
    }

    /// Strictness rank used by compatible lookups. Higher is stricter.
    ///
    /// `LongImageClip` keeps the aspect ratio only for long images, so it
    /// sits between `LessPixels` and `SameAspectRatio`.
    pub fn rank(&self) -> u8 {
        match self {
            PrecisionPolicy::LessPixels => 0,
            PrecisionPolicy::LongImageClip(_) => 1,
            PrecisionPolicy::SameAspectRatio => 2,
            PrecisionPolicy::Exact => 3,
        }
    }

    /// Returns `true` if cached output smaller than the request is acceptable.
    pub fn tolerates_smaller(&self) -> bool {
        matches!(
            self,
            PrecisionPolicy::LessPixels | PrecisionPolicy::SameAspectRatio
        )
    }
}

impl fmt::Display for PrecisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrecisionPolicy::Exact => f.write_str("Exact"),
            PrecisionPolicy::LessPixels => f.write_str("LessPixels"),
            PrecisionPolicy::SameAspectRatio => f.write_str("SameAspectRatio"),
            PrecisionPolicy::LongImageClip(d) => write!(f, "LongImageClip({})", d.multiple()),
        }
    }
}

impl FromStr for PrecisionPolicy {
    type Err = ParseError;

    /// Parses `exact`, `less-pixels`, `same-aspect-ratio` or
    /// `long-image-clip[:<multiple>]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let mut parts = lower.splitn(2, ':');
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (name, arg) {
            ("exact", None) => Ok(PrecisionPolicy::Exact),
            ("less-pixels", None) => Ok(PrecisionPolicy::LessPixels),
            ("same-aspect-ratio", None) => Ok(PrecisionPolicy::SameAspectRatio),
            ("long-image-clip", arg) => Ok(PrecisionPolicy::LongImageClip(parse_multiple(arg)?)),
            _ => Err(ParseError::UnknownPrecision(s.to_string())),
        }
    }
}

// =============================================================================
// Scale
// =============================================================================

/// Concrete alignment of the source crop inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scale {
    StartCrop,
    #[default]
    CenterCrop,
    EndCrop,
    /// Stretch the whole source, no cropping
    Fill,
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scale::StartCrop => "StartCrop",
            Scale::CenterCrop => "CenterCrop",
            Scale::EndCrop => "EndCrop",
            Scale::Fill => "Fill",
        })
    }
}

impl FromStr for Scale {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start-crop" => Ok(Scale::StartCrop),
            "center-crop" | "center" => Ok(Scale::CenterCrop),
            "end-crop" => Ok(Scale::EndCrop),
            "fill" => Ok(Scale::Fill),
            _ => Err(ParseError::UnknownScale(s.to_string())),
        }
    }
}

/// How the source rectangle is aligned relative to the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalePolicy {
    StartCrop,
    #[default]
    CenterCrop,
    EndCrop,
    Fill,
    /// `long` for long images, `normal` otherwise
    LongImageVariant {
        normal: Scale,
        long: Scale,
        decider: LongImageDecider,
    },
}

impl ScalePolicy {
    /// Resolve against the natural size of the source image.
    pub fn resolve(&self, source_width: u32, source_height: u32) -> Scale {
        match *self {
            ScalePolicy::StartCrop => Scale::StartCrop,
            ScalePolicy::CenterCrop => Scale::CenterCrop,
            ScalePolicy::EndCrop => Scale::EndCrop,
            ScalePolicy::Fill => Scale::Fill,
            ScalePolicy::LongImageVariant {
                normal,
                long,
                decider,
            } => {
                if decider.is_long_image(source_width, source_height) {
                    long
                } else {
                    normal
                }
            }
        }
    }
}

impl From<Scale> for ScalePolicy {
    fn from(scale: Scale) -> Self {
        match scale {
            Scale::StartCrop => ScalePolicy::StartCrop,
            Scale::CenterCrop => ScalePolicy::CenterCrop,
            Scale::EndCrop => ScalePolicy::EndCrop,
            Scale::Fill => ScalePolicy::Fill,
        }
    }
}

impl fmt::Display for ScalePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalePolicy::StartCrop => write!(f, "{}", Scale::StartCrop),
            ScalePolicy::CenterCrop => write!(f, "{}", Scale::CenterCrop),
            ScalePolicy::EndCrop => write!(f, "{}", Scale::EndCrop),
            ScalePolicy::Fill => write!(f, "{}", Scale::Fill),
            ScalePolicy::LongImageVariant {
                normal,
                long,
                decider,
            } => write!(
                f,
                "LongImageVariant({},{},{})",
                normal,
                long,
                decider.multiple()
            ),
        }
    }
}

impl FromStr for ScalePolicy {
    type Err = ParseError;

    /// Parses a concrete scale name or `long-image:<normal>:<long>[:<multiple>]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("long-image:") {
            let parts: Vec<&str> = rest.split(':').collect();
            if parts.len() < 2 || parts.len() > 3 {
                return Err(ParseError::UnknownScale(s.to_string()));
            }
            return Ok(ScalePolicy::LongImageVariant {
                normal: parts[0].parse()?,
                long: parts[1].parse()?,
                decider: parse_multiple(parts.get(2).copied())?,
            });
        }
        trimmed.parse::<Scale>().map(ScalePolicy::from)
    }
}

// =============================================================================
// Transformation Id
// =============================================================================

/// Identifier of a post-processing step, e.g. `CircleCrop`.
///
/// The identifier must encode every parameter of the transformation, since it
/// is the only thing the cache key sees.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformationId(String);

impl TransformationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransformationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TransformationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TransformationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// =============================================================================
// Image Spec
// =============================================================================

/// Normalize a uri so that spellings of the same source compare equal.
///
/// Absolute URLs are canonicalized by the `url` crate (scheme and host case,
/// default ports, dot segments); anything else is only trimmed.
pub fn normalize_uri(raw: &str) -> Result<String, SpecError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SpecError::EmptyUri);
    }
    Ok(match Url::parse(trimmed) {
        Ok(url) => url.into(),
        Err(_) => trimmed.to_string(),
    })
}

/// Fully-resolved parameters that affect pixel output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageSpec {
    uri: String,
    width: Option<u32>,
    height: Option<u32>,
    precision: PrecisionPolicy,
    scale: ScalePolicy,
    transformations: Vec<TransformationId>,
    parameters: BTreeMap<String, String>,
}

impl ImageSpec {
    /// Create a spec for `uri` with default size, precision and scale.
    pub fn new(uri: impl AsRef<str>) -> Result<Self, SpecError> {
        Ok(Self {
            uri: normalize_uri(uri.as_ref())?,
            width: None,
            height: None,
            precision: PrecisionPolicy::default(),
            scale: ScalePolicy::default(),
            transformations: Vec::new(),
            parameters: BTreeMap::new(),
        })
    }

    /// Set the requested size. Either axis may be left unconstrained.
    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Result<Self, SpecError> {
        if width == Some(0) {
            return Err(SpecError::InvalidSize { axis: "width" });
        }
        if height == Some(0) {
            return Err(SpecError::InvalidSize { axis: "height" });
        }
        self.width = width;
        self.height = height;
        Ok(self)
    }

    pub fn with_precision(mut self, precision: PrecisionPolicy) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_scale(mut self, scale: ScalePolicy) -> Self {
        self.scale = scale;
        self
    }

    /// Replace the transformation list. Order is kept as given.
    pub fn with_transformations<I, T>(mut self, transformations: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TransformationId>,
    {
        self.transformations = transformations.into_iter().map(Into::into).collect();
        self
    }

    /// Add a cache-affecting parameter (e.g. a bitmap config).
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn width(&self) -> Option<u32> {
        self.width
    }

    pub fn height(&self) -> Option<u32> {
        self.height
    }

    pub fn precision(&self) -> PrecisionPolicy {
        self.precision
    }

    pub fn scale(&self) -> ScalePolicy {
        self.scale
    }

    pub fn transformations(&self) -> &[TransformationId] {
        &self.transformations
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }
}

// =============================================================================
// Tests
// =============================================================================
