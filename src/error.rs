use thiserror::Error;

/// Errors raised while computing decode geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// A source or target dimension was zero
    #[error(
        "Invalid dimension: source {source_width}x{source_height}, target {target_width}x{target_height}"
    )]
    InvalidDimension {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    },
}

/// Errors raised while assembling an [`ImageSpec`](crate::request::ImageSpec).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    /// Neither the request nor the defaults carried a uri
    #[error("Missing uri: the request has no uri and the defaults provide none")]
    MissingUri,

    /// The uri was empty after trimming
    #[error("Empty uri")]
    EmptyUri,

    /// Requested width or height of zero
    #[error("Invalid size: {axis} must be greater than 0")]
    InvalidSize { axis: &'static str },

    /// Long-image multiple that is not a finite number above 1
    #[error("Invalid long image multiple: {0} (must be finite and greater than 1)")]
    InvalidMultiple(f32),
}

/// Errors raised while running a replay script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    /// An operation's request could not be turned into a spec
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// A store op without `bytes` whose RGBA size does not fit in a u64
    #[error("Image too large: {width}x{height} overflows its byte size")]
    ImageTooLarge { width: u32, height: u32 },
}

/// Errors raised when parsing policy or size strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Unknown precision name
    #[error("Unknown precision '{0}' (expected exact, less-pixels, same-aspect-ratio or long-image-clip[:multiple])")]
    UnknownPrecision(String),

    /// Unknown scale name
    #[error("Unknown scale '{0}' (expected center-crop, start-crop, end-crop, fill or long-image:<normal>:<long>[:multiple])")]
    UnknownScale(String),

    /// Malformed byte size such as "12XB"
    #[error("Invalid byte size '{0}' (expected a number with an optional KB, MB or GB suffix)")]
    InvalidByteSize(String),

    /// Malformed long-image multiple
    #[error("Invalid multiple '{0}'")]
    InvalidMultiple(String),
}
