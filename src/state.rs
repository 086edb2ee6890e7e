//! Placeholder and error images.
//!
//! A [`StateImage`] describes what to show while a request is loading or
//! after it failed. Most variants are static descriptions handed back to the
//! display layer; the cache-backed variants are looked up in the memory cache
//! of an [`ImageCacheService`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CompatibleQuery, DecodedImage, ImageCacheService};
use crate::error::SpecError;
use crate::request::{normalize_uri, ImageSpec, PrecisionPolicy};

/// Why a request could not be served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailure {
    /// The request had no usable uri.
    UriEmpty,
    /// Any other failure, with a description.
    Other(String),
}

impl From<&SpecError> for LoadFailure {
    fn from(err: &SpecError) -> Self {
        match err {
            SpecError::MissingUri | SpecError::EmptyUri => LoadFailure::UriEmpty,
            other => LoadFailure::Other(other.to_string()),
        }
    }
}

/// Condition selecting a branch of [`StateImage::Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateCondition {
    Always,
    /// The request failed because its uri was empty.
    UriEmpty,
    /// The request failed for any reason.
    Failed,
}

impl StateCondition {
    fn matches(&self, failure: Option<&LoadFailure>) -> bool {
        match self {
            StateCondition::Always => true,
            StateCondition::UriEmpty => failure == Some(&LoadFailure::UriEmpty),
            StateCondition::Failed => failure.is_some(),
        }
    }
}

/// Description of a placeholder or error image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateImage {
    /// Solid ARGB color.
    Color(u32),
    /// Named drawable resource.
    Drawable(String),
    /// Icon centered on an optional background color.
    Icon { icon: String, background: Option<u32> },
    /// The image cached under an exact key.
    MemoryCache { key: String },
    /// Any cached variant of the request's source image (or of `uri`).
    ThumbnailMemoryCache { uri: Option<String> },
    /// First branch whose condition holds and which resolves.
    Condition(Vec<(StateCondition, StateImage)>),
    /// Error image, with a dedicated variant for empty uris.
    Error {
        default: Box<StateImage>,
        uri_empty: Option<Box<StateImage>>,
    },
}

/// What a [`StateImage`] resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedState {
    Color(u32),
    Drawable(String),
    Icon { icon: String, background: Option<u32> },
    Cached(DecodedImage),
}

impl StateImage {
    /// Resolve against the cache of `service` for the request `spec`.
    ///
    /// Returns `None` when a cache-backed variant finds nothing, or when no
    /// branch of a condition applies.
    pub fn resolve(
        &self,
        service: &ImageCacheService,
        spec: &ImageSpec,
        failure: Option<&LoadFailure>,
    ) -> Option<ResolvedState> {
        match self {
            StateImage::Color(color) => Some(ResolvedState::Color(*color)),
            StateImage::Drawable(name) => Some(ResolvedState::Drawable(name.clone())),
            StateImage::Icon { icon, background } => Some(ResolvedState::Icon {
                icon: icon.clone(),
                background: *background,
            }),
            StateImage::MemoryCache { key } => {
                service.cache().get(key).map(ResolvedState::Cached)
            }
            StateImage::ThumbnailMemoryCache { uri } => {
                let uri_group = match uri {
                    Some(raw) => match normalize_uri(raw) {
                        Ok(uri) => uri,
                        Err(err) => {
                            debug!(error = %err, "Ignoring thumbnail placeholder uri");
                            return None;
                        }
                    },
                    None => spec.uri().to_string(),
                };
                let query = CompatibleQuery {
                    uri_group,
                    width: None,
                    height: None,
                    precision: PrecisionPolicy::LessPixels,
                    transformations: spec.transformations().to_vec(),
                };
                service
                    .cache()
                    .get_compatible(&query)
                    .map(ResolvedState::Cached)
            }
            StateImage::Condition(branches) => branches
                .iter()
                .filter(|(condition, _)| condition.matches(failure))
                .find_map(|(_, image)| image.resolve(service, spec, failure)),
            StateImage::Error { default, uri_empty } => {
                let chosen = match (failure, uri_empty) {
                    (Some(LoadFailure::UriEmpty), Some(image)) => image,
                    _ => default,
                };
                chosen.resolve(service, spec, failure)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
