//! Scripted cache sessions.
//!
//! A replay script is a JSON document listing store/lookup operations. Each
//! operation names its request as [`ImageOptions`] layered over the script's
//! defaults, which makes it easy to reproduce eviction and compatible-lookup
//! behavior outside of an application:
//!
//! ```json
//! {
//!   "defaults": { "uri": "https://example.com/a.jpg" },
//!   "operations": [
//!     { "op": "store", "request": { "width": 200, "height": 200 }, "width": 200, "height": 200 },
//!     { "op": "lookup", "request": { "width": 100, "height": 100 } }
//!   ]
//! }
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::{CacheStats, DecodedImage, ImageCacheService, LookupSource};
use crate::error::ReplayError;
use crate::key::resolve;
use crate::request::{build_spec, ImageOptions};

/// A replay script.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayScript {
    /// Options applied under every operation's request
    #[serde(default)]
    pub defaults: ImageOptions,
    pub operations: Vec<ReplayOp>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", deny_unknown_fields)]
pub enum ReplayOp {
    /// Store a decoded image of the given size for the request.
    Store {
        #[serde(default)]
        request: ImageOptions,
        width: u32,
        height: u32,
        /// Accounted size; defaults to `width * height * 4`
        bytes: Option<u64>,
    },
    Lookup {
        #[serde(default)]
        request: ImageOptions,
    },
    Remove {
        #[serde(default)]
        request: ImageOptions,
    },
    Clear,
}

/// What one operation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayOutcome {
    Store {
        key: String,
        size_bytes: u64,
    },
    Lookup {
        key: String,
        source: LookupSource,
        width: Option<u32>,
        height: Option<u32>,
    },
    Remove {
        key: String,
        removed: bool,
    },
    Clear,
}

/// Result of a replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    pub outcomes: Vec<ReplayOutcome>,
    pub entries: usize,
    pub size_bytes: u64,
    pub stats: CacheStats,
}

fn rgba_size(width: u32, height: u32) -> Result<u64, ReplayError> {
    u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or(ReplayError::ImageTooLarge { width, height })
}

/// Run `script` against `service`.
///
/// Stops at the first request that cannot be turned into a spec, or at a
/// store whose byte size cannot be computed.
pub fn run(
    service: &ImageCacheService,
    script: &ReplayScript,
) -> Result<ReplayReport, ReplayError> {
    let mut outcomes = Vec::with_capacity(script.operations.len());

    for op in &script.operations {
        let outcome = match op {
            ReplayOp::Store {
                request,
                width,
                height,
                bytes,
            } => {
                let key = resolve(&build_spec(request, &script.defaults)?);
                let size_bytes = match bytes {
                    Some(bytes) => *bytes,
                    None => rgba_size(*width, *height)?,
                };
                service.store(&key, DecodedImage::new(*width, *height, Bytes::new()), size_bytes);
                ReplayOutcome::Store {
                    key: key.exact().to_string(),
                    size_bytes,
                }
            }
            ReplayOp::Lookup { request } => {
                let lookup = service.lookup(&build_spec(request, &script.defaults)?);
                ReplayOutcome::Lookup {
                    key: lookup.key.exact().to_string(),
                    source: lookup.source,
                    width: lookup.image.as_ref().map(DecodedImage::width),
                    height: lookup.image.as_ref().map(DecodedImage::height),
                }
            }
            ReplayOp::Remove { request } => {
                let key = resolve(&build_spec(request, &script.defaults)?);
                ReplayOutcome::Remove {
                    removed: service.cache().remove(key.exact()),
                    key: key.exact().to_string(),
                }
            }
            ReplayOp::Clear => {
                service.cache().clear();
                ReplayOutcome::Clear
            }
        };
        debug!(?outcome, "Replayed operation");
        outcomes.push(outcome);
    }

    let cache = service.cache();
    Ok(ReplayReport {
        outcomes,
        entries: cache.len(),
        size_bytes: cache.size(),
        stats: cache.stats(),
    })
}

// =============================================================================
// Tests
// =============================================================================
