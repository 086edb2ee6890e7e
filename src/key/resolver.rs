//! Cache key derivation.
//!
//! The exact key is the percent-encoded uri followed by a query-style list of
//! the non-default fields in a fixed order:
//!
//! ```text
//! https%3A%2F%2Fcdn%2Fa.jpg?_size=100x100&_precision=Exact&_transformations=CircleCrop
//! ```
//!
//! Every free-form component (uri, transformation ids, parameter names and
//! values) is percent-encoded, so the delimiters `?`, `&`, `=`, `,` and `:`
//! never appear inside a field and the serialization is injective.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use urlencoding::encode;

use crate::request::{ImageSpec, PrecisionPolicy, ScalePolicy};

/// Cache key derived from an [`ImageSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey {
    /// Canonical serialization of the spec, used for exact hits
    exact: String,

    /// Normalized source uri, shared by every variant of the same image
    uri_group: String,

    #[serde(skip)]
    spec: Arc<ImageSpec>,
}

impl CacheKey {
    pub fn exact(&self) -> &str {
        &self.exact
    }

    pub fn uri_group(&self) -> &str {
        &self.uri_group
    }

    /// The spec this key was derived from.
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Lowercase hex SHA-256 of the exact key.
    ///
    /// Stable across processes, suitable for logs and external indexes.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.exact.as_bytes()))
    }

    /// First 12 hex characters of [`fingerprint`](Self::fingerprint).
    pub fn short_fingerprint(&self) -> String {
        let mut fingerprint = self.fingerprint();
        fingerprint.truncate(12);
        fingerprint
    }

    /// Pair an arbitrary exact key with `spec`, bypassing the resolver.
    #[cfg(test)]
    pub(crate) fn forged(exact: &str, spec: &ImageSpec) -> Self {
        Self {
            exact: exact.to_string(),
            uri_group: spec.uri().to_string(),
            spec: Arc::new(spec.clone()),
        }
    }
}

/// Resolve the cache key for a spec.
///
/// Pure and deterministic: equal specs always produce byte-identical keys.
pub fn resolve(spec: &ImageSpec) -> CacheKey {
    CacheKey {
        exact: exact_key(spec),
        uri_group: spec.uri().to_string(),
        spec: Arc::new(spec.clone()),
    }
}

fn exact_key(spec: &ImageSpec) -> String {
    let mut key = encode(spec.uri()).into_owned();
    let mut separator = '?';
    let mut push = |key: &mut String, name: &str, value: &str| {
        key.push(separator);
        key.push_str(name);
        key.push('=');
        key.push_str(value);
        separator = '&';
    };

    if spec.width().is_some() || spec.height().is_some() {
        let mut size = String::new();
        if let Some(width) = spec.width() {
            let _ = write!(size, "{}", width);
        }
        size.push('x');
        if let Some(height) = spec.height() {
            let _ = write!(size, "{}", height);
        }
        push(&mut key, "_size", &size);
    }

    if spec.precision() != PrecisionPolicy::default() {
        push(&mut key, "_precision", &spec.precision().to_string());
    }

    if spec.scale() != ScalePolicy::default() {
        push(&mut key, "_scale", &spec.scale().to_string());
    }

    if !spec.transformations().is_empty() {
        let ids: Vec<String> = spec
            .transformations()
            .iter()
            .map(|id| encode(id.as_str()).into_owned())
            .collect();
        push(&mut key, "_transformations", &ids.join(","));
    }

    if !spec.parameters().is_empty() {
        let pairs: Vec<String> = spec
            .parameters()
            .iter()
            .map(|(name, value)| format!("{}:{}", encode(name), encode(value)))
            .collect();
        push(&mut key, "_parameters", &pairs.join(","));
    }

    key
}

// =============================================================================
// Tests
// =============================================================================
