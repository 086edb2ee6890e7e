//! Layered request options and the merge that turns them into an [`ImageSpec`].
//!
//! Options come in layers (per-request overrides, view-level options, global
//! defaults). Each layer is a flat struct of optionals; merging coalesces field
//! by field with the more specific layer winning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SpecError;

use super::spec::{ImageSpec, PrecisionPolicy, ScalePolicy, TransformationId};

/// One layer of request options. Unset fields defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImageOptions {
    pub uri: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub precision: Option<PrecisionPolicy>,
    pub scale: Option<ScalePolicy>,
    pub transformations: Option<Vec<TransformationId>>,
    pub parameters: Option<BTreeMap<String, String>>,
}

impl ImageOptions {
    /// Create an empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn precision(mut self, precision: PrecisionPolicy) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: ScalePolicy) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Append a transformation to this layer.
    pub fn transformation(mut self, id: impl Into<TransformationId>) -> Self {
        self.transformations
            .get_or_insert_with(Vec::new)
            .push(id.into());
        self
    }

    /// Set a cache-affecting parameter on this layer.
    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge this layer over `lower`.
    ///
    /// Scalars: this layer's value if set, else `lower`'s. Lists: this
    /// layer's items followed by `lower`'s, keeping the first occurrence of
    /// duplicates. Maps: union, this layer's entries winning.
    pub fn merge(&self, lower: &ImageOptions) -> ImageOptions {
        ImageOptions {
            uri: self.uri.clone().or_else(|| lower.uri.clone()),
            width: self.width.or(lower.width),
            height: self.height.or(lower.height),
            precision: self.precision.or(lower.precision),
            scale: self.scale.or(lower.scale),
            transformations: merge_lists(
                self.transformations.as_deref(),
                lower.transformations.as_deref(),
            ),
            parameters: merge_maps(self.parameters.as_ref(), lower.parameters.as_ref()),
        }
    }

    /// Convert a fully merged layer into a spec.
    pub fn into_spec(self) -> Result<ImageSpec, SpecError> {
        let uri = self.uri.ok_or(SpecError::MissingUri)?;
        let mut spec = ImageSpec::new(uri)?
            .with_size(self.width, self.height)?
            .with_precision(self.precision.unwrap_or_default())
            .with_scale(self.scale.unwrap_or_default())
            .with_transformations(self.transformations.unwrap_or_default());
        for (name, value) in self.parameters.unwrap_or_default() {
            spec = spec.with_parameter(name, value);
        }
        Ok(spec)
    }
}

fn merge_lists<T: Clone + PartialEq>(upper: Option<&[T]>, lower: Option<&[T]>) -> Option<Vec<T>> {
    if upper.is_none() && lower.is_none() {
        return None;
    }
    let mut merged: Vec<T> = Vec::new();
    for item in upper.into_iter().chain(lower).flatten() {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    Some(merged)
}

fn merge_maps(
    upper: Option<&BTreeMap<String, String>>,
    lower: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match (upper, lower) {
        (None, None) => None,
        (Some(map), None) | (None, Some(map)) => Some(map.clone()),
        (Some(upper), Some(lower)) => {
            let mut merged = lower.clone();
            merged.extend(upper.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(merged)
        }
    }
}

/// Build the resolved spec for a request layered over default options.
pub fn build_spec(request: &ImageOptions, defaults: &ImageOptions) -> Result<ImageSpec, SpecError> {
    request.merge(defaults).into_spec()
}

// =============================================================================
// Tests
// =============================================================================
