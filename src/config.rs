//! Configuration management for pixcache.
//!
//! This module provides:
//! - [`CacheConfig`], the library-side configuration passed to
//!   [`ImageCacheService`](crate::cache::ImageCacheService)
//! - The command-line interface of the `pixcache` binary via clap, with
//!   environment variable fallbacks using the `PIXCACHE_` prefix
//!
//! # Environment Variables
//!
//! - `PIXCACHE_CAPACITY` - Memory cache capacity, e.g. `64MB` (default: 100MB)
//! - `PIXCACHE_COMPATIBLE_LOOKUP` - Enable compatible lookups (default: true)
//! - `PIXCACHE_THUMBNAIL_RATIO` - Aspect mismatch enabling region decode (default: 1.5)
//! - `PIXCACHE_DEFAULTS` - JSON file with default request options

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::cache::DEFAULT_MEMORY_CACHE_CAPACITY;
use crate::error::ParseError;
use crate::request::{ImageOptions, PrecisionPolicy, ScalePolicy, TransformationId};
use crate::resize::DEFAULT_THUMBNAIL_RATIO;

// =============================================================================
// Default Values
// =============================================================================

/// Default capacity as accepted on the command line.
pub const DEFAULT_CAPACITY_ARG: &str = "100MB";

// =============================================================================
// Library Configuration
// =============================================================================

/// Configuration for an [`ImageCacheService`](crate::cache::ImageCacheService).
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Memory cache capacity in bytes.
    /// Default: 100 MB.
    pub capacity_bytes: u64,

    /// Fall back to other cached variants of the same source on a miss.
    /// Default: true.
    pub compatible_lookup: bool,

    /// Target/source aspect mismatch above which region decoding is used.
    /// Default: 1.5.
    pub thumbnail_ratio: f32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_MEMORY_CACHE_CAPACITY,
            compatible_lookup: true,
            thumbnail_ratio: DEFAULT_THUMBNAIL_RATIO,
        }
    }
}

impl CacheConfig {
    /// Set the capacity in bytes.
    #[must_use]
    pub fn with_capacity_bytes(mut self, bytes: u64) -> Self {
        self.capacity_bytes = bytes;
        self
    }

    /// Set the capacity in megabytes.
    #[must_use]
    pub fn with_capacity_mb(mut self, mb: u64) -> Self {
        self.capacity_bytes = mb * 1024 * 1024;
        self
    }

    /// Enable or disable compatible lookups.
    #[must_use]
    pub fn with_compatible_lookup(mut self, enabled: bool) -> Self {
        self.compatible_lookup = enabled;
        self
    }

    /// Set the thumbnail-mode aspect ratio threshold.
    #[must_use]
    pub fn with_thumbnail_ratio(mut self, ratio: f32) -> Self {
        self.thumbnail_ratio = ratio;
        self
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity_bytes == 0 {
            return Err("capacity must be greater than 0".to_string());
        }
        if !self.thumbnail_ratio.is_finite() || self.thumbnail_ratio < 1.0 {
            return Err("thumbnail_ratio must be a finite number of at least 1.0".to_string());
        }
        Ok(())
    }
}

/// Parse a byte size such as `1048576`, `512KB`, `64MB` or `1GB`.
///
/// Suffixes are binary multiples and case-insensitive.
pub fn parse_byte_size(raw: &str) -> Result<u64, ParseError> {
    let trimmed = raw.trim();
    let upper = trimmed.to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ParseError::InvalidByteSize(raw.to_string()))
}

fn parse_parameter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// pixcache - cache keys, thumbnail lookups and decode geometry for images.
#[derive(Parser, Debug, Clone)]
#[command(name = "pixcache")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Resolve the cache key of a request.
    Key(KeyConfig),

    /// Plan the decode geometry of a request against a source image.
    Mapping(MappingConfig),

    /// Run a JSON script of store/lookup operations through a memory cache.
    Replay(ReplayConfig),
}

/// Memory cache options shared by the subcommands.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    /// Memory cache capacity (e.g. 64MB).
    #[arg(long, default_value = DEFAULT_CAPACITY_ARG, env = "PIXCACHE_CAPACITY", value_parser = parse_byte_size)]
    pub capacity: u64,

    /// Fall back to other cached variants of the same source on a miss.
    #[arg(long, default_value_t = true, env = "PIXCACHE_COMPATIBLE_LOOKUP", action = ArgAction::Set)]
    pub compatible_lookup: bool,

    /// Target/source aspect mismatch above which region decoding is used.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_RATIO, env = "PIXCACHE_THUMBNAIL_RATIO")]
    pub thumbnail_ratio: f32,
}

impl CacheArgs {
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_capacity_bytes(self.capacity)
            .with_compatible_lookup(self.compatible_lookup)
            .with_thumbnail_ratio(self.thumbnail_ratio)
    }
}

/// Request options given on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct SpecArgs {
    /// Source image uri.
    pub uri: Option<String>,

    /// Requested width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Requested height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Precision: exact, less-pixels, same-aspect-ratio, long-image-clip[:multiple].
    #[arg(long)]
    pub precision: Option<PrecisionPolicy>,

    /// Scale: center-crop, start-crop, end-crop, fill, long-image:<normal>:<long>[:multiple].
    #[arg(long)]
    pub scale: Option<ScalePolicy>,

    /// Transformation id, in application order (repeatable).
    #[arg(long = "transform")]
    pub transformations: Vec<String>,

    /// Cache-affecting parameter as NAME=VALUE (repeatable).
    #[arg(long = "param", value_parser = parse_parameter)]
    pub parameters: Vec<(String, String)>,

    /// JSON file with default request options merged under these flags.
    #[arg(long, env = "PIXCACHE_DEFAULTS")]
    pub defaults: Option<PathBuf>,
}

impl SpecArgs {
    /// The request-level options layer described by the flags.
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            uri: self.uri.clone(),
            width: self.width,
            height: self.height,
            precision: self.precision,
            scale: self.scale,
            transformations: if self.transformations.is_empty() {
                None
            } else {
                Some(
                    self.transformations
                        .iter()
                        .map(|id| TransformationId::new(id.as_str()))
                        .collect(),
                )
            },
            parameters: if self.parameters.is_empty() {
                None
            } else {
                Some(self.parameters.iter().cloned().collect::<BTreeMap<_, _>>())
            },
        }
    }

    /// Load the defaults layer, empty if no file was given.
    pub fn load_defaults(&self) -> Result<ImageOptions, String> {
        let Some(path) = &self.defaults else {
            return Ok(ImageOptions::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read defaults file {}: {}", path.display(), e))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("invalid defaults file {}: {}", path.display(), e))
    }
}

#[derive(Args, Debug, Clone)]
pub struct KeyConfig {
    #[command(flatten)]
    pub spec: SpecArgs,
}

#[derive(Args, Debug, Clone)]
pub struct MappingConfig {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Natural width of the source image.
    #[arg(long)]
    pub source_width: Option<u32>,

    /// Natural height of the source image.
    #[arg(long)]
    pub source_height: Option<u32>,

    /// Read the natural size from this image file instead.
    #[arg(long, conflicts_with_all = ["source_width", "source_height"])]
    pub source_file: Option<PathBuf>,

    #[command(flatten)]
    pub cache: CacheArgs,
}

impl MappingConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_file.is_none()
            && (self.source_width.is_none() || self.source_height.is_none())
        {
            return Err(
                "Source size required: set --source-width and --source-height, or --source-file"
                    .to_string(),
            );
        }
        self.cache.cache_config().validate()
    }

    /// Load the defaults layer for the mapping request.
    ///
    /// The uri only matters for keys. When neither the flags nor the
    /// defaults file name one, the source file name (or `-`) stands in.
    pub fn defaults(&self) -> Result<ImageOptions, String> {
        Ok(self.with_fallback_uri(self.spec.load_defaults()?))
    }

    fn with_fallback_uri(&self, mut defaults: ImageOptions) -> ImageOptions {
        if defaults.uri.is_none() {
            defaults.uri = Some(
                self.source_file
                    .as_ref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        defaults
    }
}

#[derive(Args, Debug, Clone)]
pub struct ReplayConfig {
    /// JSON script with a list of operations.
    pub script: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.cache_config().validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
