//! Compatible lookup integration tests.
//!
//! Tests verify:
//! - Transformations must match exactly, in both directions
//! - Size and precision constraints on the cached variant
//! - The most recently used compatible variant is chosen
//! - Placeholders resolve through the same lookups

use pixcache::{
    resolve, CacheConfig, ImageCacheService, LongImageDecider, LookupSource, PrecisionPolicy,
    ResolvedState, StateCondition, StateImage,
};

use super::test_utils::{image, spec, URI};

fn store(service: &ImageCacheService, width: u32, height: u32, precision: PrecisionPolicy) {
    let s = spec(URI, width, height, precision);
    service.store(&resolve(&s), image(width, height), u64::from(width * height * 4));
}

// =============================================================================
// Transformations
// =============================================================================

#[test]
fn test_transformed_entry_does_not_serve_plain_request() {
    let service = ImageCacheService::default();
    let circle = spec(URI, 200, 200, PrecisionPolicy::LessPixels).with_transformations(["CircleCrop"]);
    service.store(&resolve(&circle), image(200, 200), 160_000);

    let plain = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    assert_eq!(service.lookup(&plain).source, LookupSource::Miss);
}

#[test]
fn test_plain_entry_does_not_serve_transformed_request() {
    let service = ImageCacheService::default();
    store(&service, 200, 200, PrecisionPolicy::LessPixels);

    let circle = spec(URI, 100, 100, PrecisionPolicy::LessPixels).with_transformations(["CircleCrop"]);
    assert_eq!(service.lookup(&circle).source, LookupSource::Miss);
}

#[test]
fn test_matching_transformations_are_compatible() {
    let service = ImageCacheService::default();
    let cached = spec(URI, 200, 200, PrecisionPolicy::LessPixels)
        .with_transformations(["CircleCrop", "Blur(4)"]);
    service.store(&resolve(&cached), image(200, 200), 160_000);

    let same = spec(URI, 100, 100, PrecisionPolicy::LessPixels)
        .with_transformations(["CircleCrop", "Blur(4)"]);
    assert_eq!(service.lookup(&same).source, LookupSource::Compatible);

    let reordered = spec(URI, 100, 100, PrecisionPolicy::LessPixels)
        .with_transformations(["Blur(4)", "CircleCrop"]);
    assert_eq!(service.lookup(&reordered).source, LookupSource::Miss);
}

// =============================================================================
// Size and Precision
// =============================================================================

#[test]
fn test_smaller_entry_only_for_tolerant_precisions() {
    let service = ImageCacheService::default();
    store(&service, 50, 50, PrecisionPolicy::Exact);

    let less = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    assert_eq!(service.lookup(&less).source, LookupSource::Compatible);

    let same_aspect = spec(URI, 100, 100, PrecisionPolicy::SameAspectRatio);
    assert_eq!(service.lookup(&same_aspect).source, LookupSource::Compatible);

    let exact = spec(URI, 100, 100, PrecisionPolicy::Exact);
    assert_eq!(service.lookup(&exact).source, LookupSource::Miss);
}

#[test]
fn test_cached_precision_must_be_at_least_as_strict() {
    let service = ImageCacheService::default();
    store(&service, 400, 400, PrecisionPolicy::SameAspectRatio);

    let exact = spec(URI, 100, 100, PrecisionPolicy::Exact);
    assert_eq!(service.lookup(&exact).source, LookupSource::Miss);

    let clip = spec(
        URI,
        100,
        100,
        PrecisionPolicy::LongImageClip(LongImageDecider::default()),
    );
    assert_eq!(service.lookup(&clip).source, LookupSource::Compatible);

    let same_aspect = spec(URI, 100, 100, PrecisionPolicy::SameAspectRatio);
    assert_eq!(service.lookup(&same_aspect).source, LookupSource::Compatible);
}

#[test]
fn test_long_image_clip_entry_does_not_serve_same_aspect_request() {
    let service = ImageCacheService::default();
    // A regular image decoded under LongImageClip loses its aspect ratio
    let clip = spec(
        URI,
        400,
        400,
        PrecisionPolicy::LongImageClip(LongImageDecider::default()),
    );
    service.store(&resolve(&clip), image(400, 300), 400 * 300 * 4);

    let same_aspect = spec(URI, 100, 100, PrecisionPolicy::SameAspectRatio);
    assert_eq!(service.lookup(&same_aspect).source, LookupSource::Miss);

    let other_clip = spec(
        URI,
        100,
        100,
        PrecisionPolicy::LongImageClip(LongImageDecider::default()),
    );
    assert_eq!(service.lookup(&other_clip).source, LookupSource::Compatible);

    let less = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    assert_eq!(service.lookup(&less).source, LookupSource::Compatible);
}

#[test]
fn test_less_pixels_accepts_any_precision() {
    let service = ImageCacheService::default();
    store(&service, 30, 30, PrecisionPolicy::LessPixels);

    let less = spec(URI, 300, 300, PrecisionPolicy::LessPixels);
    let lookup = service.lookup(&less);
    assert_eq!(lookup.source, LookupSource::Compatible);
    assert_eq!(lookup.image.map(|i| i.width()), Some(30));
}

#[test]
fn test_other_source_is_never_compatible() {
    let service = ImageCacheService::default();
    store(&service, 400, 400, PrecisionPolicy::Exact);

    let other = spec("https://example.com/photos/b.jpg", 10, 10, PrecisionPolicy::LessPixels);
    assert_eq!(service.lookup(&other).source, LookupSource::Miss);
}

// =============================================================================
// Selection
// =============================================================================

#[test]
fn test_most_recently_used_variant_wins() {
    let service = ImageCacheService::default();
    store(&service, 200, 200, PrecisionPolicy::Exact);
    store(&service, 300, 300, PrecisionPolicy::Exact);

    let request = spec(URI, 100, 100, PrecisionPolicy::Exact);
    let first = service.lookup(&request).image.map(|i| i.width());
    assert_eq!(first, Some(300));

    // Reading the 200px variant makes it the most recent
    assert!(service.cache().get(resolve(&spec(URI, 200, 200, PrecisionPolicy::Exact)).exact()).is_some());
    let second = service.lookup(&request).image.map(|i| i.width());
    assert_eq!(second, Some(200));
}

#[test]
fn test_compatible_hit_refreshes_recency() {
    let service = ImageCacheService::new(CacheConfig::default().with_capacity_bytes(2 * 160_000));
    store(&service, 200, 200, PrecisionPolicy::LessPixels);
    let old = resolve(&spec(URI, 200, 200, PrecisionPolicy::LessPixels));

    let other = spec("https://example.com/photos/b.jpg", 200, 200, PrecisionPolicy::LessPixels);
    service.store(&resolve(&other), image(200, 200), 160_000);

    // Compatible hit on the older entry moves it ahead of b.jpg
    let request = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    assert_eq!(service.lookup(&request).source, LookupSource::Compatible);

    let third = spec("https://example.com/photos/c.jpg", 200, 200, PrecisionPolicy::LessPixels);
    service.store(&resolve(&third), image(200, 200), 160_000);

    assert!(service.cache().exist(old.exact()));
    assert!(!service.cache().exist(resolve(&other).exact()));
    assert_eq!(service.cache().stats().compatible_hits, 1);
}

// =============================================================================
// Placeholders
// =============================================================================

#[test]
fn test_thumbnail_placeholder_while_loading() {
    let service = ImageCacheService::default();
    store(&service, 64, 64, PrecisionPolicy::LessPixels);

    let request = spec(URI, 1024, 1024, PrecisionPolicy::Exact);
    assert_eq!(service.lookup(&request).source, LookupSource::Miss);

    let placeholder = StateImage::Condition(vec![
        (
            StateCondition::Always,
            StateImage::ThumbnailMemoryCache { uri: None },
        ),
        (StateCondition::Always, StateImage::Color(0xFFCCCCCC)),
    ]);
    match placeholder.resolve(&service, &request, None) {
        Some(ResolvedState::Cached(thumbnail)) => assert_eq!(thumbnail.width(), 64),
        other => panic!("expected cached thumbnail, got {:?}", other),
    }

    service.cache().clear();
    assert_eq!(
        placeholder.resolve(&service, &request, None),
        Some(ResolvedState::Color(0xFFCCCCCC))
    );
}
