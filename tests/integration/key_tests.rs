//! Cache key integration tests.
//!
//! Tests verify:
//! - Distinct pixel options give distinct keys
//! - Equivalent requests built from different option layers share a key
//! - Uri spellings of the same source share a uri group

use std::collections::HashSet;

use pixcache::{
    build_spec, resolve, ImageOptions, ImageSpec, LongImageDecider, PrecisionPolicy, Scale,
    ScalePolicy, TransformationId,
};

use super::test_utils::{spec, URI};

// =============================================================================
// Distinct Keys
// =============================================================================

#[test]
fn test_three_variants_have_distinct_keys() {
    let less_pixels = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    let exact = spec(URI, 100, 100, PrecisionPolicy::Exact);
    let circle = spec(URI, 100, 100, PrecisionPolicy::LessPixels).with_transformations(["CircleCrop"]);

    let keys: HashSet<String> = [&less_pixels, &exact, &circle]
        .into_iter()
        .map(|s| resolve(s).exact().to_string())
        .collect();
    assert_eq!(keys.len(), 3);

    // All three belong to the same source image
    let groups: HashSet<String> = [&less_pixels, &exact, &circle]
        .into_iter()
        .map(|s| resolve(s).uri_group().to_string())
        .collect();
    assert_eq!(groups.len(), 1);
}

#[test]
fn test_every_option_changes_the_key() {
    let base = spec(URI, 100, 100, PrecisionPolicy::LessPixels);
    let variants = [
        spec(URI, 101, 100, PrecisionPolicy::LessPixels),
        spec(URI, 100, 101, PrecisionPolicy::LessPixels),
        spec(URI, 100, 100, PrecisionPolicy::SameAspectRatio),
        spec(
            URI,
            100,
            100,
            PrecisionPolicy::LongImageClip(LongImageDecider::default()),
        ),
        base.clone().with_scale(ScalePolicy::Fill),
        base.clone().with_scale(ScalePolicy::LongImageVariant {
            normal: Scale::CenterCrop,
            long: Scale::StartCrop,
            decider: LongImageDecider::default(),
        }),
        base.clone().with_transformations(["Blur(4)"]),
        base.clone().with_parameter("bitmap_config", "RGB_565"),
        spec("https://example.com/photos/b.jpg", 100, 100, PrecisionPolicy::LessPixels),
    ];

    let base_key = resolve(&base);
    let mut seen = HashSet::from([base_key.exact().to_string()]);
    for variant in &variants {
        let key = resolve(variant);
        assert!(
            seen.insert(key.exact().to_string()),
            "duplicate key {}",
            key.exact()
        );
    }
}

#[test]
fn test_long_image_multiple_is_part_of_the_key() {
    let a = spec(
        URI,
        100,
        100,
        PrecisionPolicy::LongImageClip(LongImageDecider::new(2.5).unwrap()),
    );
    let b = spec(
        URI,
        100,
        100,
        PrecisionPolicy::LongImageClip(LongImageDecider::new(3.0).unwrap()),
    );
    assert_ne!(resolve(&a).exact(), resolve(&b).exact());
}

#[test]
fn test_transformation_order_matters() {
    let ab = spec(URI, 10, 10, PrecisionPolicy::Exact).with_transformations(["A", "B"]);
    let ba = spec(URI, 10, 10, PrecisionPolicy::Exact).with_transformations(["B", "A"]);
    assert_ne!(resolve(&ab), resolve(&ba));
}

#[test]
fn test_separator_characters_do_not_collide() {
    // A transformation id containing the list separator must not read as two ids.
    let joined = spec(URI, 10, 10, PrecisionPolicy::Exact).with_transformations(["A,B"]);
    let split = spec(URI, 10, 10, PrecisionPolicy::Exact).with_transformations(["A", "B"]);
    assert_ne!(resolve(&joined).exact(), resolve(&split).exact());

    let a = ImageSpec::new("a.jpg?_size=1x1").unwrap();
    let b = ImageSpec::new("a.jpg")
        .unwrap()
        .with_size(Some(1), Some(1))
        .unwrap();
    assert_ne!(resolve(&a).exact(), resolve(&b).exact());
}

// =============================================================================
// Equivalent Requests
// =============================================================================

#[test]
fn test_layered_options_resolve_to_same_key() {
    let defaults = ImageOptions::new()
        .uri(URI)
        .precision(PrecisionPolicy::Exact)
        .parameter("bitmap_config", "RGB_565");
    let request = ImageOptions::new().size(100, 100).parameter("quality", "high");

    let layered = build_spec(&request, &defaults).unwrap();
    let direct = spec(URI, 100, 100, PrecisionPolicy::Exact)
        .with_parameter("quality", "high")
        .with_parameter("bitmap_config", "RGB_565");

    assert_eq!(layered, direct);
    assert_eq!(resolve(&layered), resolve(&direct));
    assert_eq!(resolve(&layered).fingerprint(), resolve(&direct).fingerprint());
}

#[test]
fn test_request_layer_wins() {
    let defaults = ImageOptions::new().uri(URI).precision(PrecisionPolicy::Exact);
    let request = ImageOptions::new().precision(PrecisionPolicy::SameAspectRatio);

    let spec = build_spec(&request, &defaults).unwrap();
    assert_eq!(spec.precision(), PrecisionPolicy::SameAspectRatio);
}

#[test]
fn test_options_from_json_defaults() {
    let defaults: ImageOptions = serde_json::from_str(
        r#"{
            "uri": "https://example.com/photos/a.jpg",
            "transformations": ["CircleCrop"],
            "parameters": { "bitmap_config": "RGB_565" }
        }"#,
    )
    .unwrap();
    let request = ImageOptions::new().size(64, 64);

    let spec = build_spec(&request, &defaults).unwrap();
    assert_eq!(spec.transformations(), &[TransformationId::new("CircleCrop")]);
    assert_eq!(
        resolve(&spec).exact(),
        "https%3A%2F%2Fexample.com%2Fphotos%2Fa.jpg?_size=64x64&_transformations=CircleCrop&_parameters=bitmap_config:RGB_565"
    );
}

#[test]
fn test_uri_spellings_share_a_group() {
    let canonical = resolve(&ImageSpec::new("https://example.com/photos/a.jpg").unwrap());
    let spelled = resolve(&ImageSpec::new("  HTTPS://EXAMPLE.com:443/photos/./a.jpg ").unwrap());

    assert_eq!(canonical.uri_group(), spelled.uri_group());
    assert_eq!(canonical, spelled);
}

#[test]
fn test_fingerprint_format() {
    let key = resolve(&spec(URI, 100, 100, PrecisionPolicy::Exact));
    let fingerprint = key.fingerprint();

    assert_eq!(fingerprint.len(), 64);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(fingerprint.starts_with(&key.short_fingerprint()));
}
