//! Integration tests for the outline pipeline

use std::sync::Arc;

use laserkit_core::{PathTransform, Point, Rect};
use laserkit_designer::{
    build_with_backend, recenter, render_layers, AttachmentSpec, BuildConfig, BuildParams,
    BuildStatus, GeometryBackend, GeometryCache, OffsetStrategy, OutlineRequest, PathContribution,
    RingPosition,
};

fn build(contributions: &[PathContribution], params: BuildParams) -> laserkit_designer::OutlineResult {
    let backend = GeometryBackend::native(OffsetStrategy::default());
    let cache = Arc::new(GeometryCache::new(64));
    let config = BuildConfig::validate(&params).unwrap();
    build_with_backend(&backend, &cache, contributions, &config)
}

fn square_10() -> PathContribution {
    PathContribution::untransformed("M0 0 H10 V10 H0 Z")
}

#[test]
fn test_outline_sits_at_margin() {
    let result = build(&[square_10()], BuildParams::default());
    assert!(result.status.is_success());
    assert!(result.diagnostics.is_empty());
    assert!((result.bounds.x - 1.0).abs() < 1e-9);
    assert!((result.bounds.y - 1.0).abs() < 1e-9);
    assert!((result.bounds.width - 16.0).abs() <= 0.2);
}

#[test]
fn test_outline_contains_silhouette() {
    let result = build(&[square_10()], BuildParams::default());
    for polygon in &result.silhouette {
        for p in polygon.points() {
            assert!(result.outline.contains_point(p));
        }
    }
}

#[test]
fn test_recenter_is_idempotent() {
    let result = build(&[square_10()], BuildParams::default());
    assert_eq!(recenter(&result.outline, 1.0), result.outline);
}

#[test]
fn test_fallback_is_deterministic() {
    let a = build(&[], BuildParams::default());
    let b = build(&[], BuildParams::default());
    assert_eq!(a, b);
    assert_eq!(a.bounds, Rect::new(1.0, 1.0, 6.0, 6.0));
    assert!(matches!(a.status, BuildStatus::Fallback { .. }));
    assert!(a.cut_path.contains('A'));
}

#[test]
fn test_unparseable_path_falls_back_with_diagnostics() {
    let result = build(
        &[PathContribution::untransformed("hello world")],
        BuildParams::default(),
    );
    assert!(!result.status.is_success());
    assert!(!result.diagnostics.is_empty());
}

#[test]
fn test_contribution_placement() {
    let placed = PathContribution::new("M0 0 H10 V10 H0 Z", PathTransform::new(2.0, 2.0, 100.0, 50.0));
    let result = build(&[placed], BuildParams::default());
    assert!((result.bounds.width - 26.0).abs() <= 0.2);
    let sb = result.silhouette.bounds().unwrap();
    assert!((sb.width() - 20.0).abs() < 1e-9);
    assert!((sb.min_x - 4.0).abs() <= 0.2);
}

#[test]
fn test_overlapping_contributions_fuse() {
    let a = square_10();
    let b = PathContribution::new("M0 0 H10 V10 H0 Z", PathTransform::new(1.0, 1.0, 5.0, 5.0));
    let result = build(&[a, b], BuildParams::default());
    assert_eq!(result.outline.len(), 1);
    assert!((result.silhouette.area() - 175.0).abs() < 1e-6);
}

#[test]
fn test_ring_extends_outline_upward() {
    let plain = build(&[square_10()], BuildParams::default());
    let params = BuildParams {
        attachment: Some(AttachmentSpec::ring(4.0, 2.0, RingPosition::Top)),
        ..Default::default()
    };
    let ringed = build(&[square_10()], params);
    assert!(ringed.status.is_success());
    assert!(ringed.bounds.height > plain.bounds.height + 5.0);
    // Recentering keeps the top edge at the margin
    assert!((ringed.bounds.y - 1.0).abs() < 1e-9);
    assert!(ringed.outline.len() >= 2);
}

#[test]
fn test_precision_controls_path_text() {
    let params = BuildParams {
        precision: Some(1),
        ..Default::default()
    };
    let result = build(&[square_10()], params);
    let decimals = result
        .cut_path
        .split(|c: char| c == ' ' || c.is_ascii_alphabetic())
        .filter_map(|tok| tok.split_once('.'))
        .map(|(_, frac)| frac.len())
        .max()
        .unwrap_or(0);
    assert!(decimals <= 1);
}

#[test]
fn test_request_from_json() {
    let json = r#"{
        "contributions": [
            { "path": "M0 0 H10 V10 H0 Z", "transform": { "scaleX": 1, "scaleY": 1, "translateX": 0, "translateY": 0 } },
            { "path": "M20 0 h5 v5 h-5 z" }
        ],
        "params": { "offsetMm": 2, "marginMm": 0.5 }
    }"#;
    let request: OutlineRequest = serde_json::from_str(json).unwrap();
    assert_eq!(request.contributions.len(), 2);
    assert_eq!(request.params.offset_mm, 2.0);
    assert_eq!(request.params.flatten_tolerance_mm, 0.25);

    let result = build(&request.contributions, request.params.clone());
    assert!(result.status.is_success());
    assert!((result.bounds.x - 0.5).abs() < 1e-9);
}

#[test]
fn test_result_serializes_and_renders() {
    let result = build(&[square_10()], BuildParams::default());
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"]["state"], "success");
    assert!(json["cutPath"].as_str().unwrap().starts_with('M'));
    assert!(json.get("outline").is_none());

    let svg = render_layers(&result);
    assert!(svg.contains(r#"id="CUT""#));
    assert!(svg.contains(r#"id="ENGRAVE""#));
    assert!(svg.ends_with("</svg>\n"));
    assert!(!result.outline.contains_point(&Point::new(0.0, 0.0)));
}
