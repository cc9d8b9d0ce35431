//! Integration tests for keyring attachment

use std::sync::Arc;

use laserkit_core::{ConfigError, Point, Polygon, PolygonSet};
use laserkit_designer::config::validate_ring;
use laserkit_designer::{
    attach_ring, ring_center, AttachmentSpec, BooleanEngine, BuildConfig, BuildParams,
    OverlayBackend, RingPosition,
};
use proptest::prelude::*;

fn engine() -> BooleanEngine {
    BooleanEngine::new(Arc::new(OverlayBackend::new()))
}

fn plate() -> PolygonSet {
    PolygonSet::new(vec![Polygon::rectangle(0.0, 0.0, 20.0, 10.0).unwrap()])
}

#[test]
fn test_ring_fuses_with_hole() {
    let spec = AttachmentSpec::ring(4.0, 2.0, RingPosition::Top);
    let out = attach_ring(&engine(), &plate(), &spec, 0.05);
    assert!(!out.is_degraded());

    let center = ring_center(&plate().bounds().unwrap(), &spec);
    assert_eq!(center, Point::new(10.0, -3.0));

    let set = &out.polygons;
    assert_eq!(set.len(), 2);
    assert!(set.contains_point(&Point::new(10.0, -6.0)));
    assert!(!set.contains_point(&center));
    assert!(set.contains_point(&Point::new(10.0, 0.5)));
    // Bridge between the ring and the plate
    assert!(set.contains_point(&Point::new(10.0, -0.5)));
}

#[test]
fn test_ring_on_each_side_extends_bounds() {
    for (position, check) in [
        (RingPosition::Left, 0usize),
        (RingPosition::Right, 1),
        (RingPosition::Top, 2),
    ] {
        let spec = AttachmentSpec::ring(4.0, 2.0, position);
        let bb = attach_ring(&engine(), &plate(), &spec, 0.05)
            .polygons
            .bounds()
            .unwrap();
        match check {
            0 => assert!((bb.min_x - -7.0).abs() < 0.1),
            1 => assert!((bb.max_x - 27.0).abs() < 0.1),
            _ => assert!((bb.min_y - -7.0).abs() < 0.1),
        }
    }
}

#[test]
fn test_ring_on_empty_outline_is_noop() {
    let spec = AttachmentSpec::ring(4.0, 2.0, RingPosition::Top);
    let out = attach_ring(&engine(), &PolygonSet::empty(), &spec, 0.1);
    assert!(out.polygons.is_empty());
}

#[test]
fn test_ring_json_defaults() {
    let spec: AttachmentSpec =
        serde_json::from_str(r#"{"outerRadiusMm": 5.0, "innerRadiusMm": 2.5}"#).unwrap();
    assert_eq!(spec.position, RingPosition::Top);
    assert_eq!(spec.overlap_mm, 1.0);
}

#[test]
fn test_non_finite_ring_is_rejected() {
    let params = BuildParams {
        attachment: Some(AttachmentSpec::ring(f64::INFINITY, 2.0, RingPosition::Top)),
        ..Default::default()
    };
    assert!(matches!(
        BuildConfig::validate(&params),
        Err(ConfigError::NonFinite { .. })
    ));
}

proptest! {
    #[test]
    fn prop_hole_always_leaves_min_wall(
        outer in -10.0f64..40.0,
        inner in -10.0f64..40.0,
        overlap in -5.0f64..10.0,
        min_wall in 0.5f64..6.0,
    ) {
        let mut spec = AttachmentSpec::ring(outer, inner, RingPosition::Right);
        spec.overlap_mm = overlap;
        let clamped = validate_ring(&spec, min_wall).unwrap();
        prop_assert!(clamped.inner_radius_mm > 0.0);
        prop_assert!(clamped.inner_radius_mm <= clamped.outer_radius_mm - min_wall + 1e-9);
        prop_assert!(clamped.overlap_mm >= 0.0);
        prop_assert!(clamped.overlap_mm <= clamped.outer_radius_mm - clamped.inner_radius_mm + 1e-9);
    }
}
