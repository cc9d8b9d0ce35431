//! Integration tests for the boolean engine

use std::sync::Arc;

use laserkit_core::{Point, Polygon, PolygonSet};
use laserkit_designer::{BooleanEngine, GeometryCache, OverlayBackend};
use proptest::prelude::*;

fn engine() -> BooleanEngine {
    BooleanEngine::new(Arc::new(OverlayBackend::new()))
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> PolygonSet {
    PolygonSet::new(vec![Polygon::rectangle(x, y, w, h).unwrap()])
}

fn assert_same_region(a: &PolygonSet, b: &PolygonSet) {
    assert!((a.area() - b.area()).abs() < 1e-6, "{} vs {}", a.area(), b.area());
    let (ba, bb) = (a.bounds().unwrap(), b.bounds().unwrap());
    assert!((ba.min_x - bb.min_x).abs() < 1e-6);
    assert!((ba.min_y - bb.min_y).abs() < 1e-6);
    assert!((ba.max_x - bb.max_x).abs() < 1e-6);
    assert!((ba.max_y - bb.max_y).abs() < 1e-6);
}

#[test]
fn test_union_area_of_overlapping_squares() {
    let a = rect(0.0, 0.0, 10.0, 10.0);
    let b = rect(5.0, 5.0, 10.0, 10.0);
    let union = engine().union(&[&a, &b]).polygons;
    assert!((union.area() - 175.0).abs() < 1e-6);
    assert_eq!(union.len(), 1);
}

#[test]
fn test_union_is_associative_and_commutative() {
    let e = engine();
    let a = rect(0.0, 0.0, 10.0, 10.0);
    let b = rect(5.0, 5.0, 10.0, 10.0);
    let c = rect(12.0, -3.0, 4.0, 20.0);

    let ab = e.union(&[&a, &b]).polygons;
    let bc = e.union(&[&b, &c]).polygons;
    let left = e.union(&[&ab, &c]).polygons;
    let right = e.union(&[&a, &bc]).polygons;
    let flat = e.union(&[&c, &a, &b]).polygons;

    assert_same_region(&left, &right);
    assert_same_region(&left, &flat);
}

#[test]
fn test_self_overlapping_operand_under_nonzero() {
    // Two same-direction rings in one set overlap: non-zero fills both once
    let mut set = rect(0.0, 0.0, 10.0, 10.0);
    set.push(Polygon::rectangle(5.0, 0.0, 10.0, 10.0).unwrap());
    let normalized = engine().normalize(&set).polygons;
    assert!((normalized.area() - 150.0).abs() < 1e-6);
}

#[test]
fn test_difference_removes_overlap() {
    let a = rect(0.0, 0.0, 10.0, 10.0);
    let b = rect(5.0, 0.0, 10.0, 10.0);
    let diff = engine().difference(&a, &b).polygons;
    assert!((diff.area() - 50.0).abs() < 1e-6);
    assert!(diff.contains_point(&Point::new(2.0, 5.0)));
    assert!(!diff.contains_point(&Point::new(7.0, 5.0)));
}

#[test]
fn test_difference_can_be_empty() {
    let a = rect(2.0, 2.0, 2.0, 2.0);
    let b = rect(0.0, 0.0, 10.0, 10.0);
    let out = engine().difference(&a, &b);
    assert!(out.polygons.is_empty());
    assert!(!out.is_degraded());
}

#[test]
fn test_degenerate_operand_keeps_first_operand() {
    // Zero-area sliver: the kernel yields nothing, the engine keeps it
    let sliver = PolygonSet::new(vec![Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(5.0, 0.0),
        Point::new(10.0, 0.0),
    ])
    .unwrap()]);
    let out = engine().union(&[&sliver]);
    assert!(out.is_degraded());
    assert_eq!(out.polygons, sliver);
}

#[test]
fn test_cache_never_changes_results() {
    let cache = Arc::new(GeometryCache::new(2));
    let cached = engine().with_cache(cache.clone());
    let plain = engine();
    for i in 0..6 {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(i as f64, 3.0, 10.0, 10.0);
        assert_eq!(
            cached.union(&[&a, &b]).polygons,
            plain.union(&[&a, &b]).polygons
        );
    }
    assert!(cache.len() <= 2);
    assert!(cache.stats().evictions > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_union_order_independent(
        rects in prop::collection::vec((0.0f64..50.0, 0.0f64..50.0, 1.0f64..30.0, 1.0f64..30.0), 2..5)
    ) {
        let e = engine();
        let sets: Vec<PolygonSet> = rects.iter().map(|&(x, y, w, h)| rect(x, y, w, h)).collect();
        let forward: Vec<&PolygonSet> = sets.iter().collect();
        let backward: Vec<&PolygonSet> = sets.iter().rev().collect();

        let a = e.union(&forward).polygons;
        let b = e.union(&backward).polygons;
        prop_assert!((a.area() - b.area()).abs() < 1e-6);
        let (ba, bb) = (a.bounds().unwrap(), b.bounds().unwrap());
        prop_assert!((ba.min_x - bb.min_x).abs() < 1e-6);
        prop_assert!((ba.max_y - bb.max_y).abs() < 1e-6);
    }
}
