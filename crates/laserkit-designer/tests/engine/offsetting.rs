//! Integration tests for the offset engine

use std::sync::Arc;

use laserkit_core::{Point, Polygon, PolygonSet};
use laserkit_designer::offset::disc;
use laserkit_designer::{OffsetEngine, OffsetStrategy, OverlayBackend};
use proptest::prelude::*;

const TOL: f64 = 0.1;

fn engine() -> OffsetEngine {
    OffsetEngine::with_strategy(OffsetStrategy::default(), Arc::new(OverlayBackend::new()))
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> PolygonSet {
    PolygonSet::new(vec![Polygon::rectangle(x, y, w, h).unwrap()])
}

#[test]
fn test_growth_of_square_matches_expected_bounds() {
    let grown = engine().offset(&rect(0.0, 0.0, 10.0, 10.0), 3.0, TOL);
    assert!(!grown.is_degraded());
    let bb = grown.polygons.bounds().unwrap();
    assert!((bb.width() - 16.0).abs() <= 2.0 * TOL);
    assert!((bb.height() - 16.0).abs() <= 2.0 * TOL);
    assert!((bb.min_x + 3.0).abs() <= 2.0 * TOL);
    assert!((bb.min_y + 3.0).abs() <= 2.0 * TOL);
}

#[test]
fn test_grow_then_shrink_recovers_convex_square() {
    let e = engine();
    let square = rect(0.0, 0.0, 10.0, 10.0);
    let grown = e.offset(&square, 3.0, TOL).polygons;
    let back = e.offset(&grown, -3.0, TOL).polygons;
    let bb = back.bounds().unwrap();
    assert!(bb.min_x.abs() <= 2.0 * TOL);
    assert!(bb.min_y.abs() <= 2.0 * TOL);
    assert!((bb.max_x - 10.0).abs() <= 2.0 * TOL);
    assert!((bb.max_y - 10.0).abs() <= 2.0 * TOL);
    assert!((back.area() - 100.0).abs() <= 4.0 * 10.0 * TOL);
}

#[test]
fn test_shrink_past_thickness_vanishes() {
    let out = engine().offset(&rect(0.0, 0.0, 4.0, 4.0), -3.0, TOL);
    assert!(out.polygons.is_empty());
    assert!(!out.is_degraded());
}

#[test]
fn test_growth_merges_nearby_islands() {
    let mut set = rect(0.0, 0.0, 5.0, 5.0);
    set.push(Polygon::rectangle(6.0, 0.0, 5.0, 5.0).unwrap());
    let out = engine().offset(&set, 1.0, TOL).polygons;
    assert_eq!(out.len(), 1);
    assert!(out.contains_point(&Point::new(5.5, 2.5)));
}

#[test]
fn test_identity_cases() {
    let e = engine();
    let square = rect(2.0, 2.0, 3.0, 3.0);
    assert_eq!(e.offset(&square, 0.0, TOL).polygons, square);
    assert!(e.offset(&PolygonSet::empty(), 5.0, TOL).polygons.is_empty());
}

#[test]
fn test_non_finite_distance_degrades() {
    let square = rect(0.0, 0.0, 3.0, 3.0);
    let out = engine().offset(&square, f64::NAN, TOL);
    assert!(out.is_degraded());
    assert_eq!(out.polygons, square);
}

#[test]
fn test_stroke_union_strategy_grows_triangle() {
    let e = OffsetEngine::with_strategy(OffsetStrategy::StrokeUnion, Arc::new(OverlayBackend::new()));
    let tri = PolygonSet::new(vec![Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(5.0, 8.0),
    ])
    .unwrap()]);
    let out = e.offset(&tri, 1.0, TOL).polygons;
    let bb = out.bounds().unwrap();
    assert!((bb.min_y + 1.0).abs() <= 2.0 * TOL);
    assert!(out.area() > tri.area());
}

/// Disc with a hole and an island inside the hole.
fn bullseye(outer: f64, hole: f64, island: f64) -> PolygonSet {
    let c = Point::new(50.0, 50.0);
    PolygonSet::new(vec![
        disc(c, outer, 0.05, 96).unwrap(),
        disc(c, hole, 0.05, 96).unwrap().reversed(),
        disc(c, island, 0.05, 96).unwrap(),
    ])
}

/// L-shaped polygon with a reflex corner at `(arm, arm)`.
fn l_shape(w: f64, h: f64, arm: f64) -> PolygonSet {
    PolygonSet::new(vec![Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, arm),
        Point::new(arm, arm),
        Point::new(arm, h),
        Point::new(0.0, h),
    ])
    .unwrap()])
}

#[test]
fn test_growth_keeps_island_inside_counter() {
    let set = bullseye(20.0, 15.0, 10.0);
    let out = engine().offset(&set, 1.0, 0.05);
    assert!(!out.is_degraded());
    assert!(out.polygons.area() >= set.area());
    assert!(out.polygons.contains_point(&Point::new(50.0, 50.0)));
    assert!(!out.polygons.contains_point(&Point::new(62.5, 50.0)));
}

#[test]
fn test_concave_growth_fills_reflex_corner() {
    let set = l_shape(20.0, 20.0, 5.0);
    let out = engine().offset(&set, 2.0, TOL).polygons;
    assert!(out.area() > set.area());
    assert!(out.contains_point(&Point::new(6.0, 6.0)));
    assert!(!out.contains_point(&Point::new(8.0, 8.0)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_nested_growth_never_loses_area(
        outer in 8.0f64..40.0,
        hole_ratio in 0.3f64..0.8,
        island_ratio in 0.2f64..0.8,
        delta in 0.2f64..3.0,
    ) {
        let hole = outer * hole_ratio;
        let set = bullseye(outer, hole, hole * island_ratio);
        let out = engine().offset(&set, delta, TOL);
        prop_assert!(!out.is_degraded());
        prop_assert!(out.polygons.area() + 1e-6 >= set.area());
        prop_assert!(out.polygons.contains_point(&Point::new(50.0, 50.0)));
    }

    #[test]
    fn prop_concave_growth_never_loses_area(
        w in 6.0f64..40.0,
        h in 6.0f64..40.0,
        arm_ratio in 0.1f64..0.9,
        delta in 0.2f64..4.0,
    ) {
        let set = l_shape(w, h, w.min(h) * arm_ratio);
        let out = engine().offset(&set, delta, TOL);
        prop_assert!(!out.is_degraded());
        prop_assert!(out.polygons.area() >= set.area());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_growth_is_monotonic(
        w in 2.0f64..40.0,
        h in 2.0f64..40.0,
        d1 in 0.5f64..5.0,
        step in 0.5f64..5.0,
    ) {
        let e = engine();
        let square = rect(0.0, 0.0, w, h);
        let small = e.offset(&square, d1, TOL).polygons;
        let large = e.offset(&square, d1 + step, TOL).polygons;
        prop_assert!(small.area() >= square.area());
        prop_assert!(large.area() >= small.area());
        let (bs, bl) = (small.bounds().unwrap(), large.bounds().unwrap());
        prop_assert!(bl.min_x <= bs.min_x + 1e-9);
        prop_assert!(bl.max_x + 1e-9 >= bs.max_x);
    }
}
