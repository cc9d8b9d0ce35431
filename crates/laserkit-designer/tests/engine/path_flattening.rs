//! Integration tests for path tokenizing and flattening

use laserkit_core::{Point, Polygon, PolygonSet, Transform};
use laserkit_designer::path::{flatten_report, CommandKind};
use laserkit_designer::{flatten, flatten_with_transform, polygon_set_to_path, tokenize};
use proptest::prelude::*;

#[test]
fn test_polyline_shorthand_repeats_lineto() {
    let cmds = tokenize("M 0 0 10 0 10 10 0 10 Z");
    let kinds: Vec<CommandKind> = cmds.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            CommandKind::MoveAbs,
            CommandKind::LineAbs,
            CommandKind::LineAbs,
            CommandKind::LineAbs,
            CommandKind::Close
        ]
    );
    assert_eq!(flatten("M 0 0 10 0 10 10 0 10 Z", 0.1).area(), 100.0);
}

#[test]
fn test_glyph_with_counter() {
    // Outer ring and an oppositely wound inner ring, as fonts emit an "O"
    let set = flatten("M0 0 H10 V10 H0 Z M3 3 V7 H7 V3 Z", 0.1);
    assert_eq!(set.len(), 2);
    assert!(set.polygons()[0].signed_area() * set.polygons()[1].signed_area() < 0.0);
    assert!(!set.contains_point(&Point::new(5.0, 5.0)));
    assert!(set.contains_point(&Point::new(1.0, 1.0)));
}

#[test]
fn test_corrupt_path_degrades() {
    let report = flatten_report("M0 0 L10 0 L10 1x L0 10 Z", 0.1, &Transform::identity());
    assert_eq!(report.polygons.len(), 1);
    // "1x" reads as 0: the third vertex lands on (10, 0) and is merged
    assert_eq!(report.polygons.polygons()[0].len(), 3);
    assert!(!report.diagnostics.is_empty());
}

#[test]
fn test_relative_curves() {
    let abs = flatten("M10 10 C10 20 20 20 20 10 Z", 0.5);
    let rel = flatten("M10 10 c0 10 10 10 10 0 z", 0.5);
    assert_eq!(abs, rel);
}

#[test]
fn test_arc_radius_correction() {
    // Radius 1 cannot reach across 10mm: the arc becomes a half circle of 5
    let set = flatten("M0 0 A1 1 0 0 1 10 0 Z", 0.05);
    let bb = set.bounds().unwrap();
    assert!((bb.height() - 5.0).abs() < 0.05);
    assert!((bb.width() - 10.0).abs() < 1e-9);
}

#[test]
fn test_minified_arc_flags() {
    // Icon packs drop the separators between the arc flags
    let minified = flatten("M0 0a5 5 0 0110 0z", 0.05);
    let spaced = flatten("M0 0 a5 5 0 0 1 10 0 z", 0.05);
    assert_eq!(minified, spaced);
    assert!((minified.bounds().unwrap().height() - 5.0).abs() < 0.05);
}

#[test]
fn test_rotated_ellipse_arc_endpoints() {
    let set = flatten("M0 0 A8 4 30 1 1 10 5 L0 5 Z", 0.05);
    let pts = set.polygons()[0].points();
    assert!(pts.contains(&Point::new(10.0, 5.0)));
    assert!(set.bounds().unwrap().is_valid());
}

#[test]
fn test_placement_is_one_affine_matrix() {
    let t = Transform::scale(2.0, 2.0)
        .then(&Transform::rotation_deg(90.0))
        .then(&Transform::translation(5.0, 5.0));
    let set = flatten_with_transform("M0 0 H10 V10 H0 Z", 0.1, &t);
    assert!((set.area() - 400.0).abs() < 1e-9);
    let bb = set.bounds().unwrap();
    assert!((bb.min_x - -15.0).abs() < 1e-9);
    assert!((bb.max_y - 25.0).abs() < 1e-9);
}

fn ring_strategy() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 3..12)
}

proptest! {
    #[test]
    fn prop_straight_line_round_trip(rings in prop::collection::vec(ring_strategy(), 1..4)) {
        let original: PolygonSet = rings
            .into_iter()
            .filter_map(|ring| Polygon::new(ring.into_iter().map(|(x, y)| Point::new(x, y)).collect()))
            .collect();
        prop_assume!(!original.is_empty());

        let written = polygon_set_to_path(&original, None);
        let reread = flatten(&written, 0.25);
        prop_assert_eq!(reread, original);
    }
}
