//! Keyring attachment.
//!
//! A ring is fused to the outline by union with an outer disc that overlaps
//! the outline's bounding box edge, then a concentric inner disc is
//! subtracted to form the hole.

use laserkit_core::{BoundingBox, Point, Polygon, PolygonSet};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_OVERLAP_MM;
use crate::offset::disc as sampled_disc;
use crate::ops::{BooleanEngine, OpOutcome};

/// Minimum number of segments for a ring disc.
pub const MIN_DISC_SEGMENTS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentKind {
    #[default]
    Ring,
}

/// Side of the outline the ring is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RingPosition {
    Left,
    #[default]
    Top,
    Right,
}

fn default_overlap() -> f64 {
    DEFAULT_OVERLAP_MM
}

/// Declarative keyring description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentSpec {
    #[serde(default)]
    pub kind: AttachmentKind,
    pub outer_radius_mm: f64,
    pub inner_radius_mm: f64,
    #[serde(default)]
    pub position: RingPosition,
    #[serde(default = "default_overlap")]
    pub overlap_mm: f64,
}

impl AttachmentSpec {
    pub fn ring(outer_radius_mm: f64, inner_radius_mm: f64, position: RingPosition) -> Self {
        Self {
            kind: AttachmentKind::Ring,
            outer_radius_mm,
            inner_radius_mm,
            position,
            overlap_mm: DEFAULT_OVERLAP_MM,
        }
    }
}

/// Ring center for `spec` next to `bounds` (SVG frame, y down).
pub fn ring_center(bounds: &BoundingBox, spec: &AttachmentSpec) -> Point {
    let c = bounds.center();
    let reach = spec.outer_radius_mm - spec.overlap_mm;
    match spec.position {
        RingPosition::Left => Point::new(bounds.min_x - reach, c.y),
        RingPosition::Right => Point::new(bounds.max_x + reach, c.y),
        RingPosition::Top => Point::new(c.x, bounds.min_y - reach),
    }
}

/// Disc polygon of at least [`MIN_DISC_SEGMENTS`] segments.
pub fn disc(center: Point, radius: f64, arc_tolerance_mm: f64) -> Option<Polygon> {
    sampled_disc(center, radius, arc_tolerance_mm, MIN_DISC_SEGMENTS)
}

/// Fuses a ring to `outline`: `difference(union(outline, outer), inner)`.
///
/// The returned error, if any, is the first boolean degradation.
pub fn attach_ring(
    engine: &BooleanEngine,
    outline: &PolygonSet,
    spec: &AttachmentSpec,
    arc_tolerance_mm: f64,
) -> OpOutcome {
    let Some(bounds) = outline.bounds() else {
        return OpOutcome::ok(outline.clone());
    };
    let center = ring_center(&bounds, spec);
    let outer: PolygonSet = disc(center, spec.outer_radius_mm, arc_tolerance_mm)
        .into_iter()
        .collect();
    let inner: PolygonSet = disc(center, spec.inner_radius_mm, arc_tolerance_mm)
        .into_iter()
        .collect();

    let fused = engine.union(&[outline, &outer]);
    let cut = engine.difference(&fused.polygons, &inner);
    OpOutcome {
        polygons: cut.polygons,
        error: fused.error.or(cut.error),
    }
}
