//! Offset (grow / shrink) of polygon sets with round joins.
//!
//! The production backend groups the normalized set into shapes (an outer
//! ring plus the holes it directly encloses), offsets every ring with
//! `cavalier_contours`, subtracts each shape's shrunk holes from its own
//! grown outer and unions the shapes. Round joins come back as bulge arcs and are tessellated so
//! that no chord strays further than the arc tolerance from the true arc.
//!
//! The stroke-union backend grows a set by unioning it with a quad per edge
//! and a disc per vertex. It only grows. Near sharp concave corners the
//! stroked result can pinch or self-touch; this is a known limitation of the
//! approach and is left as is.

use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use laserkit_core::{BoundingBox, GeometryError, Point, Polygon, PolygonSet, Result};
use tracing::{debug, warn};

use crate::cache::{fingerprint, GeometryCache, GeometryCacheKey, GeometryOp};
use crate::ops::{OpOutcome, PolygonBooleanBackend};

/// Arc tolerance used when the caller passes an unusable one.
pub const DEFAULT_ARC_TOLERANCE_MM: f64 = 0.1;
/// Smallest arc tolerance accepted by the engine.
pub const MIN_ARC_TOLERANCE_MM: f64 = 1e-3;
/// Upper bound on segments for one arc.
pub const MAX_ARC_SEGMENTS: usize = 1024;

/// Number of chords needed so a circular arc of `radius` spanning `sweep`
/// radians deviates at most `tolerance` from the true arc (sagitta bound).
pub fn arc_segment_count(radius: f64, sweep: f64, tolerance: f64) -> usize {
    let sweep = sweep.abs();
    if !(radius.is_finite() && sweep.is_finite()) || radius <= 0.0 || sweep <= 0.0 {
        return 1;
    }
    let ratio = (tolerance / radius).min(1.0);
    let max_step = 2.0 * (1.0 - ratio).acos();
    if !(max_step.is_finite() && max_step > 0.0) {
        return MAX_ARC_SEGMENTS;
    }
    let steps = (sweep / max_step.min(PI / 2.0)).ceil();
    (steps as usize).clamp(1, MAX_ARC_SEGMENTS)
}

/// A polygon offset kernel.
pub trait PolygonOffsetBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Offsets `set` by `delta_mm` (positive grows) with round joins.
    fn offset(&self, set: &PolygonSet, delta_mm: f64, arc_tolerance_mm: f64)
        -> Result<PolygonSet>;
}

fn to_polyline(polygon: &Polygon) -> Polyline<f64> {
    let mut pline = Polyline::new();
    for p in polygon.points() {
        pline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
    }
    pline.set_is_closed(true);
    pline
}

/// Expands a closed polyline with bulge arcs into a plain ring.
fn tessellate(pline: &Polyline<f64>, tolerance: f64) -> Vec<Point> {
    let vertices = &pline.vertex_data;
    let n = vertices.len();
    let mut points = Vec::with_capacity(n * 2);
    for i in 0..n {
        let v1 = vertices[i];
        let v2 = vertices[(i + 1) % n];
        let start = Point::new(v1.x, v1.y);
        points.push(start);
        if v1.bulge.abs() < 1e-12 {
            continue;
        }

        let end = Point::new(v2.x, v2.y);
        let chord = start.distance_to(&end);
        if chord < 1e-12 {
            continue;
        }
        let abs_bulge = v1.bulge.abs();
        let radius = chord * (abs_bulge * abs_bulge + 1.0) / (4.0 * abs_bulge);
        let sagitta = abs_bulge * chord / 2.0;
        let m = radius - sagitta;
        let (mut ox, mut oy) = (-m * (end.y - start.y) / chord, m * (end.x - start.x) / chord);
        if v1.bulge < 0.0 {
            ox = -ox;
            oy = -oy;
        }
        let center = Point::new(
            (start.x + end.x) / 2.0 + ox,
            (start.y + end.y) / 2.0 + oy,
        );
        let sweep = 4.0 * v1.bulge.atan();
        let a0 = (start.y - center.y).atan2(start.x - center.x);
        let steps = arc_segment_count(radius, sweep, tolerance);
        for k in 1..steps {
            let a = a0 + sweep * k as f64 / steps as f64;
            points.push(Point::new(
                center.x + radius * a.cos(),
                center.y + radius * a.sin(),
            ));
        }
    }
    points
}

/// Offsets each shape (an outer ring with the holes it directly encloses)
/// and unions the per-shape results.
///
/// Holes are only subtracted from their own outer, so an island sitting
/// inside a hole survives growth.
pub struct ParallelOffsetBackend {
    boolean: Arc<dyn PolygonBooleanBackend>,
}

impl ParallelOffsetBackend {
    pub fn new(boolean: Arc<dyn PolygonBooleanBackend>) -> Self {
        Self { boolean }
    }
}

/// An outer ring and the holes whose innermost enclosing outer it is.
#[derive(Debug, Default)]
struct Shape {
    outer: Option<Polygon>,
    holes: Vec<Polygon>,
}

fn bounds_within(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    outer.min_x <= inner.min_x
        && outer.min_y <= inner.min_y
        && outer.max_x >= inner.max_x
        && outer.max_y >= inner.max_y
}

/// Groups a normalized set into shapes. Holes with no enclosing outer end
/// up in a shape without one.
fn group_shapes(set: &PolygonSet) -> Vec<Shape> {
    let mut shapes: Vec<Shape> = Vec::new();
    let mut orphans = Shape::default();
    for polygon in set.iter().filter(|p| p.is_positive()) {
        shapes.push(Shape {
            outer: Some(polygon.clone()),
            holes: Vec::new(),
        });
    }
    for hole in set.iter().filter(|p| !p.is_positive()) {
        let hole_bounds = hole.bounds();
        let owner = shapes
            .iter()
            .enumerate()
            .filter_map(|(index, shape)| shape.outer.as_ref().map(|outer| (index, outer)))
            .filter(|(_, outer)| bounds_within(&outer.bounds(), &hole_bounds))
            .filter(|(_, outer)| hole.points().iter().any(|p| outer.contains_point(p)))
            .min_by(|(_, a), (_, b)| a.area().total_cmp(&b.area()))
            .map(|(index, _)| index);
        match owner {
            Some(index) => shapes[index].holes.push(hole.clone()),
            None => orphans.holes.push(hole.clone()),
        }
    }
    if !orphans.holes.is_empty() {
        shapes.push(orphans);
    }
    shapes
}

/// Parallel offset of one ring, returned as positive rings.
fn offset_ring(polygon: &Polygon, delta_mm: f64, arc_tolerance_mm: f64) -> PolygonSet {
    // Left of travel is the interior of a positive ring and the material
    // around a negative one, so -delta moves both outward.
    to_polyline(polygon)
        .parallel_offset(-delta_mm)
        .into_iter()
        .filter(|pline| pline.is_closed())
        .filter_map(|pline| Polygon::new(tessellate(&pline, arc_tolerance_mm)))
        .map(|ring| ring.oriented(true))
        .collect()
}

impl ParallelOffsetBackend {
    fn offset_shape(&self, shape: &Shape, delta_mm: f64, tolerance: f64) -> Result<PolygonSet> {
        let mut holes = PolygonSet::empty();
        for hole in &shape.holes {
            holes.extend(offset_ring(hole, delta_mm, tolerance));
        }
        let Some(outer) = &shape.outer else {
            // Orphan holes cut nothing on their own; callers subtract them.
            return Ok(holes);
        };
        let grown = self.boolean.union(&[&offset_ring(outer, delta_mm, tolerance)])?;
        if grown.is_empty() || holes.is_empty() {
            return Ok(grown);
        }
        let hole_union = self.boolean.union(&[&holes])?;
        self.boolean.difference(&grown, &hole_union)
    }
}

impl PolygonOffsetBackend for ParallelOffsetBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn offset(&self, set: &PolygonSet, delta_mm: f64, arc_tolerance_mm: f64) -> Result<PolygonSet> {
        let normalized = self.boolean.normalize(set)?;

        let mut pieces = Vec::new();
        let mut orphan_holes = PolygonSet::empty();
        for shape in group_shapes(&normalized) {
            let piece = self.offset_shape(&shape, delta_mm, arc_tolerance_mm)?;
            if shape.outer.is_some() {
                pieces.push(piece);
            } else {
                orphan_holes.extend(piece);
            }
        }

        let refs: Vec<&PolygonSet> = pieces.iter().collect();
        let merged = self.boolean.union(&refs)?;
        if orphan_holes.is_empty() || merged.is_empty() {
            return Ok(merged);
        }
        let orphan_union = self.boolean.union(&[&orphan_holes])?;
        self.boolean.difference(&merged, &orphan_union)
    }
}

/// Grows a set by stroking its boundary: `union(P, edge quads, vertex discs)`.
pub struct StrokeUnionOffsetBackend {
    boolean: Arc<dyn PolygonBooleanBackend>,
}

impl StrokeUnionOffsetBackend {
    pub fn new(boolean: Arc<dyn PolygonBooleanBackend>) -> Self {
        Self { boolean }
    }
}

/// Disc of `radius` around `center`, approximated within `tolerance`.
pub fn disc(center: Point, radius: f64, tolerance: f64, min_segments: usize) -> Option<Polygon> {
    let segments = arc_segment_count(radius, TAU, tolerance).max(min_segments).max(3);
    let points = (0..segments)
        .map(|i| {
            let a = TAU * i as f64 / segments as f64;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect();
    Polygon::new(points)
}

fn edge_quad(a: Point, b: Point, half_width: f64) -> Option<Polygon> {
    let len = a.distance_to(&b);
    if len < 1e-12 {
        return None;
    }
    let nx = -(b.y - a.y) / len * half_width;
    let ny = (b.x - a.x) / len * half_width;
    Polygon::new(vec![
        Point::new(a.x + nx, a.y + ny),
        Point::new(a.x - nx, a.y - ny),
        Point::new(b.x - nx, b.y - ny),
        Point::new(b.x + nx, b.y + ny),
    ])
    .map(|q| q.oriented(true))
}

impl PolygonOffsetBackend for StrokeUnionOffsetBackend {
    fn name(&self) -> &'static str {
        "stroke-union"
    }

    fn offset(&self, set: &PolygonSet, delta_mm: f64, arc_tolerance_mm: f64) -> Result<PolygonSet> {
        if delta_mm <= 0.0 {
            return Err(GeometryError::offset(delta_mm, "stroke union only grows"));
        }
        let mut stroke = PolygonSet::empty();
        for polygon in set {
            for (a, b) in polygon.edges() {
                if let Some(quad) = edge_quad(a, b, delta_mm) {
                    stroke.push(quad);
                }
            }
            for p in polygon.points() {
                if let Some(d) = disc(*p, delta_mm, arc_tolerance_mm, 8) {
                    stroke.push(d);
                }
            }
        }
        self.boolean.union(&[set, &stroke])
    }
}

/// How the offset engine is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetStrategy {
    /// Parallel offset, falling back to stroke union when growth fails.
    #[default]
    ParallelWithStrokeFallback,
    /// Parallel offset only.
    Parallel,
    /// Stroke union only (growth only).
    StrokeUnion,
}

impl OffsetStrategy {
    /// Builds the primary and optional fallback backends for this strategy.
    pub fn backends(
        &self,
        boolean: Arc<dyn PolygonBooleanBackend>,
    ) -> (Arc<dyn PolygonOffsetBackend>, Option<Arc<dyn PolygonOffsetBackend>>) {
        match self {
            Self::ParallelWithStrokeFallback => (
                Arc::new(ParallelOffsetBackend::new(boolean.clone())),
                Some(Arc::new(StrokeUnionOffsetBackend::new(boolean))),
            ),
            Self::Parallel => (Arc::new(ParallelOffsetBackend::new(boolean)), None),
            Self::StrokeUnion => (Arc::new(StrokeUnionOffsetBackend::new(boolean)), None),
        }
    }
}

/// Offset with validation, fallback and caching.
#[derive(Clone)]
pub struct OffsetEngine {
    primary: Arc<dyn PolygonOffsetBackend>,
    fallback: Option<Arc<dyn PolygonOffsetBackend>>,
    cache: Option<Arc<GeometryCache>>,
}

impl std::fmt::Debug for OffsetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OffsetEngine")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|b| b.name()))
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

fn sanitize_tolerance(tolerance: f64) -> f64 {
    if tolerance.is_finite() && tolerance > 0.0 {
        tolerance.max(MIN_ARC_TOLERANCE_MM)
    } else {
        DEFAULT_ARC_TOLERANCE_MM
    }
}

/// Checks an offset result against its input bounds and area.
///
/// The input is expected to be normalized (a union result), so its area is
/// the filled area under non-zero winding.
fn validate(
    input: &BoundingBox,
    input_area: f64,
    result: &PolygonSet,
    delta_mm: f64,
    tolerance: f64,
) -> std::result::Result<(), String> {
    if !result.is_finite() {
        return Err("non-finite vertex in result".into());
    }
    let Some(bounds) = result.bounds() else {
        return if delta_mm > 0.0 {
            Err("growth produced no geometry".into())
        } else {
            Ok(())
        };
    };
    let slack = tolerance + 1e-9;
    let contains = |outer: &BoundingBox, inner: &BoundingBox| {
        outer.min_x <= inner.min_x + slack
            && outer.min_y <= inner.min_y + slack
            && outer.max_x + slack >= inner.max_x
            && outer.max_y + slack >= inner.max_y
    };
    if delta_mm > 0.0 && !contains(&bounds, input) {
        return Err(format!("growth shrank the bounds to {:?}", bounds));
    }
    if delta_mm < 0.0 && !contains(input, &bounds) {
        return Err(format!("shrink grew the bounds to {:?}", bounds));
    }
    let area = result.area();
    let area_slack = 1e-9 * input_area.max(1.0);
    if delta_mm > 0.0 && area + area_slack < input_area {
        return Err(format!("growth lost area ({} < {})", area, input_area));
    }
    if delta_mm < 0.0 && area > input_area + area_slack {
        return Err(format!("shrink gained area ({} > {})", area, input_area));
    }
    Ok(())
}

impl OffsetEngine {
    pub fn new(
        primary: Arc<dyn PolygonOffsetBackend>,
        fallback: Option<Arc<dyn PolygonOffsetBackend>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache: None,
        }
    }

    /// Wires the engine for `strategy` on top of `boolean`.
    pub fn with_strategy(strategy: OffsetStrategy, boolean: Arc<dyn PolygonBooleanBackend>) -> Self {
        let (primary, fallback) = strategy.backends(boolean);
        Self::new(primary, fallback)
    }

    pub fn with_cache(mut self, cache: Arc<GeometryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn primary(&self) -> &Arc<dyn PolygonOffsetBackend> {
        &self.primary
    }

    fn attempt(
        &self,
        backend: &Arc<dyn PolygonOffsetBackend>,
        set: &PolygonSet,
        bounds: &BoundingBox,
        delta_mm: f64,
        tolerance: f64,
    ) -> Result<PolygonSet> {
        let result = backend.offset(set, delta_mm, tolerance)?;
        validate(bounds, set.area(), &result, delta_mm, tolerance)
            .map_err(|reason| GeometryError::offset(delta_mm, reason))?;
        Ok(result)
    }

    /// Offsets `set` by `delta_mm`.
    ///
    /// An empty set or a zero delta returns the input unchanged. A failed
    /// growth is retried on the fallback backend; when nothing works the
    /// input comes back unchanged together with the error.
    pub fn offset(&self, set: &PolygonSet, delta_mm: f64, arc_tolerance_mm: f64) -> OpOutcome {
        if set.is_empty() || delta_mm == 0.0 {
            return OpOutcome::ok(set.clone());
        }
        if !delta_mm.is_finite() {
            let err = GeometryError::offset(delta_mm, "non-finite distance");
            warn!("{}", err);
            return OpOutcome::degraded(set.clone(), err);
        }
        let Some(bounds) = set.bounds() else {
            return OpOutcome::ok(set.clone());
        };
        let tolerance = sanitize_tolerance(arc_tolerance_mm);

        let key = GeometryCacheKey::new(
            GeometryOp::Offset,
            &[fingerprint(set), delta_mm.to_bits()],
            tolerance,
        );
        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            return OpOutcome::ok((*hit).clone());
        }

        let err = match self.attempt(&self.primary, set, &bounds, delta_mm, tolerance) {
            Ok(result) => {
                debug!(
                    "Offset {}mm via {}: {} rings",
                    delta_mm,
                    self.primary.name(),
                    result.len()
                );
                self.store(key, &result);
                return OpOutcome::ok(result);
            }
            Err(err) => err,
        };
        warn!("{} ({})", err, self.primary.name());

        if delta_mm > 0.0 {
            if let Some(fallback) = &self.fallback {
                match self.attempt(fallback, set, &bounds, delta_mm, tolerance) {
                    Ok(result) => {
                        debug!("Offset fell back to {}", fallback.name());
                        return OpOutcome::degraded(result, err);
                    }
                    Err(fallback_err) => warn!("{} ({})", fallback_err, fallback.name()),
                }
            }
        }
        OpOutcome::degraded(set.clone(), err)
    }

    fn store(&self, key: GeometryCacheKey, result: &PolygonSet) {
        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::new(result.clone()));
        }
    }
}
