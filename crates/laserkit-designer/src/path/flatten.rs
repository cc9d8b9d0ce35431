//! Flattening of path commands into closed rings.
//!
//! Curves are sampled at uniform parameter steps. The step count for Béziers
//! is `max(4, ceil(chord / tolerance))` where the chord is the straight
//! distance between the segment endpoints after placement. This keeps the
//! output stable and fast but is not a true tolerance bound: a tight curl
//! whose endpoints sit close together still gets only a few segments.
//!
//! Smooth curve commands (`S s T t`) are drawn as straight lines to their
//! endpoint.

use laserkit_core::{GeometryError, Point, Polygon, PolygonSet, Transform};
use lyon::geom::{point, CubicBezierSegment, QuadraticBezierSegment};
use tracing::{debug, warn};

use super::arc;
use super::command::{CommandKind, PathCommand};
use super::tokenizer::tokenize_with_diagnostics;

/// Tolerance used when the caller passes a non-finite or non-positive one.
pub const DEFAULT_TOLERANCE_MM: f64 = 0.25;
/// Lower clamp for the flattening tolerance.
pub const MIN_TOLERANCE_MM: f64 = 1e-3;
/// Minimum number of segments per curve.
pub const MIN_CURVE_SEGMENTS: usize = 4;
/// Upper bound on segments per curve so hostile input cannot explode memory.
pub const MAX_CURVE_SEGMENTS: usize = 4096;

/// The rings of one path plus every degradation applied while reading it.
#[derive(Debug, Clone, Default)]
pub struct PathReport {
    pub polygons: PolygonSet,
    pub diagnostics: Vec<GeometryError>,
}

/// Flattens path data in its own coordinate frame.
pub fn flatten(path_data: &str, tolerance_mm: f64) -> PolygonSet {
    flatten_report(path_data, tolerance_mm, &Transform::identity()).polygons
}

/// Flattens path data and places every point with `transform`.
pub fn flatten_with_transform(
    path_data: &str,
    tolerance_mm: f64,
    transform: &Transform,
) -> PolygonSet {
    flatten_report(path_data, tolerance_mm, transform).polygons
}

/// Flattens path data and keeps the diagnostics.
pub fn flatten_report(path_data: &str, tolerance_mm: f64, transform: &Transform) -> PathReport {
    let tokenized = tokenize_with_diagnostics(path_data);
    let mut report = flatten_commands(&tokenized.commands, tolerance_mm, transform);
    let mut diagnostics = tokenized.diagnostics;
    diagnostics.append(&mut report.diagnostics);
    report.diagnostics = diagnostics;
    report
}

/// Flattens already tokenized commands.
pub fn flatten_commands(
    commands: &[PathCommand],
    tolerance_mm: f64,
    transform: &Transform,
) -> PathReport {
    let mut flattener = Flattener::new(effective_tolerance(tolerance_mm), transform);
    for command in commands {
        flattener.apply(command);
    }
    let report = flattener.finish();
    debug!(
        "Flattened {} commands into {} rings ({} vertices)",
        commands.len(),
        report.polygons.len(),
        report.polygons.vertex_count()
    );
    report
}

fn effective_tolerance(tolerance_mm: f64) -> f64 {
    if tolerance_mm.is_finite() && tolerance_mm > 0.0 {
        tolerance_mm.max(MIN_TOLERANCE_MM)
    } else {
        warn!(
            "Flatten tolerance {} unusable, using {}",
            tolerance_mm, DEFAULT_TOLERANCE_MM
        );
        DEFAULT_TOLERANCE_MM
    }
}

/// Segment count for a curve of approximate placed length `length`.
pub fn segment_count(length: f64, tolerance: f64) -> usize {
    let raw = (length / tolerance).ceil();
    if !raw.is_finite() {
        return MIN_CURVE_SEGMENTS;
    }
    (raw as usize).clamp(MIN_CURVE_SEGMENTS, MAX_CURVE_SEGMENTS)
}

struct Flattener<'a> {
    tolerance: f64,
    transform: &'a Transform,
    identity: bool,
    /// Current point in path coordinates.
    current: Point,
    /// Start of the current sub-path in path coordinates.
    start: Point,
    /// Placed points of the open ring.
    ring: Vec<Point>,
    polygons: PolygonSet,
    diagnostics: Vec<GeometryError>,
}

impl<'a> Flattener<'a> {
    fn new(tolerance: f64, transform: &'a Transform) -> Self {
        Self {
            tolerance,
            transform,
            identity: transform.is_identity(),
            current: Point::default(),
            start: Point::default(),
            ring: Vec::new(),
            polygons: PolygonSet::empty(),
            diagnostics: Vec::new(),
        }
    }

    fn place(&self, p: Point) -> Point {
        if self.identity {
            p
        } else {
            self.transform.apply(p)
        }
    }

    /// Resolves operands `(x, y)` at `index` against the current point.
    fn target(&self, command: &PathCommand, index: usize) -> Point {
        let x = command.operand(index);
        let y = command.operand(index + 1);
        if command.kind.is_relative() {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x, y)
        }
    }

    fn begin_if_needed(&mut self) {
        if self.ring.is_empty() {
            let p = self.place(self.current);
            self.ring.push(p);
        }
    }

    fn line_to(&mut self, p: Point) {
        self.begin_if_needed();
        let placed = self.place(p);
        self.ring.push(placed);
        self.current = p;
    }

    fn apply(&mut self, command: &PathCommand) {
        use CommandKind::*;
        match command.kind {
            MoveAbs | MoveRel => {
                let to = self.target(command, 0);
                self.end_subpath(false);
                self.current = to;
                self.start = to;
                let placed = self.place(to);
                self.ring.push(placed);
            }
            LineAbs | LineRel => {
                let to = self.target(command, 0);
                self.line_to(to);
            }
            HLineAbs => self.line_to(Point::new(command.operand(0), self.current.y)),
            HLineRel => self.line_to(Point::new(
                self.current.x + command.operand(0),
                self.current.y,
            )),
            VLineAbs => self.line_to(Point::new(self.current.x, command.operand(0))),
            VLineRel => self.line_to(Point::new(
                self.current.x,
                self.current.y + command.operand(0),
            )),
            CubicAbs | CubicRel => {
                let c1 = self.target(command, 0);
                let c2 = self.target(command, 2);
                let to = self.target(command, 4);
                self.cubic_to(c1, c2, to);
            }
            QuadAbs | QuadRel => {
                let c = self.target(command, 0);
                let to = self.target(command, 2);
                self.quad_to(c, to);
            }
            SmoothCubicAbs | SmoothCubicRel => {
                let to = self.target(command, 2);
                self.line_to(to);
            }
            SmoothQuadAbs | SmoothQuadRel => {
                let to = self.target(command, 0);
                self.line_to(to);
            }
            ArcAbs | ArcRel => {
                let to = self.target(command, 5);
                self.arc_to(command, to);
            }
            Close => self.end_subpath(true),
        }
    }

    fn chord(&self, from: Point, to: Point) -> f64 {
        self.place(from).distance_to(&self.place(to))
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, to: Point) {
        let from = self.current;
        let segment = CubicBezierSegment {
            from: point(from.x, from.y),
            ctrl1: point(c1.x, c1.y),
            ctrl2: point(c2.x, c2.y),
            to: point(to.x, to.y),
        };
        let n = segment_count(self.chord(from, to), self.tolerance);
        self.begin_if_needed();
        for i in 1..n {
            let p = segment.sample(i as f64 / n as f64);
            let placed = self.place(Point::new(p.x, p.y));
            self.ring.push(placed);
        }
        self.line_to(to);
    }

    fn quad_to(&mut self, c: Point, to: Point) {
        let from = self.current;
        let segment = QuadraticBezierSegment {
            from: point(from.x, from.y),
            ctrl: point(c.x, c.y),
            to: point(to.x, to.y),
        };
        let n = segment_count(self.chord(from, to), self.tolerance);
        self.begin_if_needed();
        for i in 1..n {
            let p = segment.sample(i as f64 / n as f64);
            let placed = self.place(Point::new(p.x, p.y));
            self.ring.push(placed);
        }
        self.line_to(to);
    }

    fn arc_to(&mut self, command: &PathCommand, to: Point) {
        let from = self.current;
        let large_arc = command.operand(3) != 0.0;
        let sweep = command.operand(4) != 0.0;
        let rx = command.operand(0);
        let ry = command.operand(1);

        if from.distance_to(&to) <= f64::EPSILON {
            // Identical endpoints: the arc is omitted
            return;
        }
        let Some(center_arc) =
            arc::endpoint_to_center(from, to, rx, ry, command.operand(2), large_arc, sweep)
        else {
            self.line_to(to);
            return;
        };

        let length = center_arc.approximate_length() * self.transform.linear_scale();
        let n = segment_count(length, self.tolerance);
        self.begin_if_needed();
        for p in arc::sample(&center_arc, to, n) {
            let placed = self.place(p);
            self.ring.push(placed);
        }
        self.current = to;
    }

    /// Ends the open ring. Rings with fewer than three points are dropped.
    fn end_subpath(&mut self, explicit_close: bool) {
        let ring = std::mem::take(&mut self.ring);
        if ring.len() >= 3 {
            if ring.iter().all(Point::is_finite) {
                if let Some(polygon) = Polygon::new(ring) {
                    self.polygons.push(polygon);
                }
            } else {
                let err = GeometryError::parse("ring with non-finite vertices dropped");
                warn!("{}", err);
                self.diagnostics.push(err);
            }
        }
        if explicit_close {
            self.current = self.start;
        }
    }

    fn finish(mut self) -> PathReport {
        self.end_subpath(false);
        PathReport {
            polygons: self.polygons,
            diagnostics: self.diagnostics,
        }
    }
}
