//! Planar geometry value types.
//!
//! All coordinates are millimeters in the SVG frame (x right, y down).
//! Orientation is expressed through the shoelace signed area: a positive
//! value marks an outer boundary, a negative value marks a hole.

use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Distance below which two consecutive vertices count as the same vertex.
pub const VERTEX_EPSILON: f64 = 1e-9;

/// Represents a 2D point with X and Y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given X and Y coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Axis aligned bounding box stored as min/max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Computes the box enclosing `points`, or `None` when there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bb = BoundingBox::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bb.include(p);
        }
        Some(bb)
    }

    pub fn include(&mut self, p: &Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Grows the box by `d` on every side.
    pub fn inflate(&self, d: f64) -> BoundingBox {
        BoundingBox::new(self.min_x - d, self.min_y - d, self.max_x + d, self.max_y + d)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
    }

    /// True when the box is finite and encloses a positive area.
    pub fn is_valid(&self) -> bool {
        self.is_finite() && self.width() > 0.0 && self.height() > 0.0
    }

    /// Returns the reason the box is unusable, if it is.
    pub fn validity_problem(&self) -> Option<String> {
        if !self.is_finite() {
            Some(format!("non-finite bounds {:?}", self))
        } else if self.width() <= 0.0 || self.height() <= 0.0 {
            Some(format!(
                "non-positive size {}x{}",
                self.width(),
                self.height()
            ))
        } else {
            None
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect {
            x: self.min_x,
            y: self.min_y,
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Position and size in millimeters, as handed to the document builder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// A closed ring of at least three vertices.
///
/// The closing edge is implicit: the last point connects back to the first
/// and is never stored twice. Consecutive duplicates are removed on
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Builds a polygon from raw vertices.
    ///
    /// Removes zero-length runs and a duplicated closing vertex. Returns
    /// `None` if fewer than three distinct finite vertices remain.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        let mut clean: Vec<Point> = Vec::with_capacity(points.len());
        for p in points {
            if !p.is_finite() {
                return None;
            }
            match clean.last() {
                Some(last) if last.distance_to(&p) <= VERTEX_EPSILON => {}
                _ => clean.push(p),
            }
        }
        while clean.len() > 1 {
            let first = clean[0];
            match clean.last() {
                Some(last) if last.distance_to(&first) <= VERTEX_EPSILON => {
                    clean.pop();
                }
                _ => break,
            }
        }
        if clean.len() < 3 {
            return None;
        }
        Some(Self { points: clean })
    }

    /// Axis aligned rectangle with a positive signed area.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        Self::new(vec![
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates the edges including the implicit closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace signed area.
    pub fn signed_area(&self) -> f64 {
        let twice: f64 = self.edges().map(|(a, b)| a.x * b.y - b.x * a.y).sum();
        twice / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_positive(&self) -> bool {
        self.signed_area() > 0.0
    }

    pub fn reversed(&self) -> Polygon {
        let mut points = self.points.clone();
        points.reverse();
        Polygon { points }
    }

    /// Returns the polygon with the requested orientation sign.
    pub fn oriented(self, positive: bool) -> Polygon {
        if self.is_positive() == positive {
            self
        } else {
            self.reversed()
        }
    }

    pub fn bounds(&self) -> BoundingBox {
        // `new` guarantees at least three points
        let first = self.points[0];
        let mut bb = BoundingBox::new(first.x, first.y, first.x, first.y);
        for p in &self.points[1..] {
            bb.include(p);
        }
        bb
    }

    /// Winding number of the ring around `p`.
    pub fn winding_number(&self, p: &Point) -> i32 {
        let mut wn = 0;
        for (a, b) in self.edges() {
            let cross = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
            if a.y <= p.y {
                if b.y > p.y && cross > 0.0 {
                    wn += 1;
                }
            } else if b.y <= p.y && cross < 0.0 {
                wn -= 1;
            }
        }
        wn
    }

    pub fn contains_point(&self, p: &Point) -> bool {
        self.winding_number(p) != 0
    }

    pub fn transformed(&self, transform: &Transform) -> Option<Polygon> {
        Polygon::new(self.points.iter().map(|p| transform.apply(*p)).collect())
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Polygon {
        Polygon {
            points: self.points.iter().map(|p| p.translated(dx, dy)).collect(),
        }
    }
}

impl TryFrom<Vec<Point>> for Polygon {
    type Error = String;

    fn try_from(points: Vec<Point>) -> Result<Self, Self::Error> {
        Polygon::new(points).ok_or_else(|| "polygon needs 3 distinct finite points".to_string())
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

/// An unordered collection of rings describing one filled region.
///
/// An empty set means "no geometry" and is never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonSet {
    polygons: Vec<Polygon>,
}

impl PolygonSet {
    pub fn new(polygons: Vec<Polygon>) -> Self {
        Self { polygons }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a set from raw rings, dropping the degenerate ones.
    pub fn from_rings(rings: impl IntoIterator<Item = Vec<Point>>) -> Self {
        Self {
            polygons: rings.into_iter().filter_map(Polygon::new).collect(),
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn into_polygons(self) -> Vec<Polygon> {
        self.polygons
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Polygon> {
        self.polygons.iter()
    }

    pub fn push(&mut self, polygon: Polygon) {
        self.polygons.push(polygon);
    }

    pub fn extend(&mut self, other: PolygonSet) {
        self.polygons.extend(other.polygons);
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons.iter().map(Polygon::len).sum()
    }

    /// Filled area for a normalized set (outers positive, holes negative).
    pub fn area(&self) -> f64 {
        self.polygons
            .iter()
            .map(Polygon::signed_area)
            .sum::<f64>()
            .abs()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.polygons
            .iter()
            .map(Polygon::bounds)
            .reduce(|a, b| a.union(&b))
    }

    pub fn is_finite(&self) -> bool {
        self.polygons
            .iter()
            .all(|poly| poly.points().iter().all(Point::is_finite))
    }

    /// Non-zero winding containment test over all rings.
    pub fn contains_point(&self, p: &Point) -> bool {
        self.polygons
            .iter()
            .map(|poly| poly.winding_number(p))
            .sum::<i32>()
            != 0
    }

    pub fn transformed(&self, transform: &Transform) -> PolygonSet {
        Self {
            polygons: self
                .polygons
                .iter()
                .filter_map(|p| p.transformed(transform))
                .collect(),
        }
    }

    pub fn translated(&self, dx: f64, dy: f64) -> PolygonSet {
        Self {
            polygons: self
                .polygons
                .iter()
                .map(|p| p.translated(dx, dy))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a PolygonSet {
    type Item = &'a Polygon;
    type IntoIter = std::slice::Iter<'a, Polygon>;

    fn into_iter(self) -> Self::IntoIter {
        self.polygons.iter()
    }
}

impl FromIterator<Polygon> for PolygonSet {
    fn from_iter<T: IntoIterator<Item = Polygon>>(iter: T) -> Self {
        Self {
            polygons: iter.into_iter().collect(),
        }
    }
}
