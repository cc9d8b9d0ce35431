//! Elliptical arc sampling (endpoint to center parameterization).
//!
//! Follows the SVG implementation notes (F.6.5 / F.6.6): rotate into the
//! ellipse frame, scale the radii up when the endpoints are unreachable,
//! pick the center from the large-arc and sweep flags, then sample the
//! angle uniformly.

use std::f64::consts::TAU;

use laserkit_core::Point;

/// Center parameterization of an SVG arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterArc {
    pub center: Point,
    pub rx: f64,
    pub ry: f64,
    /// X axis rotation in radians.
    pub phi: f64,
    /// Start angle in radians.
    pub theta1: f64,
    /// Signed sweep in radians.
    pub delta: f64,
}

impl CenterArc {
    /// Point on the ellipse at parameter angle `theta`.
    pub fn point_at(&self, theta: f64) -> Point {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        // [x;y] = [cx;cy] + R(phi) * [rx*cos; ry*sin]
        Point::new(
            self.center.x + cos_phi * self.rx * cos_t - sin_phi * self.ry * sin_t,
            self.center.y + sin_phi * self.rx * cos_t + cos_phi * self.ry * sin_t,
        )
    }

    /// Approximate length used to size the sampling.
    pub fn approximate_length(&self) -> f64 {
        self.delta.abs() * self.rx.max(self.ry)
    }
}

fn angle_between(u: (f64, f64), v: (f64, f64)) -> f64 {
    let dot = u.0 * v.0 + u.1 * v.1;
    let det = u.0 * v.1 - u.1 * v.0;
    det.atan2(dot)
}

/// Converts endpoint parameters to center parameters.
///
/// Returns `None` when the arc degenerates to a straight line (a zero
/// radius) or to nothing (identical endpoints).
pub fn endpoint_to_center(
    from: Point,
    to: Point,
    rx: f64,
    ry: f64,
    x_axis_rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
) -> Option<CenterArc> {
    if from.distance_to(&to) <= f64::EPSILON {
        return None;
    }
    let mut rx = rx.abs();
    let mut ry = ry.abs();
    if rx < f64::EPSILON || ry < f64::EPSILON {
        return None;
    }

    let phi = x_axis_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    // Step 1: Compute (x1', y1')
    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    // Step 2: Ensure radii are large enough
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let scale = lambda.sqrt();
        rx *= scale;
        ry *= scale;
    }

    // Step 3: Compute (cx', cy')
    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let x1p2 = x1p * x1p;
    let y1p2 = y1p * y1p;
    let denom = rx2 * y1p2 + ry2 * x1p2;
    if denom.abs() < f64::EPSILON {
        return None;
    }

    // Clamped: after the radius correction the numerator may dip below 0
    let numer = (rx2 * ry2 - rx2 * y1p2 - ry2 * x1p2).max(0.0);
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (numer / denom).sqrt();
    let cxp = coef * (rx * y1p / ry);
    let cyp = coef * (-ry * x1p / rx);

    // Step 4: Compute (cx, cy)
    let cx = cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0;

    // Step 5: Angles
    let u = ((x1p - cxp) / rx, (y1p - cyp) / ry);
    let v = ((-x1p - cxp) / rx, (-y1p - cyp) / ry);
    let theta1 = angle_between((1.0, 0.0), u);
    let mut delta = angle_between(u, v) % TAU;

    if !sweep && delta > 0.0 {
        delta -= TAU;
    } else if sweep && delta < 0.0 {
        delta += TAU;
    }

    Some(CenterArc {
        center: Point::new(cx, cy),
        rx,
        ry,
        phi,
        theta1,
        delta,
    })
}

/// Samples `segments` uniform steps of the arc, excluding the start point
/// and ending exactly on `to`.
pub fn sample(arc: &CenterArc, to: Point, segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    let mut points = Vec::with_capacity(segments);
    for i in 1..segments {
        let t = i as f64 / segments as f64;
        points.push(arc.point_at(arc.theta1 + arc.delta * t));
    }
    points.push(to);
    points
}
