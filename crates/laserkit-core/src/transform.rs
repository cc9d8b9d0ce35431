//! Affine placement of path contributions.
//!
//! Every contribution is placed in the shared frame by one 3x3 homogeneous
//! matrix, multiplied once per emitted point.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// A 2D affine transform in homogeneous coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    matrix: Matrix3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    pub fn from_matrix(matrix: Matrix3<f64>) -> Self {
        Self { matrix }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::from_matrix(Matrix3::new(
            1.0, 0.0, tx, //
            0.0, 1.0, ty, //
            0.0, 0.0, 1.0,
        ))
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::from_matrix(Matrix3::new(
            sx, 0.0, 0.0, //
            0.0, sy, 0.0, //
            0.0, 0.0, 1.0,
        ))
    }

    /// Rotation about the origin, positive angles turn +x towards +y.
    pub fn rotation_deg(angle_deg: f64) -> Self {
        let (sin_a, cos_a) = angle_deg.to_radians().sin_cos();
        Self::from_matrix(Matrix3::new(
            cos_a, -sin_a, 0.0, //
            sin_a, cos_a, 0.0, //
            0.0, 0.0, 1.0,
        ))
    }

    /// Scale first, then translate.
    pub fn scale_translate(sx: f64, sy: f64, tx: f64, ty: f64) -> Self {
        Self::scale(sx, sy).then(&Self::translation(tx, ty))
    }

    /// Returns the transform that applies `self` first and `next` second.
    pub fn then(&self, next: &Transform) -> Transform {
        Transform::from_matrix(next.matrix * self.matrix)
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    pub fn apply(&self, p: Point) -> Point {
        let v = self.matrix * Vector3::new(p.x, p.y, 1.0);
        Point::new(v.x, v.y)
    }

    /// Average linear scale factor, `sqrt(|det|)` of the 2x2 part.
    pub fn linear_scale(&self) -> f64 {
        let m = &self.matrix;
        (m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)]).abs().sqrt()
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix3::identity()
    }
}

/// Placement of one path contribution: scale, then translate (mm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PathTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Default for PathTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl PathTransform {
    pub fn new(scale_x: f64, scale_y: f64, translate_x: f64, translate_y: f64) -> Self {
        Self {
            scale_x,
            scale_y,
            translate_x,
            translate_y,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.scale_x.is_finite()
            && self.scale_y.is_finite()
            && self.translate_x.is_finite()
            && self.translate_y.is_finite()
    }

    pub fn to_transform(&self) -> Transform {
        Transform::scale_translate(
            self.scale_x,
            self.scale_y,
            self.translate_x,
            self.translate_y,
        )
    }
}

impl From<PathTransform> for Transform {
    fn from(t: PathTransform) -> Self {
        t.to_transform()
    }
}
