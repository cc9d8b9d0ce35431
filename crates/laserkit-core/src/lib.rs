//! # LaserKit Core
//!
//! Core types and the error taxonomy for LaserKit.
//! Provides the planar geometry values (points, rings, polygon sets,
//! bounding boxes), the affine transform used to place path contributions,
//! and the error and diagnostic types shared by every engine layer.

pub mod error;
pub mod geometry;
pub mod transform;

pub use error::{BuildError, ConfigError, Diagnostic, GeometryError, Result};
pub use geometry::{BoundingBox, Point, Polygon, PolygonSet, Rect, VERTEX_EPSILON};
pub use transform::{PathTransform, Transform};
