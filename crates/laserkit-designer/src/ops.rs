//! Boolean operations on polygon sets.
//!
//! One backend trait with one production implementation. Every operation
//! reads its operands under the non-zero winding rule and returns rings
//! oriented outer-positive, hole-negative.

use std::sync::Arc;

use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use laserkit_core::{GeometryError, Polygon, PolygonSet, Result};
use tracing::{trace, warn};

use crate::cache::{fingerprint, GeometryCache, GeometryCacheKey, GeometryOp};

/// Area below which a polygon set counts as having no area at all.
pub const AREA_EPSILON: f64 = 1e-12;

/// A polygon clipping kernel.
pub trait PolygonBooleanBackend: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Union of every operand. Order must not matter beyond numeric noise.
    fn union(&self, operands: &[&PolygonSet]) -> Result<PolygonSet>;

    /// `subject` minus `clip`.
    fn difference(&self, subject: &PolygonSet, clip: &PolygonSet) -> Result<PolygonSet>;

    /// Resolves self-overlap of one operand and fixes ring orientation.
    fn normalize(&self, set: &PolygonSet) -> Result<PolygonSet>;
}

type Contours = Vec<Vec<[f64; 2]>>;
type Shapes = Vec<Vec<Vec<[f64; 2]>>>;

fn to_contours(set: &PolygonSet) -> Contours {
    set.iter()
        .map(|poly| poly.points().iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Converts overlay shapes (outer contour first, then holes) to a set.
fn from_shapes(shapes: Shapes) -> PolygonSet {
    let mut set = PolygonSet::empty();
    for shape in shapes {
        for (index, contour) in shape.into_iter().enumerate() {
            let ring = contour.into_iter().map(Into::into).collect();
            if let Some(polygon) = Polygon::new(ring) {
                set.push(polygon.oriented(index == 0));
            }
        }
    }
    set
}

fn flatten_shapes(shapes: Shapes) -> Contours {
    shapes.into_iter().flatten().collect()
}

/// Boolean backend built on the `i_overlay` sweep-line kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayBackend;

impl OverlayBackend {
    pub fn new() -> Self {
        Self
    }

    fn run(subject: &Contours, clip: &Contours, rule: OverlayRule) -> Shapes {
        subject.overlay(clip, rule, FillRule::NonZero)
    }

    fn checked(operation: &str, set: PolygonSet) -> Result<PolygonSet> {
        if set.is_finite() {
            Ok(set)
        } else {
            Err(GeometryError::boolean(operation, "non-finite vertex in result"))
        }
    }
}

impl PolygonBooleanBackend for OverlayBackend {
    fn name(&self) -> &'static str {
        "i_overlay"
    }

    fn union(&self, operands: &[&PolygonSet]) -> Result<PolygonSet> {
        let mut live = operands.iter().filter(|set| !set.is_empty());
        let Some(first) = live.next() else {
            return Ok(PolygonSet::empty());
        };

        let empty = Contours::new();
        let mut shapes = Self::run(&to_contours(first), &empty, OverlayRule::Subject);
        for next in live {
            let acc = flatten_shapes(shapes);
            shapes = Self::run(&acc, &to_contours(next), OverlayRule::Union);
        }

        let result = from_shapes(shapes);
        if result.is_empty() {
            return Err(GeometryError::boolean(
                "union",
                "kernel returned no contours for non-empty operands",
            ));
        }
        Self::checked("union", result)
    }

    fn difference(&self, subject: &PolygonSet, clip: &PolygonSet) -> Result<PolygonSet> {
        if subject.is_empty() {
            return Ok(PolygonSet::empty());
        }
        let shapes = Self::run(
            &to_contours(subject),
            &to_contours(clip),
            OverlayRule::Difference,
        );
        Self::checked("difference", from_shapes(shapes))
    }

    fn normalize(&self, set: &PolygonSet) -> Result<PolygonSet> {
        if set.is_empty() {
            return Ok(PolygonSet::empty());
        }
        let shapes = Self::run(&to_contours(set), &Contours::new(), OverlayRule::Subject);
        let result = from_shapes(shapes);
        if result.is_empty() && set.area() > AREA_EPSILON {
            return Err(GeometryError::boolean(
                "normalize",
                "kernel returned no contours for a set with area",
            ));
        }
        Self::checked("normalize", result)
    }
}

/// Result of an engine call: always usable geometry, plus the error that
/// forced a degradation, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpOutcome {
    pub polygons: PolygonSet,
    pub error: Option<GeometryError>,
}

impl OpOutcome {
    pub fn ok(polygons: PolygonSet) -> Self {
        Self {
            polygons,
            error: None,
        }
    }

    pub fn degraded(polygons: PolygonSet, error: GeometryError) -> Self {
        Self {
            polygons,
            error: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_polygons(self) -> PolygonSet {
        self.polygons
    }
}

/// Boolean operations with the best-effort failure policy and result
/// caching.
///
/// A backend failure never reaches the caller as an error: the engine hands
/// back a copy of the first non-empty operand (the subject, for a
/// difference) and reports the failure in [`OpOutcome::error`].
#[derive(Clone)]
pub struct BooleanEngine {
    backend: Arc<dyn PolygonBooleanBackend>,
    cache: Option<Arc<GeometryCache>>,
}

impl std::fmt::Debug for BooleanEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooleanEngine")
            .field("backend", &self.backend.name())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

impl BooleanEngine {
    pub fn new(backend: Arc<dyn PolygonBooleanBackend>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<GeometryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn backend(&self) -> &Arc<dyn PolygonBooleanBackend> {
        &self.backend
    }

    fn cached(
        &self,
        key: GeometryCacheKey,
        compute: impl FnOnce() -> Result<PolygonSet>,
    ) -> Result<PolygonSet> {
        let Some(cache) = &self.cache else {
            return compute();
        };
        if let Some(hit) = cache.get(&key) {
            trace!("Boolean cache hit {:016x}", key.value());
            return Ok((*hit).clone());
        }
        let result = compute()?;
        cache.insert(key, Arc::new(result.clone()));
        Ok(result)
    }

    /// Union of every operand. Empty operands are ignored.
    pub fn union(&self, operands: &[&PolygonSet]) -> OpOutcome {
        let live: Vec<&PolygonSet> = operands.iter().copied().filter(|s| !s.is_empty()).collect();
        if live.is_empty() {
            return OpOutcome::ok(PolygonSet::empty());
        }

        let mut fingerprints: Vec<u64> = live.iter().map(|s| fingerprint(s)).collect();
        fingerprints.sort_unstable();
        let key = GeometryCacheKey::new(GeometryOp::Union, &fingerprints, 0.0);

        match self.cached(key, || self.backend.union(&live)) {
            Ok(result) => OpOutcome::ok(result),
            Err(err) => {
                warn!("{} ({}), keeping first operand", err, self.backend.name());
                OpOutcome::degraded(live[0].clone(), err)
            }
        }
    }

    /// `subject` minus `clip`.
    pub fn difference(&self, subject: &PolygonSet, clip: &PolygonSet) -> OpOutcome {
        if subject.is_empty() {
            return OpOutcome::ok(PolygonSet::empty());
        }
        if clip.is_empty() {
            return self.normalize(subject);
        }

        let key = GeometryCacheKey::new(
            GeometryOp::Difference,
            &[fingerprint(subject), fingerprint(clip)],
            0.0,
        );
        match self.cached(key, || self.backend.difference(subject, clip)) {
            Ok(result) => OpOutcome::ok(result),
            Err(err) => {
                warn!("{} ({}), keeping subject", err, self.backend.name());
                OpOutcome::degraded(subject.clone(), err)
            }
        }
    }

    /// Resolves self-overlap and orientation of one set.
    pub fn normalize(&self, set: &PolygonSet) -> OpOutcome {
        if set.is_empty() {
            return OpOutcome::ok(PolygonSet::empty());
        }
        let key = GeometryCacheKey::new(GeometryOp::Normalize, &[fingerprint(set)], 0.0);
        match self.cached(key, || self.backend.normalize(set)) {
            Ok(result) => OpOutcome::ok(result),
            Err(err) => {
                warn!("{} ({}), keeping input", err, self.backend.name());
                OpOutcome::degraded(set.clone(), err)
            }
        }
    }
}
