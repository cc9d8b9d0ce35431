//! # Outline Composer
//!
//! Turns a list of placed path contributions into one laser-safe cut
//! contour:
//!
//! 1. **Flatten** every contribution in the shared frame
//! 2. **Union** the rings into the silhouette (engrave layer)
//! 3. **Offset** the silhouette outward into the outline (cut layer)
//! 4. **Attach** the optional keyring ring
//! 5. **Recenter** at a fixed margin and serialize
//!
//! Whenever a stage yields bounds that are non-finite or without area the
//! boolean pipeline is abandoned and a rounded placeholder sized from the
//! pre-boolean content is emitted instead. Geometry problems never surface
//! as errors; they are reported as [`Diagnostic`]s.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use laserkit_core::{
    BoundingBox, BuildError, Diagnostic, GeometryError, PathTransform, PolygonSet, Rect,
    VERTEX_EPSILON,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::attachment::attach_ring;
use crate::backend::{GeometryBackend, GeometryService};
use crate::cache::{fingerprint_str, GeometryCache, GeometryCacheKey, GeometryOp};
use crate::config::{BuildConfig, BuildParams};
use crate::path::flatten_report;
use crate::svg::{polygon_set_to_path, rounded_rect_path};

/// One path placed into the shared frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathContribution {
    /// Path data (`d` attribute syntax)
    pub path: String,
    /// Scale then translate into the shared frame (mm)
    #[serde(default)]
    pub transform: PathTransform,
}

impl PathContribution {
    pub fn new(path: impl Into<String>, transform: PathTransform) -> Self {
        Self {
            path: path.into(),
            transform,
        }
    }

    /// Contribution used as is, without placement.
    pub fn untransformed(path: impl Into<String>) -> Self {
        Self::new(path, PathTransform::default())
    }
}

/// Everything needed for one build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineRequest {
    pub contributions: Vec<PathContribution>,
    pub params: BuildParams,
}

/// Terminal state of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BuildStatus {
    Success,
    Fallback { reason: String },
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Serialized layers of a build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineResult {
    pub status: BuildStatus,
    /// Cut layer path data
    pub cut_path: String,
    /// Engrave layer path data
    pub engrave_path: String,
    /// Bounding box of the cut layer (mm)
    pub bounds: Rect,
    pub diagnostics: Vec<Diagnostic>,
    /// Cut layer geometry
    #[serde(skip)]
    pub outline: PolygonSet,
    /// Engrave layer geometry
    #[serde(skip)]
    pub silhouette: PolygonSet,
}

/// Translates `set` so its bounding box minimum sits at `(margin, margin)`.
///
/// Applying it to an already recentered set changes nothing.
pub fn recenter(set: &PolygonSet, margin_mm: f64) -> PolygonSet {
    let Some(bounds) = set.bounds() else {
        return set.clone();
    };
    let dx = margin_mm - bounds.min_x;
    let dy = margin_mm - bounds.min_y;
    if dx.abs() <= VERTEX_EPSILON && dy.abs() <= VERTEX_EPSILON {
        return set.clone();
    }
    set.translated(dx, dy)
}

/// Monotonic build counter for callers that must drop stale results.
///
/// The engine itself never consults it.
#[derive(Debug, Default)]
pub struct BuildGenerations {
    current: AtomicU64,
}

impl BuildGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation and returns its number.
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// True when no newer generation has started since `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// Builds outlines on top of a [`GeometryService`].
#[derive(Debug, Clone)]
pub struct OutlineComposer {
    service: Arc<GeometryService>,
}

impl OutlineComposer {
    pub fn new(service: Arc<GeometryService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<GeometryService> {
        &self.service
    }

    /// Validates the parameters, makes sure the backend is loaded and runs
    /// the pipeline.
    ///
    /// Only configuration and backend initialization errors are returned.
    pub async fn build(&self, request: &OutlineRequest) -> Result<OutlineResult, BuildError> {
        let config = BuildConfig::validate(&request.params)?;
        let backend = self.service.ensure_ready().await?;
        Ok(build_with_backend(
            &backend,
            self.service.cache(),
            &request.contributions,
            &config,
        ))
    }
}

struct Stages {
    diagnostics: Vec<Diagnostic>,
}

impl Stages {
    fn record(&mut self, stage: &str, error: GeometryError) {
        warn!("[{}] {}", stage, error);
        self.diagnostics.push(Diagnostic::new(stage, error));
    }

    /// Returns the bounds of `set` or records why they are unusable.
    fn checked_bounds(&mut self, stage: &str, set: &PolygonSet) -> Option<BoundingBox> {
        let problem = match set.bounds() {
            None => "no geometry".to_string(),
            Some(bounds) => match bounds.validity_problem() {
                None => return Some(bounds),
                Some(problem) => problem,
            },
        };
        self.record(
            stage,
            GeometryError::InvalidBounds {
                stage: stage.to_string(),
                reason: problem,
            },
        );
        None
    }
}

fn flatten_key(contribution: &PathContribution, tolerance: f64) -> GeometryCacheKey {
    let t = &contribution.transform;
    GeometryCacheKey::new(
        GeometryOp::Flatten,
        &[
            fingerprint_str(&contribution.path),
            t.scale_x.to_bits(),
            t.scale_y.to_bits(),
            t.translate_x.to_bits(),
            t.translate_y.to_bits(),
        ],
        tolerance,
    )
}

/// Runs the pipeline synchronously with an already loaded backend.
pub fn build_with_backend(
    backend: &GeometryBackend,
    cache: &Arc<GeometryCache>,
    contributions: &[PathContribution],
    config: &BuildConfig,
) -> OutlineResult {
    let span = info_span!("outline_build", contributions = contributions.len());
    let _enter = span.enter();

    let boolean = backend.boolean_engine(cache);
    let offset = backend.offset_engine(cache);
    let mut stages = Stages {
        diagnostics: Vec::new(),
    };

    debug!("Stage: flatten");
    let mut content: Vec<PolygonSet> = Vec::with_capacity(contributions.len());
    for (index, contribution) in contributions.iter().enumerate() {
        if !contribution.transform.is_finite() {
            stages.record(
                "flatten",
                GeometryError::parse(format!(
                    "contribution {} has a non-finite transform and was skipped",
                    index
                )),
            );
            continue;
        }
        let key = flatten_key(contribution, config.flatten_tolerance_mm);
        if let Some(hit) = cache.get(&key) {
            if !hit.is_empty() {
                content.push((*hit).clone());
            }
            continue;
        }
        let report = flatten_report(
            &contribution.path,
            config.flatten_tolerance_mm,
            &contribution.transform.to_transform(),
        );
        // Only clean results are cached so diagnostics repeat on every build
        if report.diagnostics.is_empty() {
            cache.insert(key, Arc::new(report.polygons.clone()));
        }
        for error in report.diagnostics {
            stages.record("flatten", error);
        }
        if !report.polygons.is_empty() {
            content.push(report.polygons);
        }
    }
    let content_bounds = content
        .iter()
        .filter_map(PolygonSet::bounds)
        .reduce(|a, b| a.union(&b))
        .filter(BoundingBox::is_finite);

    if content.is_empty() {
        return fallback(stages, config, content_bounds, &content, "no geometry");
    }

    debug!("Stage: union ({} contributions)", content.len());
    let refs: Vec<&PolygonSet> = content.iter().collect();
    let union = boolean.union(&refs);
    if let Some(error) = union.error {
        stages.record("union", error);
    }
    let silhouette = union.polygons;
    if stages.checked_bounds("union", &silhouette).is_none() {
        return fallback(stages, config, content_bounds, &content, "invalid silhouette");
    }

    debug!("Stage: offset ({}mm)", config.offset_mm);
    let grown = offset.offset(&silhouette, config.offset_mm, config.arc_tolerance_mm);
    if let Some(error) = grown.error {
        stages.record("offset", error);
    }
    let mut outline = grown.polygons;
    if stages.checked_bounds("offset", &outline).is_none() {
        return fallback(stages, config, content_bounds, &content, "invalid outline");
    }

    if let Some(spec) = &config.attachment {
        debug!("Stage: attach ring ({:?})", spec.position);
        let attached = attach_ring(&boolean, &outline, spec, config.arc_tolerance_mm);
        if let Some(error) = attached.error {
            stages.record("attach", error);
        }
        outline = attached.polygons;
        if stages.checked_bounds("attach", &outline).is_none() {
            return fallback(stages, config, content_bounds, &content, "invalid ring");
        }
    }

    debug!("Stage: recenter");
    let Some(before) = outline.bounds() else {
        return fallback(stages, config, content_bounds, &content, "invalid outline");
    };
    let outline = recenter(&outline, config.margin_mm);
    let Some(bounds) = stages.checked_bounds("recenter", &outline) else {
        return fallback(stages, config, content_bounds, &content, "invalid recentered outline");
    };
    // The engrave layer moves with the cut layer
    let silhouette = silhouette.translated(bounds.min_x - before.min_x, bounds.min_y - before.min_y);

    info!(
        "Outline built: {} rings, {:.3}x{:.3}mm, {} diagnostics",
        outline.len(),
        bounds.width(),
        bounds.height(),
        stages.diagnostics.len()
    );

    OutlineResult {
        status: BuildStatus::Success,
        cut_path: polygon_set_to_path(&outline, config.precision),
        engrave_path: polygon_set_to_path(&silhouette, config.precision),
        bounds: bounds.to_rect(),
        diagnostics: stages.diagnostics,
        outline,
        silhouette,
    }
}

/// Placeholder rectangle at `(margin, margin)` of size
/// `content + 2 * offset`, corners rounded by `min(offset, w/2, h/2)`.
pub fn placeholder_bounds(config: &BuildConfig, content: Option<&BoundingBox>) -> Rect {
    let (w, h) = content.map_or((0.0, 0.0), |b| (b.width(), b.height()));
    Rect::new(
        config.margin_mm,
        config.margin_mm,
        w + 2.0 * config.offset_mm,
        h + 2.0 * config.offset_mm,
    )
}

fn fallback(
    stages: Stages,
    config: &BuildConfig,
    content_bounds: Option<BoundingBox>,
    content: &[PolygonSet],
    reason: &str,
) -> OutlineResult {
    let bounds = placeholder_bounds(config, content_bounds.as_ref());
    let radius = config.offset_mm.min(bounds.width / 2.0).min(bounds.height / 2.0);
    let cut_path = rounded_rect_path(&bounds, radius, config.precision);

    let silhouette = match content_bounds {
        Some(cb) => {
            let dx = bounds.x + config.offset_mm - cb.min_x;
            let dy = bounds.y + config.offset_mm - cb.min_y;
            content
                .iter()
                .flat_map(|set| set.translated(dx, dy).into_polygons())
                .collect()
        }
        None => PolygonSet::empty(),
    };

    warn!(
        "Outline build fell back to placeholder ({}): {:.3}x{:.3}mm",
        reason, bounds.width, bounds.height
    );

    OutlineResult {
        status: BuildStatus::Fallback {
            reason: reason.to_string(),
        },
        cut_path,
        engrave_path: polygon_set_to_path(&silhouette, config.precision),
        bounds,
        diagnostics: stages.diagnostics,
        outline: PolygonSet::empty(),
        silhouette,
    }
}
