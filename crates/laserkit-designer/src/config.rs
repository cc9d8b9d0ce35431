//! Build configuration.
//!
//! [`BuildParams`] is the raw, possibly partial input as it arrives over the
//! wire. [`BuildConfig::validate`] is the single place where it is checked
//! and clamped into the immutable [`BuildConfig`] that flows through the
//! pipeline. Only non-finite numbers are rejected; everything else is
//! clamped into range with a warning.

use laserkit_core::ConfigError;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::attachment::{AttachmentKind, AttachmentSpec};
use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::offset::OffsetStrategy;

/// Smallest clearance the laser can safely cut around content.
pub const MIN_OFFSET_MM: f64 = 1.0;
pub const DEFAULT_OFFSET_MM: f64 = 3.0;

pub const DEFAULT_ARC_TOLERANCE_MM: f64 = 0.1;
pub const ARC_TOLERANCE_RANGE_MM: (f64, f64) = (0.01, 2.0);

pub const DEFAULT_FLATTEN_TOLERANCE_MM: f64 = 0.25;
pub const FLATTEN_TOLERANCE_RANGE_MM: (f64, f64) = (0.01, 5.0);

pub const DEFAULT_MARGIN_MM: f64 = 1.0;

/// Thinnest wall left between the ring hole and the ring edge.
pub const DEFAULT_MIN_WALL_MM: f64 = 2.0;
pub const MIN_WALL_FLOOR_MM: f64 = 0.5;
/// Smallest hole a keyring can go through.
pub const MIN_HOLE_RADIUS_MM: f64 = 0.5;
pub const DEFAULT_OVERLAP_MM: f64 = 1.0;

/// Default number of decimals in emitted path data.
pub const DEFAULT_PRECISION: u32 = 3;
pub const MAX_PRECISION: u32 = 12;

/// Raw build parameters. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildParams {
    /// Clearance grown around the content (mm)
    pub offset_mm: f64,
    /// Maximum deviation of round joins and ring discs (mm)
    pub arc_tolerance_mm: f64,
    /// Curve flattening tolerance (mm)
    pub flatten_tolerance_mm: f64,
    /// Distance of the recentered outline from the origin (mm)
    pub margin_mm: f64,
    /// Minimum ring wall thickness (mm)
    pub min_wall_mm: f64,
    /// Optional keyring attachment
    pub attachment: Option<AttachmentSpec>,
    /// Decimals in emitted path data, `None` for full precision
    pub precision: Option<u32>,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            offset_mm: DEFAULT_OFFSET_MM,
            arc_tolerance_mm: DEFAULT_ARC_TOLERANCE_MM,
            flatten_tolerance_mm: DEFAULT_FLATTEN_TOLERANCE_MM,
            margin_mm: DEFAULT_MARGIN_MM,
            min_wall_mm: DEFAULT_MIN_WALL_MM,
            attachment: None,
            precision: Some(DEFAULT_PRECISION),
        }
    }
}

/// Validated, immutable configuration for one build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub offset_mm: f64,
    pub arc_tolerance_mm: f64,
    pub flatten_tolerance_mm: f64,
    pub margin_mm: f64,
    pub min_wall_mm: f64,
    pub attachment: Option<AttachmentSpec>,
    pub precision: Option<u32>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            offset_mm: DEFAULT_OFFSET_MM,
            arc_tolerance_mm: DEFAULT_ARC_TOLERANCE_MM,
            flatten_tolerance_mm: DEFAULT_FLATTEN_TOLERANCE_MM,
            margin_mm: DEFAULT_MARGIN_MM,
            min_wall_mm: DEFAULT_MIN_WALL_MM,
            attachment: None,
            precision: Some(DEFAULT_PRECISION),
        }
    }
}

fn finite(name: &str, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConfigError::NonFinite {
            name: name.to_string(),
            value,
        })
    }
}

fn clamp_logged(name: &str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("Clamped {} from {} to {}", name, value, clamped);
    }
    clamped
}

impl BuildConfig {
    /// Validates and clamps raw parameters.
    pub fn validate(params: &BuildParams) -> Result<Self, ConfigError> {
        let offset_mm = clamp_logged(
            "offsetMm",
            finite("offsetMm", params.offset_mm)?,
            MIN_OFFSET_MM,
            f64::MAX,
        );
        let arc_tolerance_mm = clamp_logged(
            "arcToleranceMm",
            finite("arcToleranceMm", params.arc_tolerance_mm)?,
            ARC_TOLERANCE_RANGE_MM.0,
            ARC_TOLERANCE_RANGE_MM.1,
        );
        let flatten_tolerance_mm = clamp_logged(
            "flattenToleranceMm",
            finite("flattenToleranceMm", params.flatten_tolerance_mm)?,
            FLATTEN_TOLERANCE_RANGE_MM.0,
            FLATTEN_TOLERANCE_RANGE_MM.1,
        );
        let margin_mm = clamp_logged(
            "marginMm",
            finite("marginMm", params.margin_mm)?,
            0.0,
            f64::MAX,
        );
        let min_wall_mm = clamp_logged(
            "minWallMm",
            finite("minWallMm", params.min_wall_mm)?,
            MIN_WALL_FLOOR_MM,
            f64::MAX,
        );

        let attachment = match &params.attachment {
            Some(spec) => Some(validate_ring(spec, min_wall_mm)?),
            None => None,
        };

        if let Some(precision) = params.precision {
            if precision > MAX_PRECISION {
                return Err(ConfigError::OutOfRange {
                    name: "precision".to_string(),
                    value: precision as f64,
                    min: 0.0,
                    max: MAX_PRECISION as f64,
                });
            }
        }

        Ok(Self {
            offset_mm,
            arc_tolerance_mm,
            flatten_tolerance_mm,
            margin_mm,
            min_wall_mm,
            attachment,
            precision: params.precision,
        })
    }
}

/// Clamps a ring so the hole always leaves `min_wall_mm` of material.
///
/// Guarantees `2 * inner <= 2 * outer - 2 * min_wall`.
pub fn validate_ring(spec: &AttachmentSpec, min_wall_mm: f64) -> Result<AttachmentSpec, ConfigError> {
    let outer = finite("outerRadiusMm", spec.outer_radius_mm)?;
    let inner = finite("innerRadiusMm", spec.inner_radius_mm)?;
    let overlap = finite("overlapMm", spec.overlap_mm)?;

    let outer_radius_mm = clamp_logged(
        "outerRadiusMm",
        outer,
        min_wall_mm + MIN_HOLE_RADIUS_MM,
        f64::MAX,
    );
    let inner_radius_mm = clamp_logged(
        "innerRadiusMm",
        inner,
        MIN_HOLE_RADIUS_MM,
        (outer_radius_mm - min_wall_mm).max(MIN_HOLE_RADIUS_MM),
    );
    let overlap_mm = clamp_logged(
        "overlapMm",
        overlap,
        0.0,
        (outer_radius_mm - inner_radius_mm).max(0.0),
    );

    Ok(AttachmentSpec {
        kind: AttachmentKind::Ring,
        outer_radius_mm,
        inner_radius_mm,
        position: spec.position,
        overlap_mm,
    })
}

/// Settings of the geometry service, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Maximum number of cached boolean/offset results
    pub cache_capacity: usize,
    /// Offset backend wiring
    #[serde(skip)]
    pub offset_strategy: OffsetStrategy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            offset_strategy: OffsetStrategy::default(),
        }
    }
}
