//! # LaserKit Designer
//!
//! The outline engine: turns arbitrary vector input (glyph outlines, icon
//! paths, traced silhouettes) into a single closed, laser-safe contour.
//!
//! ## Core Components
//!
//! - **Path**: tokenizer and flattener for path data (`M L H V C S Q T A Z`)
//! - **Ops**: union and difference under the non-zero winding rule
//! - **Offset**: growth and shrink with round joins
//! - **Attachment**: keyring ring fused onto the outline
//! - **Outline**: the composer running the whole pipeline with fallback
//! - **Backend**: single-flight kernel lifecycle and the LRU result cache
//! - **Svg**: `M/L/A/Z` path data and a layered preview document
//!
//! ## Architecture
//!
//! ```text
//! OutlineComposer
//!   ├── path::flatten        (per contribution, placed by one affine matrix)
//!   ├── BooleanEngine        (silhouette union, ring fusion)
//!   ├── OffsetEngine         (outline growth)
//!   └── GeometryService      (backend handle + GeometryCache)
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use laserkit_designer::{EngineSettings, GeometryService, OutlineComposer, OutlineRequest, PathContribution};
//!
//! let service = Arc::new(GeometryService::native(EngineSettings::default()));
//! let composer = OutlineComposer::new(service);
//! let request = OutlineRequest {
//!     contributions: vec![PathContribution::untransformed("M0 0 H10 V10 H0 Z")],
//!     ..Default::default()
//! };
//! let result = composer.build(&request).await?;
//! println!("{}", result.cut_path);
//! ```

pub mod attachment;
pub mod backend;
pub mod cache;
pub mod config;
pub mod offset;
pub mod ops;
pub mod outline;
pub mod path;
pub mod svg;

pub use attachment::{attach_ring, ring_center, AttachmentKind, AttachmentSpec, RingPosition};
pub use backend::{BackendLoader, GeometryBackend, GeometryService, NativeBackendLoader};
pub use cache::{
    fingerprint, fingerprint_str, CacheStats, GeometryCache, GeometryCacheKey, GeometryOp,
};
pub use config::{BuildConfig, BuildParams, EngineSettings};
pub use offset::{
    OffsetEngine, OffsetStrategy, ParallelOffsetBackend, PolygonOffsetBackend,
    StrokeUnionOffsetBackend,
};
pub use ops::{BooleanEngine, OpOutcome, OverlayBackend, PolygonBooleanBackend};
pub use outline::{
    build_with_backend, recenter, BuildGenerations, BuildStatus, OutlineComposer,
    OutlineRequest, OutlineResult, PathContribution,
};
pub use path::{flatten, flatten_report, flatten_with_transform, tokenize, PathCommand, PathReport};
pub use svg::{polygon_set_to_path, render_layers, rounded_rect_path, PathWriter};
