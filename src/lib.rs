//! # LaserKit
//!
//! Turns vector artwork into a single laser-safe outline: every contributed
//! path is flattened, the silhouettes are fused, the result is grown by a
//! clearance offset, an optional keyring ring is attached and the outline
//! is moved to a fixed margin from the origin.
//!
//! ## Architecture
//!
//! LaserKit is organized as a workspace with multiple crates:
//!
//! 1. **laserkit-core** - Geometry values, affine transforms, error taxonomy
//! 2. **laserkit-designer** - Path flattening, booleans, offsets, outline pipeline
//! 3. **laserkit** - Command line front end that integrates both crates
//!
//! ## Command line
//!
//! ```text
//! laserkit [--svg] [REQUEST.json]
//! ```
//!
//! Reads an [`OutlineRequest`] as JSON from the file or standard input and
//! writes the [`OutlineResult`] as JSON (or an SVG preview with `--svg`) to
//! standard output. Logs go to standard error.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

pub use laserkit_core::{
    BoundingBox, BuildError, ConfigError, Diagnostic, GeometryError, PathTransform, Point,
    Polygon, PolygonSet, Rect, Transform,
};
pub use laserkit_designer as designer;
pub use laserkit_designer::{
    render_layers, AttachmentSpec, BuildParams, BuildStatus, EngineSettings, GeometryService,
    OutlineComposer, OutlineRequest, OutlineResult, PathContribution, RingPosition,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Cargo profile the binary was built with
pub const BUILD_PROFILE: &str = env!("BUILD_PROFILE");

/// One-line version string for `--version`.
pub fn version_banner() -> String {
    format!("laserkit {} ({}, {})", VERSION, BUILD_DATE, BUILD_PROFILE)
}

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Output on stderr so stdout stays free for results
/// - RUST_LOG environment variable support
/// - JSON lines when `LASERKIT_LOG_JSON` is set
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if std::env::var_os("LASERKIT_LOG_JSON").is_some() {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_current_span(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to install the log subscriber")?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to install the log subscriber")?;
    }

    Ok(())
}

/// Parses a build request from JSON text.
pub fn parse_request(json: &str) -> anyhow::Result<OutlineRequest> {
    serde_json::from_str(json).context("Malformed outline request")
}

/// Reads a build request from `path`, or from stdin when `path` is `None`.
pub fn read_request(path: Option<&Path>) -> anyhow::Result<OutlineRequest> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read request from stdin")?;
            text
        }
    };
    parse_request(&text)
}

/// Runs one build on a native geometry service.
pub async fn run(request: &OutlineRequest) -> anyhow::Result<OutlineResult> {
    let service = Arc::new(GeometryService::native(EngineSettings::default()));
    let composer = OutlineComposer::new(service);
    let result = composer.build(request).await?;
    Ok(result)
}

/// Output form of the command line tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Svg,
}

/// Serializes `result` in the requested form.
pub fn render(result: &OutlineResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize outline result")
        }
        OutputFormat::Svg => Ok(render_layers(result)),
    }
}
