//! Backend lifecycle service.
//!
//! Owns at most one live handle to the polygon kernels and the shared
//! result cache. Initialization is single-flight: concurrent callers of
//! [`GeometryService::ensure_ready`] before the first load completes all
//! await the same load. A failed load leaves the service uninitialized so a
//! later call retries.

use std::sync::Arc;

use async_trait::async_trait;
use laserkit_core::{GeometryError, Polygon, PolygonSet};
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::cache::GeometryCache;
use crate::config::EngineSettings;
use crate::offset::{OffsetEngine, OffsetStrategy, PolygonOffsetBackend};
use crate::ops::{BooleanEngine, OverlayBackend, PolygonBooleanBackend};

/// Handle to the loaded polygon kernels.
#[derive(Clone)]
pub struct GeometryBackend {
    pub boolean: Arc<dyn PolygonBooleanBackend>,
    pub offset: Arc<dyn PolygonOffsetBackend>,
    pub offset_fallback: Option<Arc<dyn PolygonOffsetBackend>>,
}

impl std::fmt::Debug for GeometryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryBackend")
            .field("boolean", &self.boolean.name())
            .field("offset", &self.offset.name())
            .field(
                "offset_fallback",
                &self.offset_fallback.as_ref().map(|b| b.name()),
            )
            .finish()
    }
}

impl GeometryBackend {
    /// Native kernels wired for `strategy`.
    pub fn native(strategy: OffsetStrategy) -> Self {
        let boolean: Arc<dyn PolygonBooleanBackend> = Arc::new(OverlayBackend::new());
        let (offset, offset_fallback) = strategy.backends(boolean.clone());
        Self {
            boolean,
            offset,
            offset_fallback,
        }
    }

    /// Boolean engine over this backend, caching into `cache`.
    pub fn boolean_engine(&self, cache: &Arc<GeometryCache>) -> BooleanEngine {
        BooleanEngine::new(self.boolean.clone()).with_cache(cache.clone())
    }

    /// Offset engine over this backend, caching into `cache`.
    pub fn offset_engine(&self, cache: &Arc<GeometryCache>) -> OffsetEngine {
        OffsetEngine::new(self.offset.clone(), self.offset_fallback.clone())
            .with_cache(cache.clone())
    }
}

/// Produces a backend handle. Substitute a fake in tests.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Loads and verifies the kernels.
    async fn load(&self) -> Result<GeometryBackend, GeometryError>;
}

/// Loads the native kernels and checks them on a known case.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackendLoader {
    strategy: OffsetStrategy,
}

impl NativeBackendLoader {
    pub fn new(strategy: OffsetStrategy) -> Self {
        Self { strategy }
    }
}

/// Two overlapping unit squares must union to 1.75.
fn self_test(backend: &GeometryBackend) -> Result<(), GeometryError> {
    let square = |x: f64, y: f64| -> Result<PolygonSet, GeometryError> {
        Polygon::rectangle(x, y, 1.0, 1.0)
            .map(|p| PolygonSet::new(vec![p]))
            .ok_or_else(|| GeometryError::BackendUnavailable("self-test setup".into()))
    };
    let a = square(0.0, 0.0)?;
    let b = square(0.5, 0.5)?;
    let union = backend
        .boolean
        .union(&[&a, &b])
        .map_err(|e| GeometryError::BackendUnavailable(format!("self-test failed: {}", e)))?;
    if (union.area() - 1.75).abs() > 1e-9 {
        return Err(GeometryError::BackendUnavailable(format!(
            "self-test union area {} (expected 1.75)",
            union.area()
        )));
    }
    Ok(())
}

#[async_trait]
impl BackendLoader for NativeBackendLoader {
    async fn load(&self) -> Result<GeometryBackend, GeometryError> {
        let backend = GeometryBackend::native(self.strategy);
        self_test(&backend)?;
        Ok(backend)
    }
}

/// Explicit lifecycle object for the geometry kernels and result cache.
///
/// Constructed once by the application root and passed down.
pub struct GeometryService {
    loader: Arc<dyn BackendLoader>,
    cell: Mutex<Arc<OnceCell<GeometryBackend>>>,
    cache: Arc<GeometryCache>,
}

impl std::fmt::Debug for GeometryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryService")
            .field("ready", &self.is_ready())
            .field("cache_len", &self.cache.len())
            .finish()
    }
}

impl GeometryService {
    pub fn new(loader: Arc<dyn BackendLoader>, settings: EngineSettings) -> Self {
        Self {
            loader,
            cell: Mutex::new(Arc::new(OnceCell::new())),
            cache: Arc::new(GeometryCache::new(settings.cache_capacity)),
        }
    }

    /// Service backed by the native kernels.
    pub fn native(settings: EngineSettings) -> Self {
        Self::new(
            Arc::new(NativeBackendLoader::new(settings.offset_strategy)),
            settings,
        )
    }

    pub fn is_ready(&self) -> bool {
        self.cell.lock().initialized()
    }

    /// Loads the backend once; concurrent callers share the same load.
    pub async fn ensure_ready(&self) -> Result<GeometryBackend, GeometryError> {
        let cell = Arc::clone(&self.cell.lock());
        let loader = Arc::clone(&self.loader);
        let backend = cell
            .get_or_try_init(|| async move {
                debug!("Loading geometry backend");
                let backend = loader.load().await?;
                info!("Geometry backend ready: {:?}", backend);
                Ok::<_, GeometryError>(backend)
            })
            .await?;
        Ok(backend.clone())
    }

    /// Drops the backend handle and clears the cache.
    pub fn reset(&self) {
        *self.cell.lock() = Arc::new(OnceCell::new());
        self.cache.clear();
        debug!("Geometry service reset");
    }

    /// The loaded backend, if any.
    pub fn backend(&self) -> Option<GeometryBackend> {
        self.cell.lock().get().cloned()
    }

    pub fn cache(&self) -> &Arc<GeometryCache> {
        &self.cache
    }
}
