//! Integration tests for the geometry service lifecycle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use laserkit_core::{BuildError, GeometryError};
use laserkit_designer::{
    BackendLoader, BuildParams, EngineSettings, GeometryBackend, GeometryService, OffsetStrategy,
    OutlineComposer, OutlineRequest, PathContribution,
};

/// Counts loads and takes a while to finish each one.
struct SlowLoader {
    loads: AtomicUsize,
    fail: bool,
}

impl SlowLoader {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            loads: AtomicUsize::new(0),
            fail,
        })
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendLoader for SlowLoader {
    async fn load(&self) -> Result<GeometryBackend, GeometryError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            Err(GeometryError::BackendUnavailable("kernel missing".into()))
        } else {
            Ok(GeometryBackend::native(OffsetStrategy::default()))
        }
    }
}

fn request() -> OutlineRequest {
    OutlineRequest {
        contributions: vec![PathContribution::untransformed("M0 0 H10 V10 H0 Z")],
        params: BuildParams::default(),
    }
}

#[tokio::test]
async fn test_concurrent_ensure_ready_loads_once() {
    let loader = SlowLoader::new(false);
    let service = Arc::new(GeometryService::new(loader.clone(), EngineSettings::default()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.ensure_ready().await.is_ok() })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert_eq!(loader.loads(), 1);
    assert!(service.is_ready());
}

#[tokio::test]
async fn test_reset_forces_reload() {
    let loader = SlowLoader::new(false);
    let service = GeometryService::new(loader.clone(), EngineSettings::default());
    service.ensure_ready().await.unwrap();
    service.ensure_ready().await.unwrap();
    assert_eq!(loader.loads(), 1);

    service.reset();
    assert!(!service.is_ready());
    service.ensure_ready().await.unwrap();
    assert_eq!(loader.loads(), 2);
}

#[tokio::test]
async fn test_composer_reports_backend_failure() {
    let loader = SlowLoader::new(true);
    let service = Arc::new(GeometryService::new(loader.clone(), EngineSettings::default()));
    let composer = OutlineComposer::new(service.clone());

    let err = composer.build(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        BuildError::Backend(GeometryError::BackendUnavailable(_))
    ));
    assert!(!service.is_ready());

    // Every build retries the load
    let _ = composer.build(&request()).await;
    assert_eq!(loader.loads(), 2);
}

#[tokio::test]
async fn test_composer_rejects_non_finite_params() {
    let loader = SlowLoader::new(false);
    let composer = OutlineComposer::new(Arc::new(GeometryService::new(
        loader.clone(),
        EngineSettings::default(),
    )));
    let mut req = request();
    req.params.offset_mm = f64::NAN;

    let err = composer.build(&req).await.unwrap_err();
    assert!(matches!(err, BuildError::Config(_)));
    // Validation happens before the backend is touched
    assert_eq!(loader.loads(), 0);
}

#[tokio::test]
async fn test_composer_builds_and_populates_cache() {
    let service = Arc::new(GeometryService::native(EngineSettings::default()));
    let composer = OutlineComposer::new(service.clone());

    let first = composer.build(&request()).await.unwrap();
    assert!(first.status.is_success());
    assert!(!service.cache().is_empty());

    let second = composer.build(&request()).await.unwrap();
    assert_eq!(first, second);
    assert!(service.cache().stats().hits > 0);
}

#[tokio::test]
async fn test_cache_capacity_is_respected() {
    let settings = EngineSettings {
        cache_capacity: 3,
        ..Default::default()
    };
    let service = Arc::new(GeometryService::native(settings));
    let composer = OutlineComposer::new(service.clone());
    for i in 0..10 {
        let req = OutlineRequest {
            contributions: vec![PathContribution::untransformed(format!(
                "M0 0 H{} V10 H0 Z",
                10 + i
            ))],
            params: BuildParams::default(),
        };
        composer.build(&req).await.unwrap();
    }
    assert!(service.cache().len() <= 3);
}
