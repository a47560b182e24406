//! Detection, classification and health collaborators.
//!
//! The pipeline only sees the traits below. Live and stand-in implementations
//! are chosen once, when the registry is built, and the detector's operating
//! mode is carried explicitly so it can be reported to clients.

pub mod hosted;
pub mod stand_in;

use crate::config::Config;
use crate::error::AppError;
use crate::postprocess::detection::RawDetection;
use async_trait::async_trait;
use image::RgbImage;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub use hosted::HostedDetector;
pub use stand_in::{HashClassifier, StandInDetector, StandInHealthEstimator};

/// Health attribute name to value, e.g. `"hollow": "no"`, `"dried_branches_percent": 20`.
pub type HealthAttributes = BTreeMap<String, serde_json::Value>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Detector: Send + Sync {
    fn name(&self) -> &'static str;

    async fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, AppError>;

    /// Check that the backing service answers. Local implementations are always reachable.
    async fn probe(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn predict_species(&self, region: &RgbImage) -> Result<String, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze_health(
        &self,
        region: &RgbImage,
        object_type: &str,
    ) -> Result<HealthAttributes, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorMode {
    /// Backed by the hosted inference API.
    Live,
    /// Stand-in detections; no live service is in use.
    Degraded,
}

/// Run a collaborator call under `limit`, turning a timeout into `CollaboratorUnavailable`.
pub async fn bounded<T, F>(what: &str, limit: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::CollaboratorUnavailable(format!(
            "{what} timed out after {}s",
            limit.as_secs_f64()
        ))),
    }
}

/// The detector together with its operating mode.
pub struct DetectorHandle {
    mode: DetectorMode,
    endpoint: Option<String>,
    primary: Arc<dyn Detector>,
    fallback: Option<Arc<dyn Detector>>,
}

impl DetectorHandle {
    pub fn live(endpoint: String, detector: Arc<dyn Detector>) -> Self {
        Self {
            mode: DetectorMode::Live,
            endpoint: Some(endpoint),
            primary: detector,
            fallback: None,
        }
    }

    pub fn degraded(detector: Arc<dyn Detector>) -> Self {
        Self {
            mode: DetectorMode::Degraded,
            endpoint: None,
            primary: detector,
            fallback: None,
        }
    }

    /// Substitute `fallback` when the primary detector fails.
    pub fn with_fallback(mut self, fallback: Arc<dyn Detector>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn mode(&self) -> DetectorMode {
        self.mode
    }

    pub fn name(&self) -> &'static str {
        self.primary.name()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback.is_some()
    }

    pub async fn probe(&self, limit: Duration) -> Result<(), AppError> {
        bounded("detector probe", limit, self.primary.probe()).await
    }

    /// Detect objects, reporting which mode actually produced the result.
    pub async fn detect(
        &self,
        image: &RgbImage,
        limit: Duration,
    ) -> Result<(Vec<RawDetection>, DetectorMode), AppError> {
        match bounded("detector", limit, self.primary.detect(image)).await {
            Ok(detections) => Ok((detections, self.mode)),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    warn!(
                        error = %err,
                        detector = self.primary.name(),
                        fallback = fallback.name(),
                        "Detector failed; substituting stand-in detections"
                    );
                    let detections = bounded("fallback detector", limit, fallback.detect(image)).await?;
                    Ok((detections, DetectorMode::Degraded))
                }
                None => Err(err),
            },
        }
    }
}

/// Process-wide model handles, read-only once built.
pub struct ModelRegistry {
    pub detector: DetectorHandle,
    pub classifier: Arc<dyn Classifier>,
    pub health: Arc<dyn HealthEstimator>,
    pub call_timeout: Duration,
}

impl ModelRegistry {
    /// Stand-in models everywhere.
    pub fn stand_in(call_timeout: Duration) -> Self {
        Self {
            detector: DetectorHandle::degraded(Arc::new(StandInDetector::default())),
            classifier: Arc::new(HashClassifier::default()),
            health: Arc::new(StandInHealthEstimator),
            call_timeout,
        }
    }

    /// Build the registry, going live only if the hosted detector is configured and answers.
    pub async fn from_config(config: &Config) -> Self {
        let mut registry = Self::stand_in(config.model_timeout);

        let Some(url) = config.detector_url.clone() else {
            warn!("DETECTOR_URL not set; detector running in degraded stand-in mode");
            return registry;
        };

        let hosted = match HostedDetector::new(
            url.clone(),
            config.detector_api_key.clone(),
            config.model_timeout,
        ) {
            Ok(hosted) => hosted,
            Err(e) => {
                warn!(error = %e, "Hosted detector client failed to build; using stand-in detector");
                return registry;
            }
        };

        if let Err(e) = bounded("detector probe", config.model_timeout, hosted.probe()).await {
            warn!(error = %e, endpoint = %url, "Hosted detector unreachable; using stand-in detector");
            return registry;
        }

        let mut handle = DetectorHandle::live(url.clone(), Arc::new(hosted));
        if config.detector_fallback {
            handle = handle.with_fallback(Arc::new(StandInDetector::default()));
        }
        info!(endpoint = %url, fallback = config.detector_fallback, "Hosted detector live");

        registry.detector = handle;
        registry
    }
}
