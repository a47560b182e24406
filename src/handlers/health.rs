/// Liveness and diagnostics: /, /health and /model-status

use super::AppState;
use crate::models::DetectorMode;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Tree Analysis API Server",
        "status": "running",
        "docs": "/api/v1/test",
        "health": "/api/v1/health"
    }))
}

/// GET /health - static liveness payload, independent of the models
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Tree analysis server is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Serialize)]
pub struct DetectorStatus {
    pub mode: DetectorMode,
    pub name: &'static str,
    pub endpoint: Option<String>,
    pub fallback_enabled: bool,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub detector: DetectorStatus,
    pub classifier: &'static str,
    pub health_estimator: &'static str,
}

/// GET /model-status
pub async fn model_status(State(state): State<Arc<AppState>>) -> Json<ModelStatus> {
    let models = state.models().await;
    let detector = &models.detector;
    let reachable = detector.probe(models.call_timeout).await.is_ok();

    Json(ModelStatus {
        detector: DetectorStatus {
            mode: detector.mode(),
            name: detector.name(),
            endpoint: detector.endpoint().map(str::to_string),
            fallback_enabled: detector.fallback_enabled(),
            reachable,
        },
        classifier: models.classifier.name(),
        health_estimator: models.health.name(),
    })
}
