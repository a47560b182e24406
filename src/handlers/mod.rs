//! HTTP handlers and router.

pub mod analyze;
pub mod health;

use crate::config::Config;
use crate::error::AppError;
use crate::models::ModelRegistry;
use crate::postprocess::annotate::Annotator;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: Config,
    pub annotator: Annotator,
    models: OnceCell<ModelRegistry>,
}

impl AppState {
    /// Models are built from `config` on first use.
    pub fn new(config: Config) -> Result<Self, AppError> {
        Ok(Self {
            config,
            annotator: Annotator::new()?,
            models: OnceCell::new(),
        })
    }

    /// State with an already-built registry.
    pub fn with_models(config: Config, models: ModelRegistry) -> Result<Self, AppError> {
        Ok(Self {
            config,
            annotator: Annotator::new()?,
            models: OnceCell::new_with(Some(models)),
        })
    }

    pub async fn models(&self) -> &ModelRegistry {
        self.models
            .get_or_init(|| ModelRegistry::from_config(&self.config))
            .await
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze::analyze))
        .route("/demo", get(analyze::demo))
        .route("/test", get(analyze::test_endpoint))
        .route("/health", get(health::health))
        .route("/model-status", get(health::model_status))
}

/// Routes are served at the root and again under `/api/v1`.
pub fn router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_body_bytes;

    Router::new()
        .route("/", get(health::root))
        .merge(api_routes())
        .nest("/api/v1", api_routes())
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
