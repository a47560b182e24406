/// Analysis endpoints: /analyze, /demo and /test

use super::AppState;
use crate::error::AppError;
use crate::models::DetectorMode;
use crate::pipeline::{self, TreeResult};
use crate::preprocess::decode::{decode_base64_image, encode_jpeg_base64, encode_png_base64};
use axum::extract::State;
use axum::Json;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_ellipse_mut, draw_filled_rect_mut, draw_hollow_ellipse_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Base64 image, optionally with a `data:image/...;base64,` prefix.
    pub image_data: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub results: Vec<TreeResult>,
    /// Base64 JPEG with boxes and labels drawn.
    pub annotated_image: String,
    pub processing_time_seconds: f64,
    /// All raw detections, including regions dropped as empty.
    pub objects_detected: usize,
    pub detector_mode: DetectorMode,
}

/// POST /analyze
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    if request.image_data.trim().is_empty() {
        return Err(AppError::BadRequest("image_data is required".to_string()));
    }

    let response = analyze_payload(&state, request.image_data).await?;
    Ok(Json(response))
}

/// Decode, run the pipeline and encode the annotated result.
pub async fn analyze_payload(
    state: &AppState,
    image_data: String,
) -> Result<AnalysisResponse, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    async move {
        let start = Instant::now();

        let image = tokio::task::spawn_blocking(move || decode_base64_image(&image_data)).await??;

        let models = state.models().await;
        let output = pipeline::analyze(models, &state.annotator, &image).await?;

        let quality = state.config.jpeg_quality;
        let annotated = output.annotated;
        let annotated_image =
            tokio::task::spawn_blocking(move || encode_jpeg_base64(&annotated, quality)).await??;

        Ok::<_, AppError>(AnalysisResponse {
            results: output.results,
            annotated_image,
            processing_time_seconds: start.elapsed().as_secs_f64(),
            objects_detected: output.objects_detected,
            detector_mode: output.detector_mode,
        })
    }
    .instrument(span)
    .await
}

/// GET /demo - analyze a synthesized scene through the same path as /analyze
pub async fn demo(State(state): State<Arc<AppState>>) -> Result<Json<AnalysisResponse>, AppError> {
    let payload = tokio::task::spawn_blocking(|| encode_png_base64(&demo_scene())).await??;
    let response = analyze_payload(&state, payload).await?;
    Ok(Json(response))
}

const SKY: Rgb<u8> = Rgb([173, 216, 230]);
const TRUNK: Rgb<u8> = Rgb([165, 42, 42]);
const CROWN: Rgb<u8> = Rgb([0, 128, 0]);
const CROWN_EDGE: Rgb<u8> = Rgb([0, 100, 0]);
const OUTLINE: Rgb<u8> = Rgb([0, 0, 0]);

/// 800x600 light-blue canvas with two simple trees.
pub fn demo_scene() -> RgbImage {
    let mut img = RgbImage::from_pixel(800, 600, SKY);

    // (trunk x, y, w, h), (crown center, radii)
    let trees = [
        ((100, 100, 100, 300), ((150, 125), (100, 75))),
        ((400, 150, 50, 200), ((425, 175), (75, 75))),
    ];

    for ((x, y, w, h), (center, (rx, ry))) in trees {
        let trunk = Rect::at(x, y).of_size(w, h);
        draw_filled_rect_mut(&mut img, trunk, TRUNK);
        draw_hollow_rect_mut(&mut img, trunk, OUTLINE);
        draw_filled_ellipse_mut(&mut img, center, rx, ry, CROWN);
        draw_hollow_ellipse_mut(&mut img, center, rx, ry, CROWN_EDGE);
    }

    img
}

/// GET /test
pub async fn test_endpoint() -> Json<Value> {
    Json(json!({
        "message": "Analysis endpoint is working",
        "status": "OK",
        "endpoints": {
            "health": "/api/v1/health",
            "analyze": "/api/v1/analyze (POST)",
            "demo": "/api/v1/demo",
            "model_status": "/api/v1/model-status",
            "test": "/api/v1/test"
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_layout() {
        let img = demo_scene();
        assert_eq!(img.dimensions(), (800, 600));
        assert_eq!(img.get_pixel(5, 5), &SKY);
        assert_eq!(img.get_pixel(150, 350), &TRUNK);
        assert_eq!(img.get_pixel(150, 125), &CROWN);
        assert_eq!(img.get_pixel(425, 300), &TRUNK);
    }

    #[test]
    fn test_response_field_names() {
        let response = AnalysisResponse {
            results: Vec::new(),
            annotated_image: "QUJD".into(),
            processing_time_seconds: 0.25,
            objects_detected: 2,
            detector_mode: DetectorMode::Live,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["annotated_image"], "QUJD");
        assert_eq!(value["processing_time_seconds"], 0.25);
        assert_eq!(value["objects_detected"], 2);
        assert_eq!(value["detector_mode"], "live");
        assert!(value["results"].as_array().unwrap().is_empty());
    }
}
