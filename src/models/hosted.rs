/// Client for a hosted object-detection endpoint.
///
/// Request: the image as base64 JPEG in the POST body, API key as a query
/// parameter. Response: `{"predictions": [...]}` where each prediction carries
/// a class, a confidence and either pixel corners (`bbox`) or a center/size
/// box in percent (`x`, `y`, `width`, `height`).

use super::Detector;
use crate::error::AppError;
use crate::postprocess::detection::{BoxDescriptor, RawDetection};
use crate::preprocess::decode::encode_jpeg_base64;
use async_trait::async_trait;
use image::RgbImage;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const UPLOAD_JPEG_QUALITY: u8 = 90;

#[derive(Clone)]
pub struct HostedDetector {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl HostedDetector {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build detector client: {e}")))?;

        Ok(Self {
            url,
            api_key,
            client,
        })
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, &self.url);
        match &self.api_key {
            Some(key) => builder.query(&[("api_key", key)]),
            None => builder,
        }
    }
}

#[async_trait]
impl Detector for HostedDetector {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, AppError> {
        let body = encode_jpeg_base64(image, UPLOAD_JPEG_QUALITY)?;

        let response = self
            .request(reqwest::Method::POST)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::CollaboratorUnavailable(format!(
                "Detector returned {status}: {text}"
            )));
        }

        let parsed: HostedResponse = response.json().await.map_err(|e| {
            AppError::CollaboratorUnavailable(format!("Failed to parse detector response: {e}"))
        })?;

        debug!(count = parsed.predictions.len(), "Hosted detector responded");
        Ok(parsed.into_detections())
    }

    async fn probe(&self) -> Result<(), AppError> {
        let response = self.request(reqwest::Method::GET).send().await?;
        if response.status().is_server_error() {
            return Err(AppError::CollaboratorUnavailable(format!(
                "Detector probe returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct HostedResponse {
    #[serde(default)]
    predictions: Vec<HostedPrediction>,
}

impl HostedResponse {
    fn into_detections(self) -> Vec<RawDetection> {
        self.predictions
            .into_iter()
            .map(|p| RawDetection {
                class_label: p.class,
                confidence: p.confidence.clamp(0.0, 1.0),
                r#box: p.r#box.into(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct HostedPrediction {
    class: String,
    confidence: f32,
    #[serde(flatten)]
    r#box: WireBox,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireBox {
    Corners { bbox: [f64; 4] },
    Center { x: f64, y: f64, width: f64, height: f64 },
}

impl From<WireBox> for BoxDescriptor {
    fn from(wire: WireBox) -> Self {
        match wire {
            WireBox::Corners { bbox } => BoxDescriptor::Corners(bbox),
            WireBox::Center {
                x,
                y,
                width,
                height,
            } => BoxDescriptor::CenterPercent {
                x_center_pct: x,
                y_center_pct: y,
                width_pct: width,
                height_pct: height,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::decode::decode_base64_image;
    use axum::extract::State;
    use axum::http::{HeaderMap, Method, StatusCode, Uri};
    use axum::routing::{any, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Received {
        method: Method,
        query: Option<String>,
        content_type: Option<String>,
        body: String,
    }

    type Recorder = Arc<Mutex<Vec<Received>>>;

    async fn record(
        State(seen): State<Recorder>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: String,
    ) -> Json<Value> {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.lock().unwrap().push(Received {
            method,
            query: uri.query().map(str::to_string),
            content_type,
            body,
        });
        Json(json!({
            "predictions": [
                {"class": "tree", "confidence": 0.88, "x": 50.0, "y": 50.0, "width": 25.0, "height": 50.0},
                {"class": "shrub", "confidence": 0.61, "bbox": [2, 4, 20, 30]}
            ]
        }))
    }

    /// Serve `app` on an ephemeral local port and return the detection URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/detect")
    }

    fn detector(url: String, api_key: Option<&str>) -> HostedDetector {
        HostedDetector::new(url, api_key.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_detect_sends_form_post_with_api_key() {
        let seen = Recorder::default();
        let app = Router::new()
            .route("/detect", post(record))
            .with_state(seen.clone());
        let hosted = detector(serve(app).await, Some("secret"));

        let image = RgbImage::from_pixel(64, 48, image::Rgb([90, 140, 60]));
        let detections = hosted.detect(&image).await.unwrap();

        assert_eq!(
            detections,
            vec![
                RawDetection::new(
                    "tree",
                    0.88,
                    BoxDescriptor::CenterPercent {
                        x_center_pct: 50.0,
                        y_center_pct: 50.0,
                        width_pct: 25.0,
                        height_pct: 50.0,
                    }
                ),
                RawDetection::new("shrub", 0.61, BoxDescriptor::Corners([2.0, 4.0, 20.0, 30.0])),
            ]
        );

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let request = &seen[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.query.as_deref(), Some("api_key=secret"));
        assert_eq!(
            request.content_type.as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        // body is the image itself, JPEG as base64
        let uploaded = decode_base64_image(&request.body).unwrap();
        assert_eq!(uploaded.dimensions(), (64, 48));
    }

    #[tokio::test]
    async fn test_detect_without_api_key_sends_no_query() {
        let seen = Recorder::default();
        let app = Router::new()
            .route("/detect", post(record))
            .with_state(seen.clone());
        let hosted = detector(serve(app).await, None);

        hosted.detect(&RgbImage::new(16, 16)).await.unwrap();
        assert_eq!(seen.lock().unwrap()[0].query, None);
    }

    #[tokio::test]
    async fn test_error_status_is_collaborator_unavailable() {
        let app = Router::new().route(
            "/detect",
            any(|| async { (StatusCode::SERVICE_UNAVAILABLE, "model loading") }),
        );
        let hosted = detector(serve(app).await, Some("secret"));

        let err = hosted.detect(&RgbImage::new(16, 16)).await.unwrap_err();
        match err {
            AppError::CollaboratorUnavailable(message) => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("model loading"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        assert!(matches!(
            hosted.probe().await,
            Err(AppError::CollaboratorUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unparsable_body_is_collaborator_unavailable() {
        let app = Router::new().route("/detect", post(|| async { "<html>not json</html>" }));
        let hosted = detector(serve(app).await, None);

        let err = hosted.detect(&RgbImage::new(16, 16)).await.unwrap_err();
        assert!(matches!(err, AppError::CollaboratorUnavailable(_)));
    }

    #[tokio::test]
    async fn test_reachability_check_accepts_client_errors() {
        // GET on a POST-only route answers 405; the service is up
        let app = Router::new().route("/detect", post(|| async { "{}" }));
        let hosted = detector(serve(app).await, None);
        assert!(hosted.probe().await.is_ok());
    }

    #[test]
    fn test_parses_percentage_and_corner_predictions() {
        let body = r#"{
            "predictions": [
                {"class": "tree", "confidence": 0.91, "x": 50.0, "y": 40.0, "width": 20.0, "height": 60.0},
                {"class": "shrub", "confidence": 1.3, "bbox": [10, 20, 110, 220]}
            ],
            "time": 0.12
        }"#;
        let parsed: HostedResponse = serde_json::from_str(body).unwrap();
        let detections = parsed.into_detections();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].class_label, "tree");
        assert_eq!(
            detections[0].r#box,
            BoxDescriptor::CenterPercent {
                x_center_pct: 50.0,
                y_center_pct: 40.0,
                width_pct: 20.0,
                height_pct: 60.0,
            }
        );
        assert_eq!(detections[1].r#box, BoxDescriptor::Corners([10.0, 20.0, 110.0, 220.0]));
        assert_eq!(detections[1].confidence, 1.0);
    }

    #[test]
    fn test_missing_predictions_is_empty() {
        let parsed: HostedResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_detections().is_empty());
    }

    #[test]
    fn test_prediction_without_box_is_rejected() {
        let body = r#"{"predictions": [{"class": "tree", "confidence": 0.5}]}"#;
        assert!(serde_json::from_str::<HostedResponse>(body).is_err());
    }
}
