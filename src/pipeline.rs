/// Per-image analysis: detect, crop, classify, estimate health, annotate.
///
/// Detections are processed strictly in detector order; tree ids count only
/// the regions that survive cropping.

use crate::error::AppError;
use crate::models::{bounded, DetectorMode, HealthAttributes, ModelRegistry};
use crate::postprocess::annotate::Annotator;
use crate::postprocess::detection::{NormalizedBox, RawDetection};
use crate::preprocess::crop::extract_region;
use image::RgbImage;
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeResult {
    pub tree_id: u32,
    pub species: String,
    pub health_attributes: HealthAttributes,
    pub detection_confidence: f32,
    pub object_type: String,
    pub bbox: NormalizedBox,
}

pub struct PipelineOutput {
    pub results: Vec<TreeResult>,
    pub annotated: RgbImage,
    /// Every raw detection, including the ones dropped as empty.
    pub objects_detected: usize,
    pub detector_mode: DetectorMode,
    pub elapsed_secs: f64,
}

/// Run detection and per-region analysis on a decoded image.
///
/// Any collaborator failure aborts the whole run; nothing partial is returned.
pub async fn analyze(
    models: &ModelRegistry,
    annotator: &Annotator,
    image: &RgbImage,
) -> Result<PipelineOutput, AppError> {
    let start = Instant::now();
    let (width, height) = image.dimensions();

    let (detections, detector_mode) = models.detector.detect(image, models.call_timeout).await?;
    let results = assemble(models, image, &detections).await?;
    let annotated = annotator.annotate(image, &detections);

    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        width,
        height,
        objects_detected = detections.len(),
        trees_reported = results.len(),
        mode = ?detector_mode,
        elapsed_secs,
        "Analysis complete"
    );

    Ok(PipelineOutput {
        results,
        annotated,
        objects_detected: detections.len(),
        detector_mode,
        elapsed_secs,
    })
}

/// Classify and assess every non-empty detection, numbering survivors from 1.
pub async fn assemble(
    models: &ModelRegistry,
    image: &RgbImage,
    detections: &[RawDetection],
) -> Result<Vec<TreeResult>, AppError> {
    let (width, height) = image.dimensions();
    let mut results = Vec::with_capacity(detections.len());

    for (index, det) in detections.iter().enumerate() {
        let bbox = det.normalized(width, height);
        let Some(region) = extract_region(image, &bbox) else {
            debug!(index, ?bbox, class = %det.class_label, "Dropping empty region");
            continue;
        };

        let species = bounded(
            "classifier",
            models.call_timeout,
            models.classifier.predict_species(&region),
        )
        .await?;
        let health_attributes = bounded(
            "health estimator",
            models.call_timeout,
            models.health.analyze_health(&region, &det.class_label),
        )
        .await?;

        results.push(TreeResult {
            tree_id: results.len() as u32 + 1,
            species,
            health_attributes,
            detection_confidence: det.confidence,
            object_type: det.class_label.clone(),
            bbox,
        });
    }

    Ok(results)
}
