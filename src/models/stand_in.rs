/// Stand-in models used when no live inference service is available.
///
/// Outputs look random but are seeded from a content hash of the pixels, so the
/// same input always produces the same answer.

use super::{Classifier, Detector, HealthAttributes, HealthEstimator};
use crate::error::AppError;
use crate::postprocess::detection::{BoxDescriptor, RawDetection};
use async_trait::async_trait;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::io::Cursor;

const SAMPLE_SIZE: usize = 16 * 1024;
const SAMPLE_THRESHOLD: usize = SAMPLE_SIZE * 3 + 1;

const DETECTION_CLASSES: [&str; 2] = ["tree", "shrub"];

pub const SPECIES: [&str; 10] = [
    "oak", "birch", "pine", "spruce", "maple", "linden", "poplar", "willow", "ash", "rowan",
];

/// Hash of up to three 16KB samples (start, middle, end) plus the total length.
///
/// Small buffers are hashed whole.
pub fn sample_hash(data: &[u8], seed: u32) -> Result<u128, AppError> {
    let len = data.len();
    let mut sample = Vec::with_capacity(SAMPLE_SIZE * 3 + 8);
    sample.extend_from_slice(&(len as u64).to_le_bytes());

    if len < SAMPLE_THRESHOLD {
        sample.extend_from_slice(data);
    } else {
        let mid_start = len / 2 - SAMPLE_SIZE / 2;
        sample.extend_from_slice(&data[..SAMPLE_SIZE]);
        sample.extend_from_slice(&data[mid_start..mid_start + SAMPLE_SIZE]);
        sample.extend_from_slice(&data[len - SAMPLE_SIZE..]);
    }

    murmur3::murmur3_x64_128(&mut Cursor::new(&sample), seed)
        .map_err(|e| AppError::Internal(format!("murmur3: {e}")))
}

fn image_rng(image: &RgbImage, salt: &str) -> Result<StdRng, AppError> {
    let mut seed = sample_hash(image.as_raw(), 0)?;
    seed ^= (u128::from(image.width()) << 32) | u128::from(image.height());
    if !salt.is_empty() {
        seed ^= sample_hash(salt.as_bytes(), 1)?;
    }
    Ok(StdRng::seed_from_u64((seed as u64) ^ ((seed >> 64) as u64)))
}

/// Synthesizes one to three low-confidence tree/shrub detections.
#[derive(Debug, Clone)]
pub struct StandInDetector {
    /// Confidence range in hundredths, upper bound exclusive.
    confidence_pct: std::ops::Range<u32>,
}

impl Default for StandInDetector {
    fn default() -> Self {
        Self {
            confidence_pct: 30..60,
        }
    }
}

#[async_trait]
impl Detector for StandInDetector {
    fn name(&self) -> &'static str {
        "stand-in"
    }

    async fn detect(&self, image: &RgbImage) -> Result<Vec<RawDetection>, AppError> {
        let (width, height) = image.dimensions();
        let max_w = width.saturating_sub(1).min(300);
        let max_h = height.saturating_sub(1).min(400);
        if max_w == 0 || max_h == 0 {
            return Ok(Vec::new());
        }

        let mut rng = image_rng(image, "")?;
        let count = rng.gen_range(1..=3);

        let detections = (0..count)
            .map(|_| {
                let w = rng.gen_range(max_w.min(100)..=max_w);
                let h = rng.gen_range(max_h.min(100)..=max_h);
                let x = rng.gen_range(0..=width - w);
                let y = rng.gen_range(0..=height - h);
                let class = DETECTION_CLASSES[rng.gen_range(0..DETECTION_CLASSES.len())];
                let confidence = rng.gen_range(self.confidence_pct.clone()) as f32 / 100.0;

                RawDetection::new(
                    class,
                    confidence,
                    BoxDescriptor::Corners([x as f64, y as f64, (x + w) as f64, (y + h) as f64]),
                )
            })
            .collect();

        Ok(detections)
    }
}

/// Picks a species from [`SPECIES`] by hashing the region's pixels.
#[derive(Debug, Clone, Default)]
pub struct HashClassifier;

#[async_trait]
impl Classifier for HashClassifier {
    fn name(&self) -> &'static str {
        "hash-stand-in"
    }

    async fn predict_species(&self, region: &RgbImage) -> Result<String, AppError> {
        let hash = sample_hash(region.as_raw(), region.width())?;
        Ok(SPECIES[(hash % SPECIES.len() as u128) as usize].to_string())
    }
}

/// Yes/no damage indicators drawn with fixed probabilities.
#[derive(Debug, Clone, Default)]
pub struct StandInHealthEstimator;

/// (attribute, probability of "yes")
const DAMAGE_INDICATORS: [(&str, f64); 6] = [
    ("trunk_rot", 0.3),
    ("hollow", 0.2),
    ("trunk_crack", 0.4),
    ("trunk_damage", 0.5),
    ("crown_damage", 0.6),
    ("fruiting_bodies", 0.1),
];

#[async_trait]
impl HealthEstimator for StandInHealthEstimator {
    fn name(&self) -> &'static str {
        "stand-in"
    }

    async fn analyze_health(
        &self,
        region: &RgbImage,
        object_type: &str,
    ) -> Result<HealthAttributes, AppError> {
        let mut rng = image_rng(region, object_type)?;
        let mut attributes = HealthAttributes::new();

        for (name, p_yes) in DAMAGE_INDICATORS {
            let value = if rng.gen_bool(p_yes) { "yes" } else { "no" };
            attributes.insert(name.to_string(), json!(value));
        }
        attributes.insert(
            "dried_branches_percent".to_string(),
            json!(rng.gen_range(0..=50u32)),
        );
        attributes.insert(
            "other_characteristics".to_string(),
            json!(format!("Stand-in assessment for {object_type}; no model inspected this region")),
        );

        Ok(attributes)
    }
}
