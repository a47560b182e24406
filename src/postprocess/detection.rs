/// Detection types and coordinate normalization.
///
/// Detectors report boxes either as pixel corners or as a center/size pair in
/// percent of the image dimensions. Everything downstream works on
/// `NormalizedBox`, integer corners clamped to the image.

use serde::{Deserialize, Serialize};

/// Box as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoxDescriptor {
    /// `[x1, y1, x2, y2]` in pixels.
    Corners([f64; 4]),
    /// Center and size, 0-100 scale relative to image width/height.
    CenterPercent {
        x_center_pct: f64,
        y_center_pct: f64,
        width_pct: f64,
        height_pct: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_label: String,
    pub confidence: f32,
    pub r#box: BoxDescriptor,
}

impl RawDetection {
    pub fn new(class_label: impl Into<String>, confidence: f32, r#box: BoxDescriptor) -> Self {
        Self {
            class_label: class_label.into(),
            confidence,
            r#box,
        }
    }

    pub fn normalized(&self, width: u32, height: u32) -> NormalizedBox {
        normalize_box(&self.r#box, width, height)
    }
}

/// Pixel corners with `0 <= x1, x2 <= width` and `0 <= y1, y2 <= height`.
///
/// Clamping keeps the detector's ordering, so `x2 <= x1` is possible; such a
/// box has no area and is rejected by the region extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u32; 4]", from = "[u32; 4]")]
pub struct NormalizedBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl NormalizedBox {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }
}

impl From<NormalizedBox> for [u32; 4] {
    fn from(b: NormalizedBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

impl From<[u32; 4]> for NormalizedBox {
    fn from([x1, y1, x2, y2]: [u32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Convert a detector box into clamped integer corners.
///
/// Never fails: NaN and out-of-range values are pulled to the nearest bound.
pub fn normalize_box(descriptor: &BoxDescriptor, width: u32, height: u32) -> NormalizedBox {
    let (w, h) = (width as f64, height as f64);

    let [x1, y1, x2, y2] = match *descriptor {
        BoxDescriptor::Corners(corners) => corners,
        BoxDescriptor::CenterPercent {
            x_center_pct,
            y_center_pct,
            width_pct,
            height_pct,
        } => {
            let x_abs = x_center_pct * w / 100.0;
            let y_abs = y_center_pct * h / 100.0;
            let w_abs = width_pct * w / 100.0;
            let h_abs = height_pct * h / 100.0;
            [
                x_abs - w_abs / 2.0,
                y_abs - h_abs / 2.0,
                x_abs + w_abs / 2.0,
                y_abs + h_abs / 2.0,
            ]
        }
    };

    NormalizedBox {
        x1: clamp_coord(x1, width),
        y1: clamp_coord(y1, height),
        x2: clamp_coord(x2, width),
        y2: clamp_coord(y2, height),
    }
}

/// Truncate toward zero, then clamp into `[0, max]`.
fn clamp_coord(value: f64, max: u32) -> u32 {
    let truncated = value.trunc();
    if truncated.is_nan() || truncated <= 0.0 {
        0
    } else if truncated >= max as f64 {
        max
    } else {
        truncated as u32
    }
}
