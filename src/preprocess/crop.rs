/// Crop detection regions out of the source image for per-tree analysis.

use crate::postprocess::detection::NormalizedBox;
use image::{GenericImageView, RgbImage};

/// Copy the region covered by `bbox` out of `img`.
///
/// Returns `None` when the box has no area, in which case the caller skips the
/// detection entirely. Boxes are expected to be clamped to the image already.
pub fn extract_region(img: &RgbImage, bbox: &NormalizedBox) -> Option<RgbImage> {
    if bbox.is_empty() || bbox.x2 > img.width() || bbox.y2 > img.height() {
        return None;
    }

    let roi = img.view(bbox.x1, bbox.y1, bbox.width(), bbox.height());
    Some(roi.to_image())
}
