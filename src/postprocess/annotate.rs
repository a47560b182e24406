/// Draw detection boxes and labels onto a copy of the source image.

use super::detection::{NormalizedBox, RawDetection};
use crate::error::AppError;
use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_PADDING: u32 = 3;
const LINE_WIDTH: u32 = 3;

const TREE_COLOR: Rgb<u8> = Rgb([0, 160, 0]);
const OTHER_COLOR: Rgb<u8> = Rgb([255, 140, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Box color for a class label. "tree" is green, everything else orange.
pub fn class_color(class_label: &str) -> Rgb<u8> {
    if class_label.eq_ignore_ascii_case("tree") {
        TREE_COLOR
    } else {
        OTHER_COLOR
    }
}

pub fn label_text(det: &RawDetection) -> String {
    format!("{} {:.2}", det.class_label, det.confidence)
}

pub struct Annotator {
    font: FontRef<'static>,
    scale: PxScale,
}

impl Annotator {
    pub fn new() -> Result<Self, AppError> {
        let font = FontRef::try_from_slice(FONT_DATA)
            .map_err(|e| AppError::Internal(format!("Failed to load label font: {e}")))?;
        Ok(Self {
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
        })
    }

    /// Render every non-empty detection onto a fresh copy of `source`.
    ///
    /// Boxes are normalized against the source dimensions before drawing; the
    /// source itself is never modified.
    pub fn annotate(&self, source: &RgbImage, detections: &[RawDetection]) -> RgbImage {
        let mut canvas = source.clone();
        let (width, height) = source.dimensions();

        for det in detections {
            let bbox = det.normalized(width, height);
            if bbox.is_empty() {
                continue;
            }
            let color = class_color(&det.class_label);
            draw_box(&mut canvas, &bbox, color);
            self.draw_label(&mut canvas, &bbox, &label_text(det), color);
        }

        canvas
    }

    fn line_height(&self) -> u32 {
        let scaled = self.font.as_scaled(self.scale);
        (scaled.ascent() - scaled.descent()).ceil().max(1.0) as u32
    }

    fn draw_label(&self, canvas: &mut RgbImage, bbox: &NormalizedBox, text: &str, color: Rgb<u8>) {
        let (text_w, _) = text_size(self.scale, &self.font, text);
        let label_w = text_w + 2 * LABEL_PADDING;
        let label_h = self.line_height() + 2 * LABEL_PADDING;

        // Directly above the box, clipped at the image border. A box touching the
        // top edge gets its label just below that edge, inside the box.
        let top = if bbox.y1 > 0 {
            bbox.y1 as i32 - label_h as i32
        } else {
            0
        };
        let left = bbox.x1 as i32;

        let background = Rect::at(left, top).of_size(label_w, label_h);
        draw_filled_rect_mut(canvas, background, color);
        draw_text_mut(
            canvas,
            TEXT_COLOR,
            left + LABEL_PADDING as i32,
            top + LABEL_PADDING as i32,
            self.scale,
            &self.font,
            text,
        );
    }
}

/// Outline `bbox` with a `LINE_WIDTH` stroke drawn inward from its edges.
fn draw_box(canvas: &mut RgbImage, bbox: &NormalizedBox, color: Rgb<u8>) {
    let (w, h) = (bbox.width(), bbox.height());
    for inset in 0..LINE_WIDTH {
        if w <= 2 * inset || h <= 2 * inset {
            break;
        }
        let rect = Rect::at((bbox.x1 + inset) as i32, (bbox.y1 + inset) as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}
