/// Image transport: base64 payloads in, JPEG + base64 out.

use crate::error::AppError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;

/// Strip an optional `data:<mime>;base64,` prefix.
pub fn strip_data_uri(payload: &str) -> &str {
    let payload = payload.trim();
    if payload.starts_with("data:") {
        match payload.split_once(',') {
            Some((_, data)) => data,
            None => payload,
        }
    } else {
        payload
    }
}

/// Decode a base64 (optionally data-URI prefixed) image into RGB pixels.
///
/// Line-wrapped payloads are accepted: ASCII whitespace anywhere in the data is ignored.
pub fn decode_base64_image(payload: &str) -> Result<RgbImage, AppError> {
    let data: Vec<u8> = strip_data_uri(payload)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(&data)
        .map_err(|e| AppError::ImageDecode(format!("invalid base64: {e}")))?;
    decode_image(&bytes)
}

/// Decode image bytes (JPEG, PNG, WebP, BMP, ...) into RGB pixel data.
pub fn decode_image(data: &[u8]) -> Result<RgbImage, AppError> {
    let img = image::load_from_memory(data)
        .map_err(|e| AppError::ImageDecode(format!("unsupported or corrupt image: {e}")))?;
    Ok(img.to_rgb8())
}

/// Encode as JPEG with the given quality and return base64 text.
pub fn encode_jpeg_base64(img: &RgbImage, quality: u8) -> Result<String, AppError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(img)
        .map_err(|e| AppError::Internal(format!("JPEG encode: {e}")))?;
    Ok(STANDARD.encode(buf))
}

/// Encode as PNG and return base64 text.
pub fn encode_png_base64(img: &RgbImage) -> Result<String, AppError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encode: {e}")))?;
    Ok(STANDARD.encode(buf.into_inner()))
}
