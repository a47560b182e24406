//! Turn an image file into a JSON body for `POST /analyze`.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Encode an image as an /analyze request body")]
struct Args {
    /// Image file to encode
    image: PathBuf,

    /// Where to write the JSON request
    #[arg(short, long, default_value = "data.json")]
    output: PathBuf,

    /// Prefix the payload with a data URI (`data:image/...;base64,`)
    #[arg(long)]
    data_uri: bool,
}

/// Build the `{"image_data": ...}` request JSON for raw image file bytes.
fn request_body(bytes: &[u8], data_uri: bool) -> Result<String> {
    let format = image::guess_format(bytes).context("not a recognised image")?;

    let encoded = STANDARD.encode(bytes);
    let image_data = if data_uri {
        format!("data:{};base64,{encoded}", format.to_mime_type())
    } else {
        encoded
    };

    Ok(serde_json::to_string_pretty(&json!({ "image_data": image_data }))?)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let bytes = std::fs::read(&args.image)
        .with_context(|| format!("reading {}", args.image.display()))?;
    let body = request_body(&bytes, args.data_uri)
        .with_context(|| format!("encoding {}", args.image.display()))?;
    std::fs::write(&args.output, body)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Wrote {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use serde_json::Value;
    use std::io::Cursor;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        RgbImage::new(4, 4).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn image_data(body: &str) -> String {
        let value: Value = serde_json::from_str(body).unwrap();
        value["image_data"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_data_uri_uses_detected_format() {
        let png = encoded(ImageFormat::Png);
        let data = image_data(&request_body(&png, true).unwrap());
        assert_eq!(data, format!("data:image/png;base64,{}", STANDARD.encode(&png)));

        let jpeg = encoded(ImageFormat::Jpeg);
        assert!(image_data(&request_body(&jpeg, true).unwrap()).starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_plain_payload_and_rejected_input() {
        let png = encoded(ImageFormat::Png);
        assert_eq!(image_data(&request_body(&png, false).unwrap()), STANDARD.encode(&png));
        assert!(request_body(b"plain text", false).is_err());
    }
}
