//! Embedded-image helpers for page markdown.
//!
//! Pages carry their images inline as `data:image/...;base64,` URIs, the same
//! shape a PDF-to-markdown converter produces with image embedding enabled.

use std::io::Cursor;
use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat, RgbImage};
use regex::Regex;

use super::ExtractionError;

static IMAGE_B64: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data:image/[a-zA-Z]+;base64,([^`\s)]+)").expect("valid regex"));

static IMAGE_MARKDOWN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(data:image/[a-zA-Z]+;base64,[^)]*\)").expect("valid regex"));

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Base64 payloads of every embedded image, in order of appearance.
pub fn extract_image_b64(content: &str) -> Vec<String> {
    IMAGE_B64
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Remove markdown image tags that carry inline data, collapsing the blank
/// lines they leave behind.
pub fn strip_embedded_images(content: &str) -> String {
    let stripped = IMAGE_MARKDOWN.replace_all(content, "");
    BLANK_RUNS.replace_all(&stripped, "\n\n").trim().to_string()
}

/// Decode a base64 image payload into an RGB bitmap.
pub fn decode_base64_image(b64: &str) -> Result<RgbImage, ExtractionError> {
    let bytes = STANDARD.decode(b64.trim())?;
    let image = image::load_from_memory(&bytes).map_err(|e| ExtractionError::Image(e.to_string()))?;
    Ok(image.to_rgb8())
}

/// Encode an image as PNG and return the base64 payload.
pub fn encode_png_base64(image: &DynamicImage) -> Result<String, ExtractionError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ExtractionError::Image(e.to_string()))?;
    Ok(STANDARD.encode(buf.into_inner()))
}

/// Markdown image tag with the payload inlined.
pub fn image_data_uri(png_b64: &str) -> String {
    format!("![image](data:image/png;base64,{png_b64})")
}
