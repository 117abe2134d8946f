//! Turns uploads and base64 strings into `(bytes, mime)` pairs ready for the
//! provider.

use crate::{
    error::{AppError, Result},
    models::ContentPart,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;

pub const JPEG_MIME: &str = "image/jpeg";
const GENERIC_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl NormalizedImage {
    pub fn into_part(self) -> ContentPart {
        ContentPart::inline(self.mime_type, self.bytes)
    }
}

/// Guesses the image mime type from the leading bytes.
///
/// Only PNG, WEBP and GIF are recognized explicitly; JPEG and anything that
/// does not parse as an image are reported as `image/jpeg`.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::WebP) => "image/webp",
        Ok(ImageFormat::Gif) => "image/gif",
        _ => JPEG_MIME,
    }
}

/// Normalizes the full contents of an uploaded file.
pub fn from_upload(bytes: Vec<u8>, declared_mime: Option<&str>) -> Result<NormalizedImage> {
    if bytes.is_empty() {
        return Err(AppError::invalid_input("Empty file upload"));
    }
    let mime_type = match declared_mime.map(str::trim) {
        Some(mime) if !mime.is_empty() && !mime.eq_ignore_ascii_case(GENERIC_MIME) => {
            mime.to_string()
        }
        _ => sniff_mime(&bytes).to_string(),
    };
    Ok(NormalizedImage { bytes, mime_type })
}

/// Decodes a base64 image, accepting an optional `data:<mime>;base64,` prefix
/// and line-wrapped or space-separated input.
pub fn from_base64(encoded: &str) -> Result<NormalizedImage> {
    let payload: String = strip_data_url(encoded.trim())
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AppError::invalid_input("Invalid base64 image"))?;
    if bytes.is_empty() {
        return Err(AppError::invalid_input("Invalid base64 image"));
    }
    let mime_type = sniff_mime(&bytes).to_string();
    Ok(NormalizedImage { bytes, mime_type })
}

fn strip_data_url(value: &str) -> &str {
    if value.starts_with("data:") {
        if let Some((_, rest)) = value.split_once(";base64,") {
            return rest;
        }
    }
    value
}
