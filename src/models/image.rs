use crate::error::{AppError, Result};
use serde::Serialize;

pub const PNG_MIME: &str = "image/png";

/// Longest slice of model text echoed back when no image came out.
pub const HINT_MAX_CHARS: usize = 280;

/// Image payload pulled out of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ExtractedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn png(bytes: Vec<u8>) -> Self {
        Self::new(bytes, PNG_MIME)
    }
}

/// What an image call produced: the image, if any, and whatever text the
/// model wrote with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageReply {
    pub image: Option<ExtractedImage>,
    pub text: Option<String>,
}

impl ImageReply {
    /// Model text cut to `HINT_MAX_CHARS` characters.
    pub fn hint(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(|text| text.chars().take(HINT_MAX_CHARS).collect())
    }

    /// The image, or a `NoPayload` error labelled `missing` carrying the hint.
    pub fn into_image(self, missing: &str) -> Result<ExtractedImage> {
        let hint = self.hint();
        self.image
            .ok_or_else(|| AppError::no_payload_with_detail(missing, hint))
    }
}

/// Body format for an image that is returned inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Binary,
    Base64,
}

impl OutputMode {
    /// Parses the `as` form field. Anything but `base64` means binary.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "base64" => OutputMode::Base64,
            _ => OutputMode::Binary,
        }
    }
}

/// Whether the caller asked for a storage URL instead of the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnMode {
    #[default]
    Inline,
    Url,
}

impl ReturnMode {
    /// Parses the `return` form field.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "url" => ReturnMode::Url,
            _ => ReturnMode::Inline,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImageBase64Response {
    pub image_base64: String,
}
