//! Pulls the useful payload out of a `generateContent` style response.
//!
//! Responses are kept as loose JSON: depending on API version and transport
//! the same field shows up in snake_case or camelCase, and image models use a
//! separate `generatedImages` array. Each logical field is read through an
//! ordered list of accepted spellings.

use crate::models::ExtractedImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbaImage};
use serde_json::Value;
use std::io::Cursor;

pub const CANDIDATES_KEYS: &[&str] = &["candidates"];
pub const CONTENT_KEYS: &[&str] = &["content"];
pub const PARTS_KEYS: &[&str] = &["parts"];
pub const INLINE_DATA_KEYS: &[&str] = &["inline_data", "inlineData"];
pub const MIME_TYPE_KEYS: &[&str] = &["mime_type", "mimeType"];
pub const GENERATED_IMAGES_KEYS: &[&str] = &["generated_images", "generatedImages"];
pub const IMAGE_BASE64_KEYS: &[&str] = &["bytesBase64Encoded", "imageBytes", "image_bytes"];
pub const IMAGE_RAW_KEYS: &[&str] = &["data"];

/// First present, non-null field among `keys`.
pub fn first_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find(|found| !found.is_null())
}

fn array_field<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    first_field(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Every part of every candidate, in response order.
fn candidate_parts(response: &Value) -> impl Iterator<Item = &Value> {
    array_field(response, CANDIDATES_KEYS)
        .iter()
        .filter_map(|candidate| first_field(candidate, CONTENT_KEYS))
        .flat_map(|content| array_field(content, PARTS_KEYS).iter())
}

/// Re-encodes `raw` as PNG. Bytes that do not decode as an image are handed
/// back untouched with the declared mime type.
pub fn normalize_to_png(raw: Vec<u8>, declared_mime: &str) -> ExtractedImage {
    match image::load_from_memory(&raw) {
        Ok(decoded) => {
            let mut out = Cursor::new(Vec::new());
            match decoded.write_to(&mut out, ImageFormat::Png) {
                Ok(()) => ExtractedImage::png(out.into_inner()),
                Err(e) => {
                    log::warn!("PNG re-encoding failed, passing bytes through: {}", e);
                    ExtractedImage::new(raw, declared_mime)
                }
            }
        }
        Err(_) => ExtractedImage::new(raw, declared_mime),
    }
}

fn image_from_parts(response: &Value) -> Option<ExtractedImage> {
    for part in candidate_parts(response) {
        let Some(inline) = first_field(part, INLINE_DATA_KEYS) else {
            continue;
        };
        let Some(data) = inline.get("data").and_then(Value::as_str) else {
            continue;
        };
        if data.is_empty() {
            continue;
        }
        let raw = match STANDARD.decode(data) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Skipping inline part with undecodable base64: {}", e);
                continue;
            }
        };
        let mime = first_field(inline, MIME_TYPE_KEYS)
            .and_then(Value::as_str)
            .unwrap_or(crate::models::PNG_MIME);
        return Some(normalize_to_png(raw, mime));
    }
    None
}

/// Shapes the `image` entry of a generated image may take, in preference
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageRepresentation {
    /// `{width, height, pixels}` where `pixels` is base64 RGBA8.
    Decoded,
    Base64,
    RawBytes,
}

const REPRESENTATIONS: [ImageRepresentation; 3] = [
    ImageRepresentation::Decoded,
    ImageRepresentation::Base64,
    ImageRepresentation::RawBytes,
];

impl ImageRepresentation {
    fn read(self, image: &Value) -> Option<ExtractedImage> {
        match self {
            ImageRepresentation::Decoded => {
                let width = image.get("width")?.as_u64()?;
                let height = image.get("height")?.as_u64()?;
                let pixels = STANDARD.decode(image.get("pixels")?.as_str()?).ok()?;
                let raster =
                    RgbaImage::from_raw(u32::try_from(width).ok()?, u32::try_from(height).ok()?, pixels)?;
                let mut out = Cursor::new(Vec::new());
                raster.write_to(&mut out, ImageFormat::Png).ok()?;
                Some(ExtractedImage::png(out.into_inner()))
            }
            ImageRepresentation::Base64 => {
                let encoded = first_field(image, IMAGE_BASE64_KEYS)?.as_str()?;
                let raw = STANDARD.decode(encoded).ok()?;
                (!raw.is_empty()).then(|| normalize_to_png(raw, mime_of(image)))
            }
            ImageRepresentation::RawBytes => {
                let raw: Vec<u8> = first_field(image, IMAGE_RAW_KEYS)?
                    .as_array()?
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<_>>()?;
                (!raw.is_empty()).then(|| normalize_to_png(raw, mime_of(image)))
            }
        }
    }
}

fn mime_of(image: &Value) -> &str {
    first_field(image, MIME_TYPE_KEYS)
        .and_then(Value::as_str)
        .unwrap_or(crate::models::PNG_MIME)
}

fn image_from_generated(response: &Value) -> Option<ExtractedImage> {
    let first = array_field(response, GENERATED_IMAGES_KEYS).first()?;
    let image = first.get("image")?;
    REPRESENTATIONS.iter().find_map(|repr| repr.read(image))
}

/// Finds the first image in `response`.
///
/// `None` means the provider returned no image, which callers report as an
/// empty result rather than a failure.
pub fn extract_image(response: &Value) -> Option<ExtractedImage> {
    image_from_parts(response).or_else(|| image_from_generated(response))
}

/// Joins the text of every candidate part with newlines.
pub fn extract_text(response: &Value) -> Option<String> {
    let joined = candidate_parts(response)
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Structured {
    Json(Value),
    Raw(String),
}

/// Reads model output that should be JSON but may be wrapped in prose or
/// code fences.
pub fn parse_structured(text: &str) -> Structured {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Structured::Json(value);
    }
    if let Some(candidate) = last_json_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(candidate) {
            return Structured::Json(value);
        }
    }
    Structured::Raw(text.to_string())
}

/// Byte index of the `}` closing the object that opens at `start`. Braces
/// inside JSON strings are ignored.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Slice of the last `{...}` in `text` that parses as a JSON object.
///
/// Every `{` is tried as a start, so stray braces in the surrounding prose
/// neither hide the object nor replace it. Spans ending later win; for the
/// same end the outermost one wins.
pub fn last_json_object(text: &str) -> Option<&str> {
    let mut spans: Vec<(usize, usize)> = text
        .char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(|(start, _)| balanced_end(text, start).map(|end| (start, end)))
        .collect();
    spans.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    spans
        .into_iter()
        .map(|(start, end)| &text[start..=end])
        .find(|candidate| {
            serde_json::from_str::<Value>(candidate).map_or(false, |value| value.is_object())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::tests::encode_sample;
    use serde_json::json;

    fn png_sample() -> Vec<u8> {
        encode_sample(ImageFormat::Png)
    }

    fn inline_response(key: &str, mime_key: &str, bytes: &[u8], mime: &str) -> Value {
        let mut inline = serde_json::Map::new();
        inline.insert(mime_key.to_string(), json!(mime));
        inline.insert("data".to_string(), json!(STANDARD.encode(bytes)));
        let mut part = serde_json::Map::new();
        part.insert(key.to_string(), Value::Object(inline));
        json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "Here you go" }, Value::Object(part)]
                }
            }]
        })
    }

    #[test]
    fn test_inline_data_both_spellings() {
        for (key, mime_key) in [("inlineData", "mimeType"), ("inline_data", "mime_type")] {
            let response = inline_response(key, mime_key, &png_sample(), "image/png");
            let image = extract_image(&response).expect("image");
            assert_eq!(image.mime_type, "image/png");
            assert_eq!(sniff(&image.bytes), "image/png");
        }
    }

    fn sniff(bytes: &[u8]) -> &'static str {
        crate::normalize::sniff_mime(bytes)
    }

    #[test]
    fn test_jpeg_is_normalized_to_png() {
        let jpeg = encode_sample(ImageFormat::Jpeg);
        let response = inline_response("inlineData", "mimeType", &jpeg, "image/jpeg");
        let image = extract_image(&response).unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(sniff(&image.bytes), "image/png");
    }

    #[test]
    fn test_undecodable_image_passes_through() {
        let response = inline_response("inlineData", "mimeType", b"not pixels", "image/jpeg");
        let image = extract_image(&response).unwrap();
        assert_eq!(image.bytes, b"not pixels");
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn test_first_inline_part_wins() {
        let first = encode_sample(ImageFormat::Png);
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "inlineData": { "data": STANDARD.encode(b"first") } }] } },
                { "content": { "parts": [{ "inlineData": { "data": STANDARD.encode(&first) } }] } }
            ]
        });
        assert_eq!(extract_image(&response).unwrap().bytes, b"first");
    }

    #[test]
    fn test_generated_images_base64() {
        for key in ["generatedImages", "generated_images"] {
            let mut response = json!({});
            response[key] =
                json!([{ "image": { "bytesBase64Encoded": STANDARD.encode(png_sample()) } }]);
            let image = extract_image(&response).unwrap();
            assert_eq!(image.mime_type, "image/png");
        }
        let response = json!({
            "generatedImages": [{ "image": { "imageBytes": STANDARD.encode(png_sample()) } }]
        });
        assert!(extract_image(&response).is_some());
    }

    #[test]
    fn test_generated_images_decoded_raster() {
        let pixels: Vec<u8> = [10u8, 20, 30, 255].repeat(4);
        let response = json!({
            "generatedImages": [{
                "image": { "width": 2, "height": 2, "pixels": STANDARD.encode(&pixels) }
            }]
        });
        let image = extract_image(&response).unwrap();
        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_generated_images_raw_bytes() {
        let response = json!({
            "generatedImages": [{ "image": { "data": [1, 2, 3] } }]
        });
        assert_eq!(extract_image(&response).unwrap().bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_decoded_raster_preferred_over_base64() {
        let pixels: Vec<u8> = [0u8, 0, 0, 255].to_vec();
        let response = json!({
            "generatedImages": [{
                "image": {
                    "width": 1, "height": 1, "pixels": STANDARD.encode(&pixels),
                    "bytesBase64Encoded": STANDARD.encode(b"ignored")
                }
            }]
        });
        let image = extract_image(&response).unwrap();
        assert_eq!(sniff(&image.bytes), "image/png");
    }

    #[test]
    fn test_candidates_preferred_over_generated_images() {
        let mut response = inline_response("inlineData", "mimeType", b"from parts", "image/png");
        response["generatedImages"] =
            json!([{ "image": { "bytesBase64Encoded": STANDARD.encode(b"from generated") } }]);
        assert_eq!(extract_image(&response).unwrap().bytes, b"from parts");
    }

    #[test]
    fn test_no_image_is_none() {
        assert!(extract_image(&json!({})).is_none());
        assert!(extract_image(&json!({ "candidates": [] })).is_none());
        assert!(extract_image(&json!({ "candidates": [{ "content": null }] })).is_none());
        assert!(extract_image(&json!({
            "candidates": [{ "content": { "parts": [{ "text": "I can't draw that" }] } }]
        }))
        .is_none());
        assert!(extract_image(&json!({ "generatedImages": [] })).is_none());
        assert!(extract_image(&json!("garbage")).is_none());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let jpeg = encode_sample(ImageFormat::Jpeg);
        let response = inline_response("inlineData", "mimeType", &jpeg, "image/jpeg");
        let first = extract_image(&response).unwrap();
        let second = extract_image(&response).unwrap();
        assert_eq!(first, second);

        let text_response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "text": "b" }] } }]
        });
        assert_eq!(extract_text(&text_response), extract_text(&text_response));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "  first" }, { "inlineData": {} }, { "text": 42 }] } },
                { "content": { "parts": [{ "text": "second  " }] } }
            ]
        });
        assert_eq!(extract_text(&response).as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn test_extract_text_empty() {
        assert_eq!(extract_text(&json!({})), None);
        assert_eq!(
            extract_text(&json!({ "candidates": [{ "content": { "parts": [{ "text": "   " }] } }] })),
            None
        );
    }

    #[test]
    fn test_parse_structured_direct() {
        assert_eq!(
            parse_structured(r#"{"title": "Robe"}"#),
            Structured::Json(json!({"title": "Robe"}))
        );
    }

    #[test]
    fn test_parse_structured_recovers_trailing_object() {
        let text = "Voici la fiche demandée :\n{\"title\": \"Jean {slim}\", \"defects\": []}";
        assert_eq!(
            parse_structured(text),
            Structured::Json(json!({"title": "Jean {slim}", "defects": []}))
        );

        let fenced = "Sure! {not json} then:\n```json\n{\"a\": {\"b\": 1}}\n```\nHope it helps.";
        assert_eq!(parse_structured(fenced), Structured::Json(json!({"a": {"b": 1}})));
    }

    #[test]
    fn test_parse_structured_falls_back_to_raw() {
        assert_eq!(
            parse_structured("no json here"),
            Structured::Raw("no json here".to_string())
        );
        assert_eq!(
            parse_structured("broken {\"a\": }"),
            Structured::Raw("broken {\"a\": }".to_string())
        );
    }

    #[test]
    fn test_last_json_object() {
        assert_eq!(last_json_object("x {\"a\":1} y {\"b\":\"}\"} z"), Some("{\"b\":\"}\"}"));
        assert_eq!(last_json_object("no braces"), None);
        assert_eq!(last_json_object("{ unclosed"), None);
        assert_eq!(last_json_object("{not json}"), None);
    }

    #[test]
    fn test_parse_structured_ignores_unmatched_brace_in_prose() {
        assert_eq!(
            parse_structured("Voici la fiche { complète :\n{\"title\": \"Pull\"}"),
            Structured::Json(json!({"title": "Pull"}))
        );
    }

    #[test]
    fn test_parse_structured_ignores_braces_after_object() {
        assert_eq!(
            parse_structured("{\"title\": \"Pull\"}\n(taille {M})"),
            Structured::Json(json!({"title": "Pull"}))
        );
    }
}
