use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One piece of a provider request. Order inside a request matters: the
/// model reads earlier images as context for later ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    InlineData { mime_type: String, data: Vec<u8> },
    Text(String),
}

impl ContentPart {
    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        ContentPart::InlineData {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ContentPart::Text(_))
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            ContentPart::InlineData { mime_type, .. } => Some(mime_type),
            ContentPart::Text(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ContentPart::InlineData { mime_type, data } => json!({
                "inlineData": {
                    "mimeType": mime_type,
                    "data": STANDARD.encode(data),
                }
            }),
            ContentPart::Text(text) => json!({ "text": text }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockThreshold {
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: BlockThreshold,
}

impl SafetySetting {
    pub const fn new(category: HarmCategory, threshold: BlockThreshold) -> Self {
        Self {
            category,
            threshold,
        }
    }
}

/// A single-turn `generateContent` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateContentRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub safety_settings: Vec<SafetySetting>,
    pub response_mime_type: Option<String>,
}

impl GenerateContentRequest {
    pub fn new(model: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self {
            model: model.into(),
            parts,
            safety_settings: Vec::new(),
            response_mime_type: None,
        }
    }

    pub fn with_safety_settings(mut self, settings: &[SafetySetting]) -> Self {
        self.safety_settings = settings.to_vec();
        self
    }

    pub fn with_response_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.response_mime_type = Some(mime.into());
        self
    }

    /// Wire body for the REST endpoint; empty sections are left out.
    pub fn to_json(&self) -> Value {
        let parts: Vec<Value> = self.parts.iter().map(ContentPart::to_json).collect();
        let mut body = json!({
            "contents": [{ "role": "user", "parts": parts }],
        });
        if !self.safety_settings.is_empty() {
            body["safetySettings"] = json!(self.safety_settings);
        }
        if let Some(mime) = &self.response_mime_type {
            body["generationConfig"] = json!({ "responseMimeType": mime });
        }
        body
    }
}
