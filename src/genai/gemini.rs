use crate::{
    config::GenAiConfig,
    error::{AppError, ProviderError, Result},
    genai::ContentGenerator,
    models::GenerateContentRequest,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

/// `generateContent` over the Gemini REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

/// Reads the provider's `{"error": {code, status, message}}` envelope, falling
/// back to the raw body when it is not JSON.
pub fn provider_error_from_body(http_status: u16, body: &str) -> ProviderError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let envelope = parsed.as_ref().and_then(|v| v.get("error"));

    let code = envelope
        .and_then(|e| e.get("code"))
        .and_then(Value::as_u64)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or(http_status);
    let message = envelope
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("Provider returned HTTP {}", http_status)
            } else {
                trimmed.to_string()
            }
        });

    let error = ProviderError::new(Some(code), message);
    match envelope.and_then(|e| e.get("status")).and_then(Value::as_str) {
        Some(status) => error.with_status(status),
        None => error,
    }
}

/// A 200 response can still carry a refusal: no candidates and a
/// `promptFeedback.blockReason`.
pub fn blocked_prompt(response: &Value) -> Option<ProviderError> {
    let has_candidates = response
        .get("candidates")
        .and_then(Value::as_array)
        .map_or(false, |c| !c.is_empty());
    if has_candidates {
        return None;
    }
    let feedback = response
        .get("promptFeedback")
        .or_else(|| response.get("prompt_feedback"))?;
    let reason = feedback
        .get("blockReason")
        .or_else(|| feedback.get("block_reason"))
        .and_then(Value::as_str)?;
    Some(ProviderError::new(None, format!("Prompt blocked: {}", reason)))
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<Value> {
        let api_key = self.api_key.as_deref().ok_or(AppError::MissingCredentials)?;
        let body = request.to_json();

        log::info!("Invoking model: {}", request.model);
        log::debug!(
            "generateContent with {} part(s), {} safety setting(s)",
            request.parts.len(),
            request.safety_settings.len()
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log::error!("Provider request failed: {}", e);
                ProviderError::new(e.status().map(|s| s.as_u16()), e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::new(Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            let error = provider_error_from_body(status.as_u16(), &text);
            log::error!("Provider error: {}", error);
            return Err(error.into());
        }

        let payload: Value = serde_json::from_str(&text).map_err(|e| {
            ProviderError::new(Some(status.as_u16()), format!("Invalid provider response: {}", e))
        })?;

        if let Some(blocked) = blocked_prompt(&payload) {
            log::warn!("{}", blocked);
            return Err(blocked.into());
        }

        Ok(payload)
    }
}
