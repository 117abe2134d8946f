pub mod gemini;
pub mod image_client;
pub mod request;
pub mod text_client;

use crate::{config::GenAiConfig, error::Result, models::GenerateContentRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use gemini::GeminiClient;
pub use image_client::ImageClient;
pub use text_client::TextClient;

/// Anything that can answer a `generateContent` call.
///
/// The response is returned as loose JSON; `crate::extract` knows how to
/// read it.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_content(&self, request: &GenerateContentRequest) -> Result<Value>;
}

#[derive(Clone)]
pub struct GenAiClient {
    image_client: ImageClient,
    text_client: TextClient,
}

impl GenAiClient {
    pub fn new(config: &GenAiConfig) -> Result<Self> {
        let generator: Arc<dyn ContentGenerator> = Arc::new(GeminiClient::new(config)?);
        Ok(Self::with_generator(generator, config))
    }

    /// Builds the clients on top of any generator, e.g. a test double.
    pub fn with_generator(generator: Arc<dyn ContentGenerator>, config: &GenAiConfig) -> Self {
        Self {
            image_client: ImageClient::new(generator.clone(), config.image_model.clone()),
            text_client: TextClient::new(generator, config.text_model.clone()),
        }
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }
}
