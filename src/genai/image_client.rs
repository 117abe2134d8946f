use crate::{
    error::Result,
    extract,
    genai::{request, ContentGenerator},
    logger,
    models::ImageReply,
    normalize::NormalizedImage,
};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ImageClient {
    generator: Arc<dyn ContentGenerator>,
    model: String,
}

impl ImageClient {
    pub fn new(generator: Arc<dyn ContentGenerator>, model: String) -> Self {
        Self { generator, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generates an image from a prompt, optionally grounded on a subject and
    /// an environment photo. A reply without an image is not an error here.
    pub async fn generate(
        &self,
        prompt: &str,
        subject: Option<NormalizedImage>,
        environment: Option<NormalizedImage>,
    ) -> Result<ImageReply> {
        let request = request::generate_request(&self.model, prompt, subject, environment)?;
        let _timer = logger::timer("image generation");
        let response = self.generator.generate_content(&request).await?;
        Ok(reply_from(&response))
    }

    /// Edits `subject` following `prompt`.
    pub async fn edit(
        &self,
        prompt: &str,
        subject: NormalizedImage,
    ) -> Result<ImageReply> {
        let request = request::edit_request(&self.model, prompt, subject)?;
        let _timer = logger::timer("image edit");
        let response = self.generator.generate_content(&request).await?;
        Ok(reply_from(&response))
    }
}

fn reply_from(response: &Value) -> ImageReply {
    ImageReply {
        image: extract::extract_image(response),
        text: extract::extract_text(response),
    }
}
