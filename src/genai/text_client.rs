use crate::{
    error::Result,
    extract::{self, Structured},
    genai::{request, ContentGenerator},
    logger,
    models::ProductMeta,
    normalize::NormalizedImage,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct TextClient {
    generator: Arc<dyn ContentGenerator>,
    model: String,
}

impl TextClient {
    pub fn new(generator: Arc<dyn ContentGenerator>, model: String) -> Self {
        Self { generator, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Drafts a listing for the garment in `subject`. The model is asked for
    /// JSON; whatever it sends back that does not parse is returned raw.
    pub async fn describe_product(
        &self,
        subject: NormalizedImage,
        product: Option<&ProductMeta>,
        hints: Option<&str>,
    ) -> Result<Option<Structured>> {
        let request = request::product_describe_request(&self.model, subject, product, hints)?;
        let _timer = logger::timer("product description");
        let response = self.generator.generate_content(&request).await?;
        Ok(extract::extract_text(&response).map(|text| extract::parse_structured(&text)))
    }

    /// Describes the background of `subject`, leaving people and clothes out.
    pub async fn describe_photo(&self, subject: NormalizedImage) -> Result<Option<String>> {
        let request = request::photo_describe_request(&self.model, subject);
        let _timer = logger::timer("photo description");
        let response = self.generator.generate_content(&request).await?;
        Ok(extract::extract_text(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::FakeGenerator;
    use crate::models::ContentPart;
    use serde_json::json;

    fn subject() -> NormalizedImage {
        NormalizedImage {
            bytes: vec![9],
            mime_type: "image/png".to_string(),
        }
    }

    fn text_response(parts: &[&str]) -> serde_json::Value {
        let parts: Vec<_> = parts.iter().map(|t| json!({ "text": t })).collect();
        json!({ "candidates": [{ "content": { "parts": parts } }] })
    }

    #[tokio::test]
    async fn test_describe_product_parses_json() {
        let fake = FakeGenerator::replying(text_response(&["{\"title\": \"Veste en jean\"}"]));
        let client = TextClient::new(fake.clone(), "text-model".into());
        let out = client.describe_product(subject(), None, None).await.unwrap();
        assert_eq!(out, Some(Structured::Json(json!({"title": "Veste en jean"}))));

        let sent = fake.last_request();
        assert_eq!(sent.model, "text-model");
        assert!(sent.parts[0].is_text());
        assert_eq!(sent.response_mime_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_describe_product_recovers_split_output() {
        let fake = FakeGenerator::replying(text_response(&["Voici :", "{\"title\": \"Pull\"}"]));
        let client = TextClient::new(fake, "text-model".into());
        let out = client.describe_product(subject(), None, None).await.unwrap();
        assert_eq!(out, Some(Structured::Json(json!({"title": "Pull"}))));
    }

    #[tokio::test]
    async fn test_describe_product_raw_fallback() {
        let fake = FakeGenerator::replying(text_response(&["Désolé, je ne peux pas."]));
        let client = TextClient::new(fake, "text-model".into());
        let out = client.describe_product(subject(), None, None).await.unwrap();
        assert_eq!(out, Some(Structured::Raw("Désolé, je ne peux pas.".into())));
    }

    #[tokio::test]
    async fn test_describe_photo() {
        let fake = FakeGenerator::replying(text_response(&["  Un mur de briques, lumière douce.  "]));
        let client = TextClient::new(fake.clone(), "text-model".into());
        let out = client.describe_photo(subject()).await.unwrap();
        assert_eq!(out.as_deref(), Some("Un mur de briques, lumière douce."));
        let sent = fake.last_request();
        assert_eq!(sent.parts[0], ContentPart::inline("image/png", vec![9]));
    }

    #[tokio::test]
    async fn test_describe_photo_without_text() {
        let fake = FakeGenerator::replying(json!({ "candidates": [] }));
        let client = TextClient::new(fake, "text-model".into());
        assert_eq!(client.describe_photo(subject()).await.unwrap(), None);
    }
}
