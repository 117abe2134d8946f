//! Builds the ordered content parts for each endpoint.

use crate::{
    error::{AppError, Result},
    models::{
        BlockThreshold, ContentPart, GenerateContentRequest, HarmCategory, ProductMeta,
        SafetySetting,
    },
    normalize::NormalizedImage,
};

pub const GENERATION_SAFETY_SETTINGS: [SafetySetting; 4] = [
    SafetySetting::new(HarmCategory::SexuallyExplicit, BlockThreshold::BlockNone),
    SafetySetting::new(HarmCategory::Harassment, BlockThreshold::BlockOnlyHigh),
    SafetySetting::new(HarmCategory::HateSpeech, BlockThreshold::BlockOnlyHigh),
    SafetySetting::new(HarmCategory::DangerousContent, BlockThreshold::BlockOnlyHigh),
];

pub const JSON_MIME: &str = "application/json";

const PRODUCT_PERSONA: &str = "Tu es un assistant e-commerce Vinted. Rédige en FRANÇAIS clair et précis. \
Réponds UNIQUEMENT en JSON strict.";

const PRODUCT_INSTRUCTION: &str =
    "À partir de la photo du vêtement et des infos fournies, génère une fiche Vinted complète.";

const PRODUCT_SCHEMA: &str = r#"{"title": string, "brand": string|null, "model": string|null, "category": string|null, "condition": string, "defects": string[], "measurements": {"longueur": string|null, "poitrine": string|null, "epaules": string|null, "manches": string|null}, "care": string[], "keywords": string[], "bulletPoints": string[], "descriptionText": string}"#;

pub const PHOTO_INSTRUCTION: &str = "Ignore toute personne/corps/vêtement/accessoire. \
Décris uniquement l'environnement, arrière-plan, ambiance lumineuse, style et éléments de décor visibles.";

const NO_HINTS: &str = "(aucun)";

fn require_prompt(prompt: &str) -> Result<String> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::invalid_input("Missing prompt"));
    }
    Ok(prompt.to_string())
}

/// `[environment] [subject] [prompt]`, with the generation safety settings.
pub fn generate_request(
    model: &str,
    prompt: &str,
    subject: Option<NormalizedImage>,
    environment: Option<NormalizedImage>,
) -> Result<GenerateContentRequest> {
    let prompt = require_prompt(prompt)?;
    let mut parts = Vec::with_capacity(3);
    if let Some(environment) = environment {
        parts.push(environment.into_part());
    }
    if let Some(subject) = subject {
        parts.push(subject.into_part());
    }
    parts.push(ContentPart::text(prompt));
    Ok(GenerateContentRequest::new(model, parts).with_safety_settings(&GENERATION_SAFETY_SETTINGS))
}

/// `[subject] [prompt]`.
pub fn edit_request(
    model: &str,
    prompt: &str,
    subject: NormalizedImage,
) -> Result<GenerateContentRequest> {
    let prompt = require_prompt(prompt)?;
    Ok(GenerateContentRequest::new(
        model,
        vec![subject.into_part(), ContentPart::text(prompt)],
    ))
}

fn product_text(product: Option<&ProductMeta>, hints: Option<&str>) -> Result<String> {
    let meta = match product {
        Some(product) => serde_json::to_string(product)?,
        None => "{}".to_string(),
    };
    let hints = hints
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(NO_HINTS);
    Ok(format!(
        "{PRODUCT_PERSONA}\n\n{PRODUCT_INSTRUCTION}\n\nSchema attendu:\n{PRODUCT_SCHEMA}\n\nInfos vêtement: {meta}\nIndices: {hints}"
    ))
}

/// `[instructions + schema] [subject]`, asking for strict JSON output.
pub fn product_describe_request(
    model: &str,
    subject: NormalizedImage,
    product: Option<&ProductMeta>,
    hints: Option<&str>,
) -> Result<GenerateContentRequest> {
    let text = product_text(product, hints)?;
    Ok(
        GenerateContentRequest::new(model, vec![ContentPart::text(text), subject.into_part()])
            .with_response_mime_type(JSON_MIME),
    )
}

/// `[subject] [instruction]`; the model is told to describe only the scene.
pub fn photo_describe_request(model: &str, subject: NormalizedImage) -> GenerateContentRequest {
    GenerateContentRequest::new(
        model,
        vec![subject.into_part(), ContentPart::text(PHOTO_INSTRUCTION)],
    )
}
