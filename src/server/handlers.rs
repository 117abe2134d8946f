use crate::{
    error::{AppError, Result},
    extract::Structured,
    models::{
        image::{ImageBase64Response, OutputMode, ReturnMode},
        ExtractedImage, HealthResponse, PhotoDescribeRequest, PhotoDescription,
        ProductDescribeRequest, RawText,
    },
    normalize,
    server::{multipart::ImageForm, state::AppState},
};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, ResponseError};
use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Logs a failed request once, at the boundary, before it is rendered.
fn logged<T>(endpoint: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        if e.status_code().is_server_error() {
            log::error!("{} failed: {}", endpoint, e);
        } else {
            log::warn!("{} rejected: {}", endpoint, e);
        }
    }
    result
}

/// Renders an image according to the `return` and `as` form fields.
///
/// `return=url` falls back to the inline modes when no bucket is configured.
async fn image_response(
    state: &AppState,
    image: ExtractedImage,
    form: &ImageForm,
    purpose: &str,
) -> Result<HttpResponse> {
    if form.return_mode == ReturnMode::Url {
        match state
            .publisher
            .publish(
                image.bytes.clone(),
                &image.mime_type,
                form.user_id.as_deref(),
                purpose,
            )
            .await
        {
            Ok(upload) => return Ok(HttpResponse::Ok().json(upload)),
            Err(AppError::StorageNotConfigured) => {
                log::warn!("return=url requested but storage is not configured, sending bytes");
            }
            Err(e) => return Err(e),
        }
    }

    match form.output {
        OutputMode::Base64 => Ok(HttpResponse::Ok().json(ImageBase64Response {
            image_base64: STANDARD.encode(&image.bytes),
        })),
        OutputMode::Binary => Ok(HttpResponse::Ok()
            .content_type(image.mime_type)
            .body(image.bytes)),
    }
}

pub async fn generate_image(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse> {
    logged("images/generate", generate(&state, payload).await)
}

async fn generate(state: &AppState, payload: Multipart) -> Result<HttpResponse> {
    let mut form =
        ImageForm::from_multipart(payload, state.config.server.max_upload_bytes).await?;
    let prompt = form.prompt.take().unwrap_or_default();
    let subject = form.image.take().map(|u| u.normalize()).transpose()?;
    let environment = form.environment.take().map(|u| u.normalize()).transpose()?;

    log::info!(
        "Generate request: subject={}, environment={}",
        subject.is_some(),
        environment.is_some()
    );

    let image = state
        .genai
        .image()
        .generate(&prompt, subject, environment)
        .await?
        .into_image("no image")?;

    image_response(state, image, &form, "generate").await
}

pub async fn edit_image(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    logged("images/edit", edit(&state, payload).await)
}

async fn edit(state: &AppState, payload: Multipart) -> Result<HttpResponse> {
    let mut form =
        ImageForm::from_multipart(payload, state.config.server.max_upload_bytes).await?;
    let prompt = form.prompt.take().unwrap_or_default();
    let subject = form.require_image()?;

    let image = state
        .genai
        .image()
        .edit(&prompt, subject)
        .await?
        .into_image("no edited image")?;

    image_response(state, image, &form, "edit").await
}

pub async fn describe_product(
    state: web::Data<AppState>,
    body: web::Json<ProductDescribeRequest>,
) -> Result<HttpResponse> {
    logged("product/describe", product(&state, body.into_inner()).await)
}

async fn product(state: &AppState, request: ProductDescribeRequest) -> Result<HttpResponse> {
    let subject = normalize::from_base64(&request.image_base64)?;
    let described = state
        .genai
        .text()
        .describe_product(subject, request.product.as_ref(), request.hints.as_deref())
        .await?
        .ok_or_else(|| AppError::no_payload("no json"))?;

    Ok(match described {
        Structured::Json(value) => HttpResponse::Ok().json(value),
        Structured::Raw(raw) => {
            log::warn!("Product description was not valid JSON, returning raw text");
            HttpResponse::Ok().json(RawText { raw })
        }
    })
}

pub async fn describe_photo(
    state: web::Data<AppState>,
    body: web::Json<PhotoDescribeRequest>,
) -> Result<HttpResponse> {
    logged("photo/describe", photo(&state, body.into_inner()).await)
}

async fn photo(state: &AppState, request: PhotoDescribeRequest) -> Result<HttpResponse> {
    let subject = normalize::from_base64(&request.image_base64)?;
    let description_text = state
        .genai
        .text()
        .describe_photo(subject)
        .await?
        .ok_or_else(|| AppError::no_payload("no text"))?;

    Ok(HttpResponse::Ok().json(PhotoDescription { description_text }))
}

pub async fn health(state: web::Data<AppState>) -> web::Json<HealthResponse> {
    web::Json(HealthResponse {
        ok: true,
        model_image: state.genai.image().model().to_string(),
        model_text: state.genai.text().model().to_string(),
        storage: state.publisher.is_configured(),
    })
}
