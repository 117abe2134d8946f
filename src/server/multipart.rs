//! Reads the multipart forms accepted by the image endpoints.

use crate::{
    error::{AppError, Result},
    models::image::{OutputMode, ReturnMode},
    normalize::{self, NormalizedImage},
};
use actix_multipart::{Field, Multipart};
use futures::StreamExt;

/// Raw file part as received.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Upload {
    pub fn normalize(self) -> Result<NormalizedImage> {
        normalize::from_upload(self.bytes, self.content_type.as_deref())
    }
}

#[derive(Debug, Default)]
pub struct ImageForm {
    pub prompt: Option<String>,
    pub image: Option<Upload>,
    pub environment: Option<Upload>,
    pub output: OutputMode,
    pub return_mode: ReturnMode,
    pub user_id: Option<String>,
}

impl ImageForm {
    /// Reads every field, rejecting any single field larger than `limit`
    /// bytes.
    pub async fn from_multipart(mut payload: Multipart, limit: usize) -> Result<Self> {
        let mut form = ImageForm::default();

        while let Some(item) = payload.next().await {
            let mut field = item.map_err(|e| {
                log::warn!("Error reading multipart field: {}", e);
                AppError::invalid_input(format!("Invalid multipart data: {}", e))
            })?;

            let field_name = match field.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            match field_name.as_str() {
                "image" => form.image = Some(read_upload(&mut field, limit).await?),
                "environment" => {
                    form.environment = Some(read_upload(&mut field, limit).await?)
                }
                "prompt" => form.prompt = Some(read_text(&mut field, limit).await?),
                "as" => {
                    let value = read_text(&mut field, limit).await?;
                    form.output = OutputMode::parse(Some(value.as_str()));
                }
                "return" => {
                    let value = read_text(&mut field, limit).await?;
                    form.return_mode = ReturnMode::parse(Some(value.as_str()));
                }
                "user_id" => {
                    let user_id = read_text(&mut field, limit).await?;
                    form.user_id = Some(user_id).filter(|u| !u.trim().is_empty());
                }
                _ => {
                    read_bytes(&mut field, limit).await?;
                }
            }
        }

        Ok(form)
    }

    /// Subject image, required by the edit endpoint.
    pub fn require_image(&mut self) -> Result<NormalizedImage> {
        self.image
            .take()
            .ok_or_else(|| AppError::invalid_input("Missing image"))?
            .normalize()
    }
}

async fn read_bytes(field: &mut Field, limit: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let bytes = chunk.map_err(|e| {
            log::warn!("Error reading multipart chunk: {}", e);
            AppError::invalid_input("Error reading upload")
        })?;
        if data.len() + bytes.len() > limit {
            let name = field.name().unwrap_or("field").to_string();
            return Err(AppError::invalid_input(format!(
                "Field '{}' exceeds {} bytes",
                name, limit
            )));
        }
        data.extend_from_slice(&bytes);
    }
    Ok(data)
}

async fn read_upload(field: &mut Field, limit: usize) -> Result<Upload> {
    let content_type = field.content_type().map(|mime| mime.essence_str().to_string());
    let bytes = read_bytes(field, limit).await?;
    Ok(Upload {
        bytes,
        content_type,
    })
}

async fn read_text(field: &mut Field, limit: usize) -> Result<String> {
    let bytes = read_bytes(field, limit).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
