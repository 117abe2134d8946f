pub mod s3;
pub mod traits;

use crate::{
    config::StorageConfig,
    error::{AppError, Result},
    models::storage::UploadDescriptor,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub use s3::S3ObjectStorage;
pub use traits::ObjectStorage;

pub const ANONYMOUS_OWNER: &str = "anon";

/// File extension for a content type; unknown types are stored as `jpg`.
pub fn extension_for_mime(mime: &str) -> &'static str {
    let lower = mime.to_ascii_lowercase();
    if lower.contains("png") {
        "png"
    } else if lower.contains("webp") {
        "webp"
    } else if lower.contains("gif") {
        "gif"
    } else {
        "jpg"
    }
}

/// Lower-cases a key segment and replaces anything outside `[a-z0-9._-]`
/// with `-`. Segments made only of dots come back empty.
pub fn sanitize_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for ch in segment.trim().to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-');
    if out.chars().all(|ch| ch == '.') {
        return String::new();
    }
    out.to_string()
}

/// `<owner>/<purpose>/<millis>/<uuid>.<ext>`.
pub fn object_key(owner: Option<&str>, purpose: &str, content_type: &str) -> String {
    let owner = owner
        .map(sanitize_segment)
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| ANONYMOUS_OWNER.to_string());
    let purpose = match sanitize_segment(purpose) {
        p if p.is_empty() => "misc".to_string(),
        p => p,
    };
    format!(
        "{}/{}/{}/{}.{}",
        owner,
        purpose,
        Utc::now().timestamp_millis(),
        Uuid::new_v4(),
        extension_for_mime(content_type)
    )
}

/// Publishes generated images. Holds no backend when no bucket is
/// configured, in which case every publish fails with
/// `StorageNotConfigured`.
#[derive(Clone, Default)]
pub struct StoragePublisher {
    backend: Option<Arc<dyn ObjectStorage>>,
}

impl StoragePublisher {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        if !config.is_configured() {
            log::warn!("No storage bucket configured, URL return mode will fall back to inline bytes");
            return Ok(Self::disabled());
        }
        let backend = S3ObjectStorage::new(config).await?;
        Ok(Self::with_backend(Arc::new(backend)))
    }

    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn with_backend(backend: Arc<dyn ObjectStorage>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub async fn publish(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        owner: Option<&str>,
        purpose: &str,
    ) -> Result<UploadDescriptor> {
        let backend = self.backend.as_ref().ok_or(AppError::StorageNotConfigured)?;
        let key = object_key(owner, purpose, content_type);

        backend.put_object(&key, bytes, content_type).await?;
        let url = backend.object_url(&key).await?;

        log::info!("Published {} ({})", key, content_type);
        Ok(UploadDescriptor {
            key,
            url: url.url,
            expires_at: url.expires_at,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::storage::ObjectUrl;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Keeps objects in memory and serves them from a fake CDN.
    #[derive(Default)]
    pub(crate) struct MemoryStorage {
        pub objects: Mutex<Vec<(String, Vec<u8>, String)>>,
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
            self.objects
                .lock()
                .unwrap()
                .push((key.to_string(), body, content_type.to_string()));
            Ok(())
        }

        async fn object_url(&self, key: &str) -> Result<ObjectUrl> {
            Ok(ObjectUrl::public(format!("https://cdn.test/{}", key)))
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl ObjectStorage for FailingStorage {
        async fn put_object(&self, _key: &str, _body: Vec<u8>, _content_type: &str) -> Result<()> {
            Err(AppError::StorageFailure("access denied".into()))
        }

        async fn object_url(&self, _key: &str) -> Result<ObjectUrl> {
            unreachable!("url requested after failed upload")
        }
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("image/WEBP"), "webp");
        assert_eq!(extension_for_mime("image/gif"), "gif");
        assert_eq!(extension_for_mime("application/octet-stream"), "jpg");
    }

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("User 42"), "user-42");
        assert_eq!(sanitize_segment("../../etc"), "..-..-etc");
        assert_eq!(sanitize_segment("  Émile@shop  "), "mile-shop");
        assert_eq!(sanitize_segment("///"), "");
        assert_eq!(sanitize_segment(".."), "");
        assert_eq!(sanitize_segment(" . "), "");
        assert_eq!(sanitize_segment("v1.2"), "v1.2");
    }

    #[test]
    fn test_dot_segments_fall_back() {
        assert!(object_key(Some(".."), "generate", "image/png").starts_with("anon/generate/"));
        assert!(object_key(Some("."), "..", "image/png").starts_with("anon/misc/"));
    }

    #[test]
    fn test_object_key_layout() {
        let key = object_key(Some("Shop 7"), "generate", "image/png");
        let segments: Vec<&str> = key.split('/').collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "shop-7");
        assert_eq!(segments[1], "generate");
        assert!(segments[2].parse::<i64>().is_ok());
        assert!(segments[3].ends_with(".png"));

        assert!(object_key(None, "edit", "image/png").starts_with("anon/edit/"));
        assert!(object_key(Some("  "), "edit", "image/png").starts_with("anon/edit/"));
    }

    #[test]
    fn test_object_keys_are_unique() {
        let a = object_key(None, "generate", "image/png");
        let b = object_key(None, "generate", "image/png");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_disabled_publisher() {
        let publisher = StoragePublisher::disabled();
        assert!(!publisher.is_configured());
        let err = publisher
            .publish(vec![1], "image/png", None, "generate")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageNotConfigured));
    }

    #[tokio::test]
    async fn test_new_without_bucket_is_disabled() {
        let publisher = StoragePublisher::new(&StorageConfig::new()).await.unwrap();
        assert!(!publisher.is_configured());
    }

    #[tokio::test]
    async fn test_publish_writes_and_returns_url() {
        let memory = Arc::new(MemoryStorage::default());
        let publisher = StoragePublisher::with_backend(memory.clone());
        let upload = publisher
            .publish(vec![7, 7], "image/png", Some("u1"), "generate")
            .await
            .unwrap();

        assert!(upload.key.starts_with("u1/generate/"));
        assert_eq!(upload.url, format!("https://cdn.test/{}", upload.key));
        assert!(upload.expires_at.is_none());

        let objects = memory.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, upload.key);
        assert_eq!(objects[0].1, vec![7, 7]);
        assert_eq!(objects[0].2, "image/png");
    }

    #[tokio::test]
    async fn test_publish_failure_is_storage_failure() {
        let publisher = StoragePublisher::with_backend(Arc::new(FailingStorage));
        let err = publisher
            .publish(vec![1], "image/png", None, "generate")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageFailure(_)));
    }
}
