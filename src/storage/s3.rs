use crate::{
    config::StorageConfig,
    error::{AppError, Result},
    models::storage::ObjectUrl,
    storage::traits::ObjectStorage,
};
use async_trait::async_trait;
use aws_sdk_s3::{presigning::PresigningConfig, primitives::ByteStream, Client};
use chrono::Utc;
use std::time::Duration;

pub const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// How URLs are handed out for stored objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlMode {
    /// Stable public URL under `base`.
    Public { base: String },
    Presigned { expires_in: Duration },
}

impl UrlMode {
    pub fn from_config(config: &StorageConfig, bucket: &str) -> Self {
        if config.public_read {
            let base = match config.cdn_domain.as_deref() {
                Some(domain) => cdn_base(domain),
                None => format!("https://{}.s3.{}.amazonaws.com", bucket, config.region),
            };
            UrlMode::Public { base }
        } else {
            UrlMode::Presigned {
                expires_in: config.presign_expiry(),
            }
        }
    }
}

fn cdn_base(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

#[derive(Clone)]
pub struct S3ObjectStorage {
    client: Client,
    bucket: String,
    url_mode: UrlMode,
}

impl S3ObjectStorage {
    /// Loads AWS credentials from the default provider chain.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let bucket = config
            .bucket
            .clone()
            .ok_or(AppError::StorageNotConfigured)?;

        let aws_config = aws_config::from_env()
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;

        log::info!(
            "S3 storage initialized: bucket={}, region={}, public={}",
            bucket,
            config.region,
            config.public_read
        );

        Ok(Self::with_client(Client::new(&aws_config), config, bucket))
    }

    pub fn with_client(client: Client, config: &StorageConfig, bucket: String) -> Self {
        let url_mode = UrlMode::from_config(config, &bucket);
        Self {
            client,
            bucket,
            url_mode,
        }
    }

    pub fn url_mode(&self) -> &UrlMode {
        &self.url_mode
    }
}

#[async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .cache_control(CACHE_CONTROL)
            .send()
            .await
            .map_err(|e| {
                log::error!("S3 upload failed for {}: {:?}", key, e);
                AppError::StorageFailure(format!("S3 upload failed: {}", e))
            })?;

        log::debug!("Object uploaded to S3: {}", key);
        Ok(())
    }

    async fn object_url(&self, key: &str) -> Result<ObjectUrl> {
        match &self.url_mode {
            UrlMode::Public { base } => Ok(ObjectUrl::public(format!("{}/{}", base, key))),
            UrlMode::Presigned { expires_in } => {
                let presigning = PresigningConfig::expires_in(*expires_in)
                    .map_err(|e| AppError::StorageFailure(format!("Presigning config: {}", e)))?;
                let request = self
                    .client
                    .get_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .presigned(presigning)
                    .await
                    .map_err(|e| AppError::StorageFailure(format!("Presigning failed: {}", e)))?;
                let expires_at = Utc::now()
                    + chrono::Duration::from_std(*expires_in)
                        .map_err(|e| AppError::Internal(e.to_string()))?;
                Ok(ObjectUrl::presigned(request.uri().to_string(), expires_at))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    fn offline_client(region: &str) -> Client {
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(Credentials::new(
                "AKIDEXAMPLE",
                "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
                None,
                None,
                "tests",
            ))
            .build();
        Client::from_conf(config)
    }

    fn storage(config: StorageConfig) -> S3ObjectStorage {
        let bucket = config.bucket.clone().unwrap();
        S3ObjectStorage::with_client(offline_client(&config.region), &config, bucket)
    }

    #[test]
    fn test_cdn_base() {
        assert_eq!(cdn_base("cdn.example.com/"), "https://cdn.example.com");
        assert_eq!(cdn_base("http://cdn.example.com"), "http://cdn.example.com");
    }

    #[tokio::test]
    async fn test_public_url_uses_cdn_domain() {
        let store = storage(
            StorageConfig::new()
                .with_bucket("listings", "eu-west-3")
                .with_public_read(Some("cdn.vinted-boost.example".into())),
        );
        let url = store.object_url("anon/generate/1/a.png").await.unwrap();
        assert_eq!(url.url, "https://cdn.vinted-boost.example/anon/generate/1/a.png");
        assert!(url.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_public_url_regional_fallback() {
        let store = storage(
            StorageConfig::new()
                .with_bucket("listings", "eu-west-3")
                .with_public_read(None),
        );
        let url = store.object_url("k.png").await.unwrap();
        assert_eq!(url.url, "https://listings.s3.eu-west-3.amazonaws.com/k.png");
    }

    #[tokio::test]
    async fn test_presigned_url_carries_expiry_signature() {
        let store = storage(StorageConfig::new().with_bucket("listings", "eu-west-3"));
        assert_eq!(
            store.url_mode(),
            &UrlMode::Presigned {
                expires_in: Duration::from_secs(86_400)
            }
        );
        let url = store.object_url("anon/edit/1/b.png").await.unwrap();
        assert!(url.url.contains("anon/edit/1/b.png"));
        assert!(url.url.contains("X-Amz-Expires=86400"));
        assert!(url.url.contains("X-Amz-Signature="));
        let expires_at = url.expires_at.unwrap();
        assert!(expires_at > Utc::now() + chrono::Duration::hours(23));
    }
}
