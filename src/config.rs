use std::env;
use std::time::Duration;

pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PRESIGN_SECS: u64 = 24 * 60 * 60;
/// SigV4 refuses presigned URLs valid for longer than a week.
pub const MAX_PRESIGN_SECS: u64 = 7 * 24 * 60 * 60;
/// Largest single multipart field accepted by the image endpoints.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GenAiConfig {
    pub image_model: String,
    pub text_model: String,
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: String,
    pub public_read: bool,
    pub cdn_domain: Option<String>,
    pub presign_expires_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub genai: GenAiConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First non-empty variable among `names`.
fn first_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| var(name))
}

fn flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}

impl Default for GenAiConfig {
    fn default() -> Self {
        GenAiConfig {
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 120,
        }
    }
}

impl GenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        GenAiConfig {
            image_model: var("GENAI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            text_model: var("GENAI_TEXT_MODEL").unwrap_or(defaults.text_model),
            api_key: first_var(&["GOOGLE_API_KEY", "GOOGLE_AI_API_KEY"]),
            api_base: var("GENAI_API_BASE").unwrap_or(defaults.api_base),
            timeout_secs: var("GENAI_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_models(mut self, image_model: impl Into<String>, text_model: impl Into<String>) -> Self {
        self.image_model = image_model.into();
        self.text_model = text_model.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            bucket: None,
            region: DEFAULT_REGION.to_string(),
            public_read: false,
            cdn_domain: None,
            presign_expires_secs: DEFAULT_PRESIGN_SECS,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        StorageConfig {
            bucket: first_var(&["AWS_S3_BUCKET", "AWS_BUCKET"]),
            region: first_var(&["AWS_REGION", "AWS_DEFAULT_REGION"])
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            public_read: var("S3_PUBLIC_READ").map_or(false, |v| flag(&v)),
            cdn_domain: first_var(&["CDN_DOMAIN", "AWS_S3_PUBLIC_BASE_URL"]),
            presign_expires_secs: var("S3_PRESIGN_EXPIRES_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PRESIGN_SECS),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self.region = region.into();
        self
    }

    pub fn with_public_read(mut self, cdn_domain: Option<String>) -> Self {
        self.public_read = true;
        self.cdn_domain = cdn_domain;
        self
    }

    pub fn with_presign_expiry(mut self, secs: u64) -> Self {
        self.presign_expires_secs = secs;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.bucket.is_some()
    }

    /// Presigned URL lifetime, clamped to what SigV4 accepts.
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expires_secs.clamp(1, MAX_PRESIGN_SECS))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: Vec::new(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        ServerConfig {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            max_upload_bytes: var("MAX_UPLOAD_BYTES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Config {
            genai: GenAiConfig::from_env(),
            storage: StorageConfig::from_env(),
            server: ServerConfig::from_env(),
        }
    }

    pub fn with_genai(mut self, config: GenAiConfig) -> Self {
        self.genai = config;
        self
    }

    pub fn with_storage(mut self, config: StorageConfig) -> Self {
        self.storage = config;
        self
    }

    pub fn with_server(mut self, config: ServerConfig) -> Self {
        self.server = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.genai.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(config.genai.text_model, DEFAULT_TEXT_MODEL);
        assert!(config.genai.api_key.is_none());
        assert!(!config.storage.is_configured());
        assert_eq!(config.storage.presign_expiry(), Duration::from_secs(86_400));
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.server.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example, https://b.example,,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_origins("").is_empty());
    }

    #[test]
    fn test_presign_expiry_is_clamped() {
        let storage = StorageConfig::new().with_presign_expiry(30 * 24 * 60 * 60);
        assert_eq!(storage.presign_expiry(), Duration::from_secs(MAX_PRESIGN_SECS));
        let storage = StorageConfig::new().with_presign_expiry(0);
        assert_eq!(storage.presign_expiry(), Duration::from_secs(1));
    }

    #[test]
    fn test_flag_values() {
        assert!(flag("true"));
        assert!(flag("1"));
        assert!(flag("YES"));
        assert!(!flag("false"));
        assert!(!flag("0"));
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_genai(GenAiConfig::new().with_api_key("k").with_models("img", "txt"))
            .with_storage(
                StorageConfig::new()
                    .with_bucket("bucket", "eu-west-3")
                    .with_public_read(Some("cdn.example.com".into())),
            )
            .with_server(ServerConfig::new().with_port(9000));
        assert_eq!(config.genai.api_key.as_deref(), Some("k"));
        assert_eq!(config.genai.image_model, "img");
        assert!(config.storage.is_configured());
        assert!(config.storage.public_read);
        assert_eq!(config.server.port, 9000);
    }
}
