use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a published object ended up. Nothing keeps it after the response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UploadDescriptor {
    pub key: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// URL handed out for an object, with its expiry when presigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    pub url: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ObjectUrl {
    pub fn public(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
        }
    }

    pub fn presigned(url: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            expires_at: Some(expires_at),
        }
    }
}
