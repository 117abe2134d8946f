use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Substrings that mark a provider refusal on content grounds.
const POLICY_MARKERS: [&str; 5] = [
    "policy",
    "blocked",
    "safety",
    "harm_category",
    "invalid_argument",
];

const UNAVAILABLE_MARKER: &str = "not available";

/// Error raised by the generative-AI provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// HTTP status returned by the provider, when known.
    pub code: Option<u16>,
    /// Symbolic status such as `INVALID_ARGUMENT` or `RESOURCE_EXHAUSTED`.
    pub status: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            code,
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Lower-cased text the classifier matches against.
    fn haystack(&self) -> String {
        match &self.status {
            Some(status) => format!("{} {}", status, self.message).to_lowercase(),
            None => self.message.to_lowercase(),
        }
    }

    /// Buckets the error into a user-facing category.
    ///
    /// The provider exposes no stable error codes beyond the HTTP status, so
    /// everything but rate limiting is decided on message wording.
    pub fn classify(&self) -> ErrorCategory {
        if self.code == Some(429) {
            return ErrorCategory::RateLimited;
        }
        let haystack = self.haystack();
        if haystack.contains(UNAVAILABLE_MARKER) {
            return ErrorCategory::ServiceUnavailable;
        }
        if POLICY_MARKERS.iter().any(|marker| haystack.contains(marker)) {
            return ErrorCategory::PolicyBlocked;
        }
        ErrorCategory::Generic
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, &self.status) {
            (Some(code), Some(status)) => write!(f, "{} {}: {}", code, status, self.message),
            (Some(code), None) => write!(f, "{}: {}", code, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimited,
    ServiceUnavailable,
    PolicyBlocked,
    Generic,
}

impl ErrorCategory {
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCategory::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::ServiceUnavailable => StatusCode::CONFLICT,
            ErrorCategory::PolicyBlocked => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCategory::Generic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::RateLimited => Some("rate limited"),
            ErrorCategory::ServiceUnavailable => Some("service unavailable"),
            ErrorCategory::PolicyBlocked => Some("policy blocked"),
            ErrorCategory::Generic => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    InvalidInput(String),
    /// Well-formed request body that does not match the expected shape.
    #[error("{0}")]
    InvalidSchema(String),
    #[error("Missing GOOGLE_API_KEY or GOOGLE_AI_API_KEY env var")]
    MissingCredentials,
    /// The model answered without the expected payload; the second field
    /// carries its text when there was some.
    #[error("{0}")]
    NoPayload(String, Option<String>),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Object storage is not configured")]
    StorageNotConfigured,
    #[error("Storage error: {0}")]
    StorageFailure(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn no_payload(what: impl Into<String>) -> Self {
        AppError::NoPayload(what.into(), None)
    }

    pub fn no_payload_with_detail(what: impl Into<String>, detail: Option<String>) -> Self {
        AppError::NoPayload(what.into(), detail)
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::Provider(provider_error) => {
                let category = provider_error.classify();
                match category.label() {
                    Some(label) => ErrorBody::with_detail(label, &provider_error.message),
                    None => ErrorBody::new(&provider_error.message),
                }
            }
            AppError::StorageFailure(msg) => ErrorBody::with_detail("storage failure", msg),
            AppError::NoPayload(what, Some(detail)) => ErrorBody::with_detail(what, detail),
            other => ErrorBody::new(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidSchema(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NoPayload(..) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Provider(provider_error) => provider_error.classify().status(),
            AppError::MissingCredentials
            | AppError::StorageNotConfigured
            | AppError::StorageFailure(_)
            | AppError::Config(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
