//! HTTP proxy in front of Gemini for second-hand clothing listings.
//!
//! Generates and edits product photos, drafts listing descriptions and
//! describes photo backgrounds. Generated images can optionally be published
//! to S3 and returned as URLs.

pub mod config;
pub mod error;
pub mod extract;
pub mod genai;
pub mod logger;
pub mod models;
pub mod normalize;
pub mod server;
pub mod storage;

pub use config::{Config, GenAiConfig, ServerConfig, StorageConfig};
pub use error::{AppError, ErrorCategory, ProviderError, Result};
pub use genai::{ContentGenerator, GenAiClient, GeminiClient, ImageClient, TextClient};
pub use server::AppState;
pub use storage::{ObjectStorage, S3ObjectStorage, StoragePublisher};
