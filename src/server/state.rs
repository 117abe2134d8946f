use crate::{config::Config, error::Result, genai::GenAiClient, storage::StoragePublisher};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub genai: GenAiClient,
    pub publisher: StoragePublisher,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        let genai = GenAiClient::new(&config.genai)?;
        let publisher = StoragePublisher::new(&config.storage).await?;
        Ok(Self::with_parts(config, genai, publisher))
    }

    pub fn with_parts(config: Config, genai: GenAiClient, publisher: StoragePublisher) -> Self {
        Self {
            config,
            genai,
            publisher,
        }
    }
}
