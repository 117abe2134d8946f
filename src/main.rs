use vintedboost::{logger, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    logger::init()?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.server.bind_addr(),
    );
    logger::log_config_info(&config);

    if config.genai.api_key.is_none() {
        log::warn!("⚠️  No Gemini API key set, provider calls will fail until one is configured");
    }

    if let Err(e) = vintedboost::server::run(config).await {
        log::error!("❌ Server exited with error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
