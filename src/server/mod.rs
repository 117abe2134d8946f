pub mod handlers;
pub mod multipart;
pub mod state;

use crate::{
    config::Config,
    error::{AppError, Result},
};
use actix_cors::Cors;
use actix_web::{
    error::JsonPayloadError,
    middleware::{Condition, Logger},
    web, App, HttpRequest, HttpServer,
};
use serde_json::error::Category;

pub use state::AppState;

/// Base64 images travel in JSON bodies, so the default 32 KiB limit is far
/// too small.
pub const JSON_BODY_LIMIT: usize = 25 * 1024 * 1024;

/// Malformed JSON is a 400; JSON of the wrong shape is a 422.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::warn!("Rejected JSON body: {}", err);
    let error = match &err {
        JsonPayloadError::Deserialize(e) if e.classify() == Category::Data => {
            AppError::InvalidSchema(format!("Invalid request body: {}", e))
        }
        _ => AppError::invalid_input(format!("Invalid JSON body: {}", err)),
    };
    error.into()
}

const HEALTH_PATHS: [&str; 5] = ["/healthz", "/health", "/", "/api/health", "/api/healthz"];

fn api_scope(prefix: &str) -> actix_web::Scope {
    web::scope(prefix)
        .route("/images/generate", web::post().to(handlers::generate_image))
        .route("/images/edit", web::post().to(handlers::edit_image))
        .route("/product/describe", web::post().to(handlers::describe_product))
        .route("/photo/describe", web::post().to(handlers::describe_photo))
}

/// Registers every route. The API lives under both `/v1` and `/api/v1`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(json_error),
    );
    cfg.service(api_scope("/v1")).service(api_scope("/api/v1"));
    for path in HEALTH_PATHS {
        cfg.route(path, web::get().to(handlers::health));
    }
}

/// CORS policy for the configured origins. `*` allows any origin.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default();
    if allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors.allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(600)
}

pub async fn run(config: Config) -> Result<()> {
    let bind_addr = config.server.bind_addr();
    let state = web::Data::new(AppState::new(config).await?);

    log::info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let origins = &state.config.server.allowed_origins;
        App::new()
            .app_data(state.clone())
            .wrap(Condition::new(!origins.is_empty(), cors(origins)))
            .wrap(Logger::default())
            .configure(configure)
    })
    .bind(&bind_addr)
    .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind_addr, e)))?
    .run();

    server
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    log::info!("HTTP server stopped");
    Ok(())
}
