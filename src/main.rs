mod api; // HTTP routes
mod config;
mod errors;
mod handlers;
mod models;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use config::Config;
use handlers::NutritionHandler;
use services::{GeminiClient, ImageFetcher, NutritionPromptBuilder, OpenFoodFactsClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenv().ok();

    env_logger::init();

    log::info!("🚀 Starting CalAI Nutrition API...");

    let config = Config::from_env()?;

    if config.google_api_key.is_none() {
        log::warn!("⚠️ GOOGLE_API_KEY not set, nutrition analysis will fail until it is configured");
    }

    // One model client for the whole process, shared by every request
    let model = Arc::new(GeminiClient::new(
        config.google_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_api_base.clone(),
        config.gemini_timeout,
    )?);
    log::info!("✅ Gemini client initialized with model: {}", model.model());

    let products = Arc::new(OpenFoodFactsClient::new(config.openfoodfacts_base_url.clone())?);
    log::info!("✅ Product lookup initialized: {}", config.openfoodfacts_base_url);

    std::fs::create_dir_all(&config.uploads_dir)?;
    let images = ImageFetcher::new(config.uploads_dir.clone())?;
    log::info!("✅ Uploads directory: {}", images.uploads_dir().display());

    let handler = Arc::new(NutritionHandler::new(
        model.clone(),
        products,
        Arc::new(NutritionPromptBuilder),
        images,
    ));
    log::info!("✅ Nutrition handler initialized");

    #[cfg(feature = "http-server")]
    {
        use api::server::{create_router, AppState};

        let state = Arc::new(AppState {
            handler: handler.clone(),
            uploads_dir: config.uploads_dir.clone(),
            base_url: config.base_url.clone(),
            google_api_configured: model.is_configured(),
            environment: config.environment(),
        });
        let app = create_router(state);

        let addr = config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        log::info!("🌐 HTTP server listening on {} ({})", addr, config.environment());

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                log::info!("🛑 Shutting down...");
            })
            .await?;
    }

    #[cfg(not(feature = "http-server"))]
    {
        let _ = handler;
        log::warn!("⚠️ Built without the http-server feature, nothing to serve");
    }

    Ok(())
}
