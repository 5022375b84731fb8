//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, HttpAssetStore, LocalAssetStore, OpenAiCompletionAdapter},
    config::Config,
    error::ApiError,
    web::{self, middleware::RateLimiter, state::AppState, token::TokenService},
};
use async_openai::{config::OpenAIConfig, Client};
use std::sync::Arc;
use std::time::Duration;
use storynest_core::ports::{AssetStore, TextCompletionService};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bounded startup ping: five attempts, three seconds apart. Failing all of
/// them starts the service in degraded mode rather than aborting.
const DB_CONNECT_ATTEMPTS: u32 = 5;
const DB_CONNECT_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let pool = api_lib::adapters::db::connect_with_retry(
        &config.database_url,
        DB_CONNECT_ATTEMPTS,
        DB_CONNECT_INTERVAL,
    )
    .await
    .map_err(|e| ApiError::Database(e.to_string()))?;
    let db_adapter = Arc::new(DbAdapter::new(pool));
    if let Err(e) = db_adapter.run_migrations().await {
        warn!("Skipping migrations, database unreachable: {e}");
    } else {
        info!("Database migrations complete.");
    }

    // --- 3. Initialize Service Adapters ---
    let assets: Arc<dyn AssetStore> = match &config.asset_host {
        Some(host) => {
            info!("Using external asset host at {}", host.base_url);
            Arc::new(HttpAssetStore::new(host))
        }
        None => {
            info!(
                "No asset host configured; storing uploads in {}",
                config.upload_dir.display()
            );
            Arc::new(LocalAssetStore::new(config.upload_dir.clone()))
        }
    };

    let completions: Option<Arc<dyn TextCompletionService>> = match &config.openai_api_key {
        Some(key) => {
            let openai_config = OpenAIConfig::new().with_api_key(key.clone());
            let client = Client::with_config(openai_config);
            Some(Arc::new(OpenAiCompletionAdapter::new(
                client,
                config.generation_model.clone(),
            )))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; story generation is disabled");
            None
        }
    };

    let tokens = TokenService::new(&config.token_secret);
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));

    // --- 4. Build the Shared AppState and Router ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        assets,
        completions,
        tokens,
        limiter,
        config: config.clone(),
    });
    let app = web::app(app_state);

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
