//! Buoy data site backend

use buoy_site::clients::BuoyApiClient;
use buoy_site::config::AppConfig;
use buoy_site::handlers::AppState;
use buoy_site::routes::build_router;
use buoy_site::services::BuoyService;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!(api = %config.api.base_url, "Configuration loaded successfully");
    if config.mapbox_token.is_empty() {
        warn!("MAPBOX_TOKEN is not set, the map endpoint will answer 503");
    }

    // Initialize client and service
    let client = BuoyApiClient::new(&config.api)?;
    let service = Arc::new(BuoyService::new(client));

    // Initialize application state
    let state = AppState {
        service,
        site_url: config.site_url.clone(),
        mapbox_token: config.mapbox_token.clone(),
    };

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("buoy_site listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
