/// Application routes configuration
use crate::handlers::{buoy_page, health, map_view, sitemap, AppState};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Buoy pages
        .route("/api/:locale/buoys/:slug", get(buoy_page))
        .route("/api/:locale/map", get(map_view))
        // SEO
        .route("/sitemap.xml", get(sitemap))
        .with_state(state)
}
