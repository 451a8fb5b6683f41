/// HTTP request handlers
use crate::domain::{Locale, ReadingsQuery};
use crate::errors::ApiError;
use crate::markers::{plan_markers, MapOptions, PlannedMarker};
use crate::services::BuoyService;
use crate::views::{buoy_metadata, sitemap_xml, BuoyPageView};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<BuoyService>,
    pub site_url: String,
    pub mapbox_token: String,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct MapView {
    pub options: MapOptions,
    pub markers: Vec<PlannedMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn parse_locale(raw: &str) -> Result<Locale, ApiError> {
    raw.parse().map_err(ApiError::InvalidInput)
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Buoy page: SEO metadata plus readings, pagination and nearby places.
/// Metadata and detail share one lookup so the buoy is fetched once.
pub async fn buoy_page(
    Path((locale, slug)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<BuoyPageView>>, ApiError> {
    let locale = parse_locale(&locale)?;

    let int = |key: &str| {
        params
            .get(key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(0)
    };
    let query = ReadingsQuery::new(int("hours"), int("page"), int("per_page"));

    let lookup = state.service.lookup();
    let metadata = buoy_metadata(
        lookup.get(&slug).await.as_ref(),
        locale,
        &state.site_url,
        &slug,
    );
    let detail = state.service.buoy_detail(&lookup, &slug, query).await?;

    Ok(Json(SuccessResponse::new(BuoyPageView::new(
        metadata, &detail, locale,
    ))))
}

/// Map setup plus one planned pin per positioned buoy. A failed listing
/// leaves the map usable with no pins.
pub async fn map_view(
    Path(locale): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<MapView>>, ApiError> {
    let locale = parse_locale(&locale)?;
    let options = MapOptions::new(&state.mapbox_token)?;

    let (markers, error) = match state.service.list_all_buoys().await {
        Ok(buoys) => (plan_markers(&buoys, locale), None),
        Err(e) => {
            warn!(error = %e, "buoy listing failed, map shown without markers");
            (Vec::new(), Some(e.to_string()))
        }
    };
    info!(locale = %locale, markers = markers.len(), "map view built");

    Ok(Json(SuccessResponse::new(MapView {
        options,
        markers,
        error,
    })))
}

pub async fn sitemap(State(state): State<AppState>) -> impl IntoResponse {
    let entries = state.service.sitemap(&state.site_url).await;
    (
        [(header::CONTENT_TYPE, "application/xml")],
        sitemap_xml(&entries),
    )
}
