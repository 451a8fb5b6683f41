/// Buoy API client
use crate::config::ApiSettings;
use crate::domain::{
    Buoy, BuoyEnvelope, BuoysEnvelope, Distanced, NearbyBuoy, NearestBuoysEnvelope, NearestQuery,
    NearestSpotsEnvelope, Pagination, ReadingsEnvelope, ReadingsPage, ReadingsQuery, Spot,
    DEFAULT_HOURS,
};
use crate::errors::{ApiError, ApiResult};
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Shared reqwest client for the buoy API: JSON accept header, timeout and,
/// when a key is configured, the bearer token on every request
fn build_http_client(settings: &ApiSettings) -> ApiResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if !settings.api_key.is_empty() {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
            .map_err(|_| {
                ApiError::InvalidInput("API key is not a valid header value".to_string())
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
    }

    Ok(Client::builder()
        .timeout(Duration::from_secs(settings.timeout_seconds))
        .user_agent(concat!("buoy-site/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()?)
}

/// Raw access to the upstream buoy API.
///
/// A 404 stays distinguishable from other failures here: single lookups
/// return `Ok(None)` and proximity searches an empty list. Every other
/// non-success status is an [`ApiError::Status`].
pub struct BuoyApiClient {
    http: Client,
    base_url: Url,
}

impl BuoyApiClient {
    pub fn new(settings: &ApiSettings) -> ApiResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ApiError::InvalidInput(format!("bad API base URL '{}': {}", settings.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidInput(format!(
                "API base URL '{}' cannot carry a path",
                settings.base_url
            )));
        }

        Ok(Self {
            http: build_http_client(settings)?,
            base_url,
        })
    }

    /// Base URL joined with percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, url: Url) -> RequestBuilder {
        self.http.get(url)
    }

    /// Send and decode, mapping every failure to an `ApiError`.
    /// `Ok(None)` means the upstream answered 404.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        label: &str,
        req: RequestBuilder,
    ) -> ApiResult<Option<T>> {
        let resp = req.send().await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            debug!(endpoint = label, "upstream returned 404");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint: label.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ApiError::Decode {
                endpoint: label.to_string(),
                message: e.to_string(),
            })
    }

    /// One page of the buoy listing
    pub async fn fetch_buoys_page(&self, page: u32, per_page: u32) -> ApiResult<BuoysEnvelope> {
        let req = self
            .get(self.endpoint(&["buoys"]))
            .query(&[("per_page", per_page), ("page", page)]);

        self.fetch_json("/buoys", req)
            .await?
            .ok_or_else(|| ApiError::Status {
                endpoint: "/buoys".to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            })
    }

    /// Single buoy by slug or numeric id
    pub async fn fetch_buoy(&self, key: &str) -> ApiResult<Option<Buoy>> {
        let req = self.get(self.endpoint(&["buoys", key]));
        let envelope: Option<BuoyEnvelope> = self.fetch_json("/buoys/{key}", req).await?;
        Ok(envelope.map(|e| e.data.buoy))
    }

    /// Readings recorded in `[now - hours, now]`, one page of them
    pub async fn fetch_readings(
        &self,
        buoy_id: i64,
        query: &ReadingsQuery,
        now: DateTime<Utc>,
    ) -> ApiResult<ReadingsPage> {
        let start = now
            .checked_sub_signed(ChronoDuration::hours(i64::from(query.hours)))
            .unwrap_or_else(|| {
                warn!(hours = query.hours, "readings window out of range, using default");
                now - ChronoDuration::hours(i64::from(DEFAULT_HOURS))
            });
        let id = buoy_id.to_string();

        let req = self
            .get(self.endpoint(&["buoys", &id, "readings"]))
            .query(&[
                ("start_date", start.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("end_date", now.to_rfc3339_opts(SecondsFormat::Millis, true)),
                ("per_page", query.per_page.to_string()),
                ("page", query.page.to_string()),
            ]);

        let envelope: ReadingsEnvelope = self
            .fetch_json("/buoys/{id}/readings", req)
            .await?
            .ok_or_else(|| ApiError::Status {
                endpoint: "/buoys/{id}/readings".to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            })?;

        let meta = envelope.meta;
        let readings = envelope.data.readings;
        let total_count = meta
            .total
            .or(envelope.data.count)
            .unwrap_or(readings.len() as u64);

        Ok(ReadingsPage {
            pagination: Pagination {
                page: if meta.page > 0 { meta.page } else { query.page },
                per_page: if meta.per_page > 0 {
                    meta.per_page
                } else {
                    query.per_page
                },
                total_pages: meta.total_pages,
                total_count,
            },
            readings,
        })
    }

    /// Buoys around a coordinate, nearest first
    pub async fn fetch_nearest_buoys(&self, query: &NearestQuery) -> ApiResult<Vec<NearbyBuoy>> {
        let req = self
            .get(self.endpoint(&["buoys", "nearest"]))
            .query(&nearest_params(query));
        let envelope: Option<NearestBuoysEnvelope> =
            self.fetch_json("/buoys/nearest", req).await?;
        Ok(keep_valid_distances(
            "/buoys/nearest",
            envelope.map(|e| e.into_vec()).unwrap_or_default(),
        ))
    }

    /// Surf spots around a coordinate, nearest first
    pub async fn fetch_nearest_spots(&self, query: &NearestQuery) -> ApiResult<Vec<Spot>> {
        let req = self
            .get(self.endpoint(&["spots", "nearest"]))
            .query(&nearest_params(query));
        let envelope: Option<NearestSpotsEnvelope> =
            self.fetch_json("/spots/nearest", req).await?;
        Ok(keep_valid_distances(
            "/spots/nearest",
            envelope.map(|e| e.into_vec()).unwrap_or_default(),
        ))
    }
}

fn nearest_params(query: &NearestQuery) -> [(&'static str, String); 4] {
    [
        ("lat", query.lat.to_string()),
        ("lng", query.lng.to_string()),
        ("max_distance", query.max_distance_km.to_string()),
        ("limit", query.limit.to_string()),
    ]
}

/// Upstream order is kept; only entries with an impossible distance go
fn keep_valid_distances<T: Distanced>(label: &str, items: Vec<T>) -> Vec<T> {
    let before = items.len();
    let kept: Vec<T> = items
        .into_iter()
        .filter(|item| item.distance_km().is_finite() && item.distance_km() >= 0.0)
        .collect();
    if kept.len() < before {
        warn!(
            endpoint = label,
            dropped = before - kept.len(),
            "dropped entries with invalid distance"
        );
    }
    kept
}
