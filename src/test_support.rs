/// In-process stand-in for the buoy API, served by axum on a random port
use crate::utils::slugify;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type Params = HashMap<String, String>;

#[derive(Clone, Default)]
pub struct Upstream {
    /// Buoys served per listing page, page 1 first
    pub buoy_pages: Vec<Vec<Value>>,
    pub failing_page: Option<u32>,
    pub readings_status: Option<u16>,
    pub nearest_status: Option<u16>,
    log: Arc<Mutex<Vec<(String, Params)>>>,
}

impl Upstream {
    /// `pages` pages of `per_page` buoys; buoy ids are `page * 100 + n`
    pub fn with_buoy_pages(pages: u32, per_page: u32) -> Self {
        let buoy_pages = (1..=pages)
            .map(|p| {
                (1..=per_page)
                    .map(|n| {
                        json!({
                            "id": p * 100 + n,
                            "name": format!("Buoy {} {}", p, n),
                            "lat": format!("{}", 43.0 + f64::from(n) / 10.0),
                            "lng": -1.5 - f64::from(p) / 10.0,
                            "source": "CANDHIS",
                            "last_reading_time": "2024-01-15T10:30:00Z",
                            "last_reading": {"significient_height": 1.5, "period": 10.0}
                        })
                    })
                    .collect()
            })
            .collect();
        Self {
            buoy_pages,
            ..Self::default()
        }
    }

    pub fn failing_page(mut self, page: u32) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn readings_status(mut self, status: u16) -> Self {
        self.readings_status = Some(status);
        self
    }

    pub fn nearest_status(mut self, status: u16) -> Self {
        self.nearest_status = Some(status);
        self
    }

    fn record(&self, label: String, params: Params) {
        self.log.lock().unwrap().push((label, params));
    }

    /// Labels of every request received, in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn count(&self, label: &str) -> usize {
        self.requests().iter().filter(|l| *l == label).count()
    }

    pub fn last_params(&self, label: &str) -> Option<Params> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(l, _)| l == label)
            .map(|(_, p)| p.clone())
    }

    fn find_buoy(&self, key: &str) -> Option<Value> {
        self.buoy_pages.iter().flatten().find_map(|b| {
            let name = b["name"].as_str().unwrap_or_default();
            (slugify(name) == key || b["id"].to_string() == key).then(|| b.clone())
        })
    }
}

/// Serve `upstream` and return its base URL
pub async fn spawn_upstream(upstream: Upstream) -> String {
    let app = Router::new()
        .route("/api/v2/buoys", get(list_buoys))
        .route("/api/v2/buoys/nearest", get(nearest_buoys))
        .route("/api/v2/buoys/:key", get(get_buoy))
        .route("/api/v2/buoys/:key/readings", get(readings))
        .route("/api/v2/spots/nearest", get(nearest_spots))
        .with_state(upstream);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/api/v2", addr)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == "Bearer test-key")
        .unwrap_or(false)
}

fn status(code: u16) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

async fn list_buoys(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Query(params): Query<Params>,
) -> Response {
    if !authorized(&headers) {
        return status(401);
    }
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    up.record(format!("buoys?page={}", page), params.clone());

    if up.failing_page == Some(page) {
        return status(500);
    }
    let buoys = (page as usize)
        .checked_sub(1)
        .and_then(|i| up.buoy_pages.get(i))
        .cloned()
        .unwrap_or_default();
    Json(json!({
        "status": "success",
        "data": {"count": buoys.len(), "buoys": buoys},
        "meta": {
            "page": page,
            "per_page": params.get("per_page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(100),
            "total_pages": up.buoy_pages.len(),
            "timestamp": "2024-01-15T12:00:00Z"
        }
    }))
    .into_response()
}

async fn get_buoy(State(up): State<Upstream>, Path(key): Path<String>) -> Response {
    up.record(format!("buoy:{}", key), Params::new());
    match key.as_str() {
        "broken" => status(500),
        "malformed" => Json(json!({"data": {"buoy": {"name": "no id"}}})).into_response(),
        _ => match up.find_buoy(&key) {
            Some(buoy) => Json(json!({"data": {"buoy": buoy}})).into_response(),
            None => status(404),
        },
    }
}

async fn readings(
    State(up): State<Upstream>,
    Path(key): Path<String>,
    Query(params): Query<Params>,
) -> Response {
    up.record(format!("readings:{}", key), params.clone());
    if let Some(code) = up.readings_status {
        return status(code);
    }
    Json(json!({
        "data": {
            "count": 3,
            "readings": [
                {"id": 3, "time": "2024-01-15T11:30:00Z", "significient_height": 1.6, "maximum_height": 2.9,
                 "period": 11.2, "direction": 292.0, "water_temperature": 13.4, "energy_per_wave": 412.4},
                {"id": 2, "time": "2024-01-15T11:00:00Z", "significient_height": "1.5", "period": 11.0,
                 "direction": 285.0, "energy": 380.0},
                {"id": 1, "time": "2024-01-15T10:30:00Z"}
            ]
        },
        "meta": {
            "page": params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
            "per_page": params.get("per_page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(20),
            "total_pages": 2,
            "total": 23
        }
    }))
    .into_response()
}

async fn nearest_buoys(State(up): State<Upstream>, Query(params): Query<Params>) -> Response {
    up.record("buoys/nearest".to_string(), params.clone());
    if let Some(code) = up.nearest_status {
        return status(code);
    }
    let nearby: Vec<Value> = up
        .buoy_pages
        .iter()
        .flatten()
        .enumerate()
        .map(|(i, b)| {
            let mut b = b.clone();
            b["distance_km"] = json!(i as f64 * 7.5);
            b
        })
        .collect();

    if params.get("limit").map(String::as_str) == Some("1") {
        return Json(json!({"data": {"buoy": nearby.first()}})).into_response();
    }
    Json(json!({"data": {"buoys": nearby}})).into_response()
}

async fn nearest_spots(State(up): State<Upstream>, Query(params): Query<Params>) -> Response {
    up.record("spots/nearest".to_string(), params);
    if let Some(code) = up.nearest_status {
        return status(code);
    }
    Json(json!({
        "data": {"spots": [
            {"id": 11, "name": "La Graviere", "lat": 43.67, "lng": -1.44, "distance_km": 4.2, "country": "France", "timezone": "Europe/Paris"},
            {"id": 12, "name": "Ghost Spot", "distance_km": -3.0},
            {"id": 13, "name": "Les Cavaliers", "lat": "43.53", "lng": "-1.52", "distance_km": "9.7", "country": "France"}
        ]}
    }))
    .into_response()
}
