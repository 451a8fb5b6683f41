/// Domain models and upstream API schemas
use crate::utils::{latitude, longitude, num, text};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_HOURS: u32 = 24;
/// Widest readings window a page may ask for (30 days)
pub const MAX_HOURS: u32 = 720;
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const PER_PAGE_OPTIONS: [u32; 4] = [10, 20, 50, 100];

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 200.0;
pub const DEFAULT_NEAREST_LIMIT: u32 = 10;

/// Site languages, `fr` first as the default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 3] = [Locale::Fr, Locale::En, Locale::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::En => "en",
            Locale::Es => "es",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fr" => Ok(Locale::Fr),
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// Summary of the most recent sample attached to a buoy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastReading {
    #[serde(default, alias = "significient_height", deserialize_with = "lenient_f64")]
    pub significant_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maximum_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub period: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub direction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub water_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub unit: Option<String>,
}

/// Fixed oceanographic sensor station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buoy {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_latitude")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_longitude")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_identifier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timezone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_reading_time: Option<String>,
    #[serde(default)]
    pub readings_count: Option<i64>,
    #[serde(default)]
    pub last_reading: Option<LastReading>,
}

impl Buoy {
    /// Both coordinates, when both are usable
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lng?))
    }
}

/// One timestamped measurement sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    /// Empty when the upstream sent no usable timestamp
    #[serde(default, deserialize_with = "lenient_time")]
    pub time: String,
    #[serde(default, alias = "significient_height", deserialize_with = "lenient_f64")]
    pub significant_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub maximum_height: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub period: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub direction: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub water_temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub energy_per_wave: Option<f64>,
    /// Legacy name of `energy_per_wave`
    #[serde(default, deserialize_with = "lenient_f64")]
    pub energy: Option<f64>,
}

impl Reading {
    pub fn energy(&self) -> Option<f64> {
        self.energy_per_wave.or(self.energy)
    }
}

/// Validated parameters for one page of the readings window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadingsQuery {
    pub hours: u32,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ReadingsQuery {
    fn default() -> Self {
        Self {
            hours: DEFAULT_HOURS,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl ReadingsQuery {
    /// Out-of-range values fall back to their defaults instead of failing
    pub fn new(hours: i64, page: i64, per_page: i64) -> Self {
        let hours = u32::try_from(hours)
            .ok()
            .filter(|h| (1..=MAX_HOURS).contains(h))
            .unwrap_or(DEFAULT_HOURS);
        let page = u32::try_from(page)
            .ok()
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE);
        let per_page = u32::try_from(per_page)
            .ok()
            .filter(|n| PER_PAGE_OPTIONS.contains(n))
            .unwrap_or(DEFAULT_PER_PAGE);
        Self {
            hours,
            page,
            per_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

/// Readings slice plus its pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingsPage {
    pub readings: Vec<Reading>,
    pub pagination: Pagination,
}

impl ReadingsPage {
    /// Degraded result used when the upstream call fails
    pub fn empty(query: &ReadingsQuery) -> Self {
        Self {
            readings: Vec::new(),
            pagination: Pagination {
                page: DEFAULT_PAGE,
                per_page: query.per_page,
                total_pages: 0,
                total_count: 0,
            },
        }
    }
}

/// Radius and limit bounded proximity search around a coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestQuery {
    pub lat: f64,
    pub lng: f64,
    pub max_distance_km: f64,
    pub limit: u32,
}

impl NearestQuery {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            limit: DEFAULT_NEAREST_LIMIT,
        }
    }

    pub fn within(mut self, max_distance_km: f64) -> Self {
        self.max_distance_km = max_distance_km;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyBuoy {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_latitude")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_longitude")]
    pub lng: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(deserialize_with = "required_f64")]
    pub distance_km: f64,
    #[serde(default)]
    pub last_reading: Option<LastReading>,
}

/// Surf spot returned by the proximity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_latitude")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_longitude")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "required_f64")]
    pub distance_km: f64,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timezone: Option<String>,
    #[serde(default, alias = "webcam", deserialize_with = "lenient_text")]
    pub webcam_url: Option<String>,
}

/// Anything carrying a distance from the query point
pub trait Distanced {
    fn distance_km(&self) -> f64;
}

impl Distanced for NearbyBuoy {
    fn distance_km(&self) -> f64 {
        self.distance_km
    }
}

impl Distanced for Spot {
    fn distance_km(&self) -> f64 {
        self.distance_km
    }
}

// Upstream envelopes

#[derive(Debug, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, alias = "total_count")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BuoysEnvelope {
    pub data: BuoysData,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct BuoysData {
    pub buoys: Vec<Buoy>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct BuoyEnvelope {
    pub data: BuoyData,
}

#[derive(Debug, Deserialize)]
pub struct BuoyData {
    pub buoy: Buoy,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsEnvelope {
    pub data: ReadingsData,
    #[serde(default)]
    pub meta: PageMeta,
}

#[derive(Debug, Deserialize)]
pub struct ReadingsData {
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub count: Option<u64>,
}

/// `limit=1` answers carry a single `buoy` instead of a `buoys` list
#[derive(Debug, Deserialize)]
pub struct NearestBuoysEnvelope {
    pub data: NearestBuoysData,
}

#[derive(Debug, Default, Deserialize)]
pub struct NearestBuoysData {
    #[serde(default)]
    pub buoys: Vec<NearbyBuoy>,
    #[serde(default)]
    pub buoy: Option<NearbyBuoy>,
}

impl NearestBuoysEnvelope {
    pub fn into_vec(self) -> Vec<NearbyBuoy> {
        let NearestBuoysData { mut buoys, buoy } = self.data;
        if buoys.is_empty() {
            buoys.extend(buoy);
        }
        buoys
    }
}

#[derive(Debug, Deserialize)]
pub struct NearestSpotsEnvelope {
    pub data: NearestSpotsData,
}

#[derive(Debug, Default, Deserialize)]
pub struct NearestSpotsData {
    #[serde(default)]
    pub spots: Vec<Spot>,
    #[serde(default)]
    pub spot: Option<Spot>,
}

impl NearestSpotsEnvelope {
    pub fn into_vec(self) -> Vec<Spot> {
        let NearestSpotsData { mut spots, spot } = self.data;
        if spots.is_empty() {
            spots.extend(spot);
        }
        spots
    }
}

// Lenient numeric decoding: legacy payloads send numbers as strings

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(num(&v).filter(|x| x.is_finite()))
}

fn lenient_latitude<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(latitude(&v))
}

fn lenient_longitude<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(longitude(&v))
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(text(&v))
}

fn lenient_time<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(lenient_text(d)?.unwrap_or_default())
}

fn required_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    num(&v).ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {}", v)))
}
