/// Page view-models: formatted values, placeholders, links and SEO metadata
use crate::domain::{Buoy, Locale, NearbyBuoy, Pagination, Reading, Spot, DEFAULT_PER_PAGE};
use crate::services::{BuoyDetail, SitemapEntry};
use crate::utils::{direction_label, parse_timestamp, slugify};
use chrono::SecondsFormat;
use serde::Serialize;
use std::collections::BTreeMap;

/// Rendered in place of a missing measurement
pub const NO_DATA: &str = "-";

const NOT_AVAILABLE: &str = "N/A";

pub fn meters(value: f64) -> String {
    format!("{:.1}m", value)
}

fn seconds(value: f64) -> String {
    format!("{:.1}s", value)
}

fn celsius(value: f64) -> String {
    format!("{:.1}°C", value)
}

fn bearing(value: f64) -> String {
    format!("{}° {}", value, direction_label(value))
}

fn kilojoules(value: f64) -> String {
    format!("{:.0} kJ", value.round())
}

fn or_placeholder(value: Option<f64>, format: fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| NO_DATA.to_string())
}

pub fn buoy_path(locale: Locale, name: &str) -> String {
    format!("/{}/buoy/{}", locale, slugify(name))
}

/// Link to one page of a buoy's readings; default values stay out of the query
pub fn page_path(locale: Locale, slug: &str, page: u32, per_page: u32) -> String {
    let mut params = Vec::new();
    if page > 1 {
        params.push(format!("page={}", page));
    }
    if per_page != DEFAULT_PER_PAGE {
        params.push(format!("per_page={}", per_page));
    }
    if params.is_empty() {
        format!("/{}/buoy/{}", locale, slug)
    } else {
        format!("/{}/buoy/{}?{}", locale, slug, params.join("&"))
    }
}

/// Page numbers around `current`; `None` marks an ellipsis
pub fn page_numbers(current: u32, total: u32) -> Vec<Option<u32>> {
    const MAX_VISIBLE: u32 = 5;

    if total <= MAX_VISIBLE {
        return (1..=total).map(Some).collect();
    }

    // a page past the end is drawn as the last one
    let current = current.clamp(1, total);
    let mut pages = vec![Some(1)];
    if current > 3 {
        pages.push(None);
    }
    let start = current.saturating_sub(1).max(2);
    let end = current.saturating_add(1).min(total - 1);
    pages.extend((start..=end).map(Some));
    if current.saturating_add(2) < total {
        pages.push(None);
    }
    pages.push(Some(total));
    pages
}

#[derive(Debug, Serialize)]
pub struct ReadingRow {
    pub id: i64,
    pub time: String,
    pub latest: bool,
    pub wave_height: String,
    pub max_height: String,
    pub period: String,
    pub direction: String,
    pub water_temperature: String,
    pub energy: String,
}

impl ReadingRow {
    fn new(reading: &Reading, latest: bool) -> Self {
        let time = parse_timestamp(&reading.time)
            .map(|t| t.format("%d %b %H:%M").to_string())
            .unwrap_or_else(|| {
                if reading.time.is_empty() {
                    NO_DATA.to_string()
                } else {
                    reading.time.clone()
                }
            });
        Self {
            id: reading.id,
            time,
            latest,
            wave_height: or_placeholder(reading.significant_height, meters),
            max_height: or_placeholder(reading.maximum_height, meters),
            period: or_placeholder(reading.period, seconds),
            direction: or_placeholder(reading.direction, bearing),
            water_temperature: or_placeholder(reading.water_temperature, celsius),
            energy: or_placeholder(reading.energy(), kilojoules),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageLink {
    pub page: Option<u32>,
    pub href: Option<String>,
    pub current: bool,
}

#[derive(Debug, Serialize)]
pub struct PaginationView {
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub links: Vec<PageLink>,
}

impl PaginationView {
    fn new(locale: Locale, slug: &str, pagination: &Pagination) -> Self {
        let Pagination {
            page,
            per_page,
            total_pages,
            total_count,
        } = *pagination;
        let link = |p: u32| page_path(locale, slug, p, per_page);

        // a single page needs no controls
        let links = if total_pages > 1 {
            page_numbers(page, total_pages)
                .into_iter()
                .map(|p| PageLink {
                    page: p,
                    href: p.map(link),
                    current: p == Some(page),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            page,
            per_page,
            total_pages,
            total_count,
            previous: (page > 1 && total_pages > 1).then(|| link(page - 1)),
            next: (page < total_pages).then(|| link(page + 1)),
            links,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyBuoyView {
    pub id: i64,
    pub name: String,
    pub source: Option<String>,
    pub href: String,
    pub distance: String,
    pub wave_height: Option<String>,
    pub direction: Option<String>,
}

impl NearbyBuoyView {
    fn new(locale: Locale, buoy: &NearbyBuoy) -> Self {
        let reading = buoy.last_reading.as_ref();
        Self {
            id: buoy.id,
            name: buoy.name.clone(),
            source: buoy.source.clone(),
            href: buoy_path(locale, &buoy.name),
            distance: format!("{:.0} km", buoy.distance_km),
            wave_height: reading.and_then(|r| r.significant_height).map(meters),
            direction: reading.and_then(|r| r.direction).map(bearing),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SpotView {
    pub id: i64,
    pub name: String,
    pub country: Option<String>,
    pub distance: String,
    pub webcam_url: Option<String>,
}

impl From<&Spot> for SpotView {
    fn from(spot: &Spot) -> Self {
        Self {
            id: spot.id,
            name: spot.name.clone(),
            country: spot.country.clone(),
            distance: format!("{:.0} km", spot.distance_km),
            webcam_url: spot.webcam_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BuoyHeader {
    pub id: i64,
    pub name: String,
    pub source: Option<String>,
    pub coordinates: Option<String>,
    pub timezone: String,
    pub last_update: Option<String>,
}

fn coordinates(lat: f64, lng: f64) -> String {
    format!(
        "{:.4}° {}, {:.4}° {}",
        lat.abs(),
        if lat >= 0.0 { 'N' } else { 'S' },
        lng.abs(),
        if lng >= 0.0 { 'E' } else { 'W' }
    )
}

#[derive(Debug, Serialize)]
pub struct BuoyMetadata {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub alternates: BTreeMap<&'static str, String>,
}

/// SEO metadata; a missing buoy still gets a title
pub fn buoy_metadata(
    buoy: Option<&Buoy>,
    locale: Locale,
    site_url: &str,
    slug: &str,
) -> BuoyMetadata {
    let Some(buoy) = buoy else {
        return BuoyMetadata {
            title: "Buoy Not Found".to_string(),
            description: None,
            canonical: None,
            alternates: BTreeMap::new(),
        };
    };

    let url = |l: Locale| format!("{}/{}/buoy/{}", site_url, l, slug);
    let reading = buoy.last_reading.clone().unwrap_or_default();
    let height = reading
        .significant_height
        .map(|h| format!("{:.1}", h))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let period = reading
        .period
        .map(|p| format!("{:.1}", p))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let (title, description) = match locale {
        Locale::Fr => (
            format!("Bouée {} - Données Météo Marine | La Bouée", buoy.name),
            format!(
                "Consultez les données en temps réel de la bouée {} : hauteur des vagues {}m, période {}s{}.",
                buoy.name,
                height,
                period,
                reading
                    .water_temperature
                    .map(|t| format!(", température de l'eau {:.1}°C", t))
                    .unwrap_or_default()
            ),
        ),
        Locale::En => (
            format!("Buoy {} - Marine Weather Data | The Buoy", buoy.name),
            format!(
                "View real-time data from {} buoy: wave height {}m, period {}s{}.",
                buoy.name,
                height,
                period,
                reading
                    .water_temperature
                    .map(|t| format!(", water temperature {:.1}°C", t))
                    .unwrap_or_default()
            ),
        ),
        Locale::Es => (
            format!("Boya {} - Datos Meteorológicos Marinos | La Boya", buoy.name),
            format!(
                "Consulte los datos en tiempo real de la boya {}: altura de olas {}m, período {}s{}.",
                buoy.name,
                height,
                period,
                reading
                    .water_temperature
                    .map(|t| format!(", temperatura del agua {:.1}°C", t))
                    .unwrap_or_default()
            ),
        ),
    };

    BuoyMetadata {
        title,
        description: Some(description),
        canonical: Some(url(locale)),
        alternates: Locale::ALL.iter().map(|l| (l.as_str(), url(*l))).collect(),
    }
}

#[derive(Debug, Serialize)]
pub struct BuoyPageView {
    pub metadata: BuoyMetadata,
    pub buoy: BuoyHeader,
    pub readings: Vec<ReadingRow>,
    pub pagination: PaginationView,
    pub nearby_buoys: Vec<NearbyBuoyView>,
    pub nearby_spots: Vec<SpotView>,
}

impl BuoyPageView {
    pub fn new(metadata: BuoyMetadata, detail: &BuoyDetail, locale: Locale) -> Self {
        let buoy = &detail.buoy;
        let slug = slugify(&buoy.name);
        let first_page = detail.readings.pagination.page == 1;

        let readings = detail
            .readings
            .readings
            .iter()
            .enumerate()
            .map(|(i, r)| ReadingRow::new(r, first_page && i == 0))
            .collect();

        Self {
            metadata,
            buoy: BuoyHeader {
                id: buoy.id,
                name: buoy.name.clone(),
                source: buoy.source.clone(),
                coordinates: buoy.position().map(|(lat, lng)| coordinates(lat, lng)),
                timezone: buoy.timezone.clone().unwrap_or_else(|| "UTC".to_string()),
                last_update: buoy
                    .last_reading
                    .as_ref()
                    .and_then(|r| r.time.as_deref())
                    .and_then(parse_timestamp)
                    .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
            },
            readings,
            pagination: PaginationView::new(locale, &slug, &detail.readings.pagination),
            nearby_buoys: detail
                .nearby_buoys
                .iter()
                .map(|b| NearbyBuoyView::new(locale, b))
                .collect(),
            nearby_spots: detail.nearby_spots.iter().map(SpotView::from).collect(),
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

pub fn sitemap_xml(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            xml_escape(&entry.url),
            entry.last_modified.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.change_frequency.as_str(),
            entry.priority
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LastReading, ReadingsPage};
    use crate::services::ChangeFrequency;
    use chrono::{TimeZone, Utc};

    fn reading(id: i64) -> Reading {
        Reading {
            id,
            time: "2024-01-15T11:30:00Z".to_string(),
            significant_height: None,
            maximum_height: None,
            period: None,
            direction: None,
            water_temperature: None,
            energy_per_wave: None,
            energy: None,
        }
    }

    fn buoy() -> Buoy {
        Buoy {
            id: 7,
            name: "Île d'Yeu".to_string(),
            lat: Some(46.7),
            lng: Some(-2.4),
            source: Some("CANDHIS".to_string()),
            source_identifier: None,
            timezone: None,
            last_reading_time: None,
            readings_count: None,
            last_reading: Some(LastReading {
                significant_height: Some(1.44),
                period: Some(12.0),
                ..LastReading::default()
            }),
        }
    }

    #[test]
    fn test_missing_measurements_render_placeholder() {
        let row = ReadingRow::new(&reading(1), false);
        assert_eq!(row.wave_height, NO_DATA);
        assert_eq!(row.direction, NO_DATA);
        assert_eq!(row.energy, NO_DATA);
        assert_eq!(row.time, "15 Jan 11:30");
    }

    #[test]
    fn test_reading_without_time_shows_placeholder() {
        let mut r = reading(4);
        r.time = String::new();
        assert_eq!(ReadingRow::new(&r, false).time, NO_DATA);

        r.time = "yesterday".to_string();
        assert_eq!(ReadingRow::new(&r, false).time, "yesterday");
    }

    #[test]
    fn test_reading_row_formats_values() {
        let r = Reading {
            significant_height: Some(0.0),
            period: Some(11.24),
            direction: Some(292.0),
            water_temperature: Some(13.45),
            energy: Some(380.6),
            ..reading(2)
        };
        let row = ReadingRow::new(&r, true);
        assert_eq!(row.wave_height, "0.0m");
        assert_eq!(row.period, "11.2s");
        assert_eq!(row.direction, "292° W");
        assert_eq!(row.energy, "381 kJ");
        assert!(row.latest);
    }

    #[test]
    fn test_page_path_omits_defaults() {
        assert_eq!(page_path(Locale::Fr, "anglet", 1, 20), "/fr/buoy/anglet");
        assert_eq!(page_path(Locale::En, "anglet", 2, 20), "/en/buoy/anglet?page=2");
        assert_eq!(
            page_path(Locale::Es, "anglet", 3, 50),
            "/es/buoy/anglet?page=3&per_page=50"
        );
        assert_eq!(page_path(Locale::Fr, "anglet", 1, 10), "/fr/buoy/anglet?per_page=10");
    }

    #[test]
    fn test_page_numbers_with_ellipsis() {
        assert_eq!(page_numbers(1, 3), vec![Some(1), Some(2), Some(3)]);
        assert_eq!(
            page_numbers(1, 10),
            vec![Some(1), Some(2), None, Some(10)]
        );
        assert_eq!(
            page_numbers(5, 10),
            vec![Some(1), None, Some(4), Some(5), Some(6), None, Some(10)]
        );
        assert_eq!(
            page_numbers(10, 10),
            vec![Some(1), None, Some(9), Some(10)]
        );
    }

    #[test]
    fn test_page_numbers_past_the_end() {
        assert_eq!(
            page_numbers(u32::MAX, 10),
            vec![Some(1), None, Some(9), Some(10)]
        );
        assert_eq!(
            page_numbers(u32::MAX, u32::MAX),
            vec![Some(1), None, Some(u32::MAX - 1), Some(u32::MAX)]
        );
        assert_eq!(page_numbers(0, 7)[0], Some(1));
    }

    #[test]
    fn test_metadata_for_missing_buoy() {
        let meta = buoy_metadata(None, Locale::En, "https://labouee.app", "nope");
        assert_eq!(meta.title, "Buoy Not Found");
        assert!(meta.canonical.is_none());
    }

    #[test]
    fn test_metadata_localized() {
        let b = buoy();
        let meta = buoy_metadata(Some(&b), Locale::Fr, "https://labouee.app", "ile-d-yeu");
        assert_eq!(meta.title, "Bouée Île d'Yeu - Données Météo Marine | La Bouée");
        assert_eq!(
            meta.description.as_deref(),
            Some("Consultez les données en temps réel de la bouée Île d'Yeu : hauteur des vagues 1.4m, période 12.0s.")
        );
        assert_eq!(
            meta.canonical.as_deref(),
            Some("https://labouee.app/fr/buoy/ile-d-yeu")
        );
        assert_eq!(meta.alternates.len(), 3);
        assert_eq!(meta.alternates["es"], "https://labouee.app/es/buoy/ile-d-yeu");
    }

    #[test]
    fn test_page_view_marks_latest_on_first_page_only() {
        let b = buoy();
        let mut detail = BuoyDetail {
            buoy: b.clone(),
            readings: ReadingsPage {
                readings: vec![reading(2), reading(1)],
                pagination: Pagination {
                    page: 1,
                    per_page: 20,
                    total_pages: 1,
                    total_count: 2,
                },
            },
            nearby_buoys: Vec::new(),
            nearby_spots: Vec::new(),
        };
        let meta = || buoy_metadata(Some(&b), Locale::En, "https://labouee.app", "ile-d-yeu");

        let view = BuoyPageView::new(meta(), &detail, Locale::En);
        assert!(view.readings[0].latest);
        assert!(!view.readings[1].latest);
        assert!(view.pagination.links.is_empty());
        assert_eq!(view.buoy.coordinates.as_deref(), Some("46.7000° N, 2.4000° W"));
        assert_eq!(view.buoy.timezone, "UTC");

        detail.readings.pagination.page = 2;
        detail.readings.pagination.total_pages = 3;
        let view = BuoyPageView::new(meta(), &detail, Locale::En);
        assert!(!view.readings[0].latest);
        assert_eq!(view.pagination.previous.as_deref(), Some("/en/buoy/ile-d-yeu"));
        assert_eq!(view.pagination.next.as_deref(), Some("/en/buoy/ile-d-yeu?page=3"));
    }

    #[test]
    fn test_sitemap_xml() {
        let entries = vec![SitemapEntry {
            url: "https://labouee.app/fr/buoy/a&b".to_string(),
            last_modified: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            change_frequency: ChangeFrequency::Hourly,
            priority: 0.8,
        }];
        let xml = sitemap_xml(&entries);
        assert!(xml.contains("<loc>https://labouee.app/fr/buoy/a&amp;b</loc>"));
        assert!(xml.contains("<lastmod>2024-01-15T10:30:00Z</lastmod>"));
        assert!(xml.contains("<changefreq>hourly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }
}
