/// Business logic services layer
use crate::clients::BuoyApiClient;
use crate::domain::{
    Buoy, Locale, NearbyBuoy, NearestQuery, ReadingsPage, ReadingsQuery, Spot,
};
use crate::errors::{ApiError, ApiResult};
use crate::utils::{parse_timestamp, slugify};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Page size used when walking the whole buoy listing
pub const LISTING_PAGE_SIZE: u32 = 100;
pub const NEARBY_RADIUS_KM: f64 = 200.0;
/// Nearby buoys and spots shown on a buoy page
pub const NEARBY_SHOWN: usize = 5;

/// Buoy data access with the site's degradation policy applied
pub struct BuoyService {
    client: BuoyApiClient,
}

impl BuoyService {
    pub fn new(client: BuoyApiClient) -> Self {
        Self { client }
    }

    /// Every buoy, pages requested strictly in order. Any failed page fails
    /// the whole call so callers never see a silently truncated list.
    pub async fn list_all_buoys(&self) -> ApiResult<Vec<Buoy>> {
        let mut buoys = Vec::new();
        let mut page = 1;

        loop {
            let envelope = self
                .client
                .fetch_buoys_page(page, LISTING_PAGE_SIZE)
                .await
                .map_err(|e| {
                    error!(page, error = %e, "buoy listing failed");
                    e
                })?;

            buoys.extend(envelope.data.buoys);
            if page >= envelope.meta.total_pages {
                break;
            }
            page += 1;
        }

        info!(count = buoys.len(), pages = page, "buoy listing fetched");
        Ok(buoys)
    }

    /// Readings window for a buoy. Never fails: upstream trouble yields an
    /// empty page with zeroed totals.
    pub async fn readings_page(&self, buoy_id: i64, query: ReadingsQuery) -> ReadingsPage {
        match self.client.fetch_readings(buoy_id, &query, Utc::now()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(buoy_id, error = %e, "readings unavailable, rendering empty page");
                ReadingsPage::empty(&query)
            }
        }
    }

    pub async fn nearest_buoys(&self, query: &NearestQuery) -> Vec<NearbyBuoy> {
        self.client
            .fetch_nearest_buoys(query)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "nearest buoys unavailable");
                Vec::new()
            })
    }

    pub async fn nearest_spots(&self, query: &NearestQuery) -> Vec<Spot> {
        self.client
            .fetch_nearest_spots(query)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "nearest spots unavailable");
                Vec::new()
            })
    }

    /// Fresh lookup scope for one incoming request
    pub fn lookup(&self) -> BuoyLookup<'_> {
        BuoyLookup {
            client: &self.client,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Everything shown on a buoy page. The three reads after the lookup are
    /// independent and run concurrently.
    pub async fn buoy_detail(
        &self,
        lookup: &BuoyLookup<'_>,
        key: &str,
        query: ReadingsQuery,
    ) -> ApiResult<BuoyDetail> {
        let buoy = lookup
            .try_get(key)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("buoy '{}'", key)))?;

        let (readings, mut nearby_buoys, mut nearby_spots) = match buoy.position() {
            Some((lat, lng)) => {
                let nearest = NearestQuery::new(lat, lng).within(NEARBY_RADIUS_KM);
                tokio::join!(
                    self.readings_page(buoy.id, query),
                    self.nearest_buoys(&nearest),
                    self.nearest_spots(&nearest),
                )
            }
            None => {
                warn!(buoy_id = buoy.id, "buoy has no usable position, skipping nearby search");
                (self.readings_page(buoy.id, query).await, Vec::new(), Vec::new())
            }
        };

        nearby_buoys.retain(|b| b.id != buoy.id);
        nearby_buoys.truncate(NEARBY_SHOWN);
        nearby_spots.truncate(NEARBY_SHOWN);

        Ok(BuoyDetail {
            buoy,
            readings,
            nearby_buoys,
            nearby_spots,
        })
    }

    /// Landing page per locale plus every buoy page per locale. A failed
    /// listing is logged and leaves only the landing pages.
    pub async fn sitemap(&self, site_url: &str) -> Vec<SitemapEntry> {
        let now = Utc::now();
        let mut entries: Vec<SitemapEntry> = Locale::ALL
            .iter()
            .map(|locale| SitemapEntry {
                url: format!("{}/{}", site_url, locale),
                last_modified: now,
                change_frequency: ChangeFrequency::Daily,
                priority: 1.0,
            })
            .collect();

        match self.list_all_buoys().await {
            Ok(buoys) => {
                for buoy in &buoys {
                    let slug = slugify(&buoy.name);
                    let last_modified = buoy
                        .last_reading_time
                        .as_deref()
                        .and_then(parse_timestamp)
                        .unwrap_or(now);
                    entries.extend(Locale::ALL.iter().map(|locale| SitemapEntry {
                        url: format!("{}/{}/buoy/{}", site_url, locale, slug),
                        last_modified,
                        change_frequency: ChangeFrequency::Hourly,
                        priority: 0.8,
                    }));
                }
            }
            Err(e) => error!(error = %e, "sitemap built without buoy pages"),
        }

        entries
    }
}

#[derive(Debug, Clone)]
pub struct BuoyDetail {
    pub buoy: Buoy,
    pub readings: ReadingsPage,
    pub nearby_buoys: Vec<NearbyBuoy>,
    pub nearby_spots: Vec<Spot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Hourly,
    Daily,
}

impl ChangeFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

#[derive(Debug, Clone)]
struct FailedLookup {
    status: Option<u16>,
    message: String,
}

type LookupOutcome = Result<Option<Buoy>, FailedLookup>;

/// Request-scoped memo of buoy lookups.
///
/// Built by [`BuoyService::lookup`] for a single incoming request and
/// dropped with it. Callers asking for the same key, concurrently or not,
/// share one upstream call.
pub struct BuoyLookup<'a> {
    client: &'a BuoyApiClient,
    cells: Mutex<HashMap<String, Arc<OnceCell<LookupOutcome>>>>,
}

impl BuoyLookup<'_> {
    async fn resolve(&self, key: &str) -> LookupOutcome {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(key.to_string()).or_default().clone()
        };

        cell.get_or_init(|| async {
            match self.client.fetch_buoy(key).await {
                Ok(buoy) => Ok(buoy),
                Err(e) => {
                    error!(key, error = %e, "buoy lookup failed");
                    Err(FailedLookup {
                        status: e.upstream_status(),
                        message: e.to_string(),
                    })
                }
            }
        })
        .await
        .clone()
    }

    /// Not-found is `Ok(None)`; upstream trouble is an error
    pub async fn try_get(&self, key: &str) -> ApiResult<Option<Buoy>> {
        self.resolve(key).await.map_err(|failed| match failed.status {
            Some(status) => ApiError::Status {
                endpoint: "/buoys/{key}".to_string(),
                status,
            },
            None => ApiError::Unavailable(failed.message),
        })
    }

    /// Not-found and upstream trouble both read as `None`
    pub async fn get(&self, key: &str) -> Option<Buoy> {
        self.resolve(key).await.ok().flatten()
    }
}
