/// Map marker lifecycle: one interactive pin per positioned buoy
use crate::domain::{Buoy, Locale};
use crate::errors::{ApiError, ApiResult};
use crate::views::{buoy_path, meters};
use serde::Serialize;
use std::rc::Rc;
use tracing::debug;

pub const MAP_STYLE: &str = "mapbox://styles/mapbox/light-v11";
/// Atlantic coast
pub const MAP_CENTER: LngLat = LngLat { lng: -3.0, lat: 47.0 };
pub const MAP_ZOOM: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LngLatBounds {
    pub south_west: LngLat,
    pub north_east: LngLat,
}

impl LngLatBounds {
    fn around(p: LngLat) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    fn extend(&mut self, p: LngLat) {
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitBoundsOptions {
    pub padding_px: u32,
    /// Never zoom past this, however tightly the buoys cluster
    pub max_zoom: f64,
    pub duration_ms: u32,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding_px: 80,
            max_zoom: 8.0,
            duration_ms: 1000,
        }
    }
}

/// Options the client needs to create the map itself
#[derive(Debug, Clone, Serialize)]
pub struct MapOptions {
    pub access_token: String,
    pub style: &'static str,
    pub center: LngLat,
    pub zoom: f64,
}

impl MapOptions {
    /// Without a token the map cannot load; this is not retried
    pub fn new(access_token: &str) -> ApiResult<Self> {
        if access_token.trim().is_empty() {
            return Err(ApiError::MapUnavailable(
                "no map access token configured".to_string(),
            ));
        }
        Ok(Self {
            access_token: access_token.to_string(),
            style: MAP_STYLE,
            center: MAP_CENTER,
            zoom: MAP_ZOOM,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DotStyle {
    pub size_px: u8,
    pub border_px: u8,
    pub highlighted: bool,
}

impl DotStyle {
    pub const RESTING: DotStyle = DotStyle {
        size_px: 14,
        border_px: 2,
        highlighted: false,
    };
    pub const HOVERED: DotStyle = DotStyle {
        size_px: 18,
        border_px: 3,
        highlighted: true,
    };
}

/// Visual part of a pin, anchored at its top edge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerElement {
    pub dot: DotStyle,
    /// Wave height, e.g. `1.5m`
    pub label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MarkerEvent {
    MouseEnter,
    MouseLeave,
    Click,
}

pub type MarkerHandler = Box<dyn FnMut(&mut MarkerElement)>;

/// Everything needed to draw one pin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedMarker {
    pub buoy_id: i64,
    pub position: LngLat,
    pub element: MarkerElement,
    pub href: String,
}

/// One pin per buoy with both coordinates; the rest are skipped silently
pub fn plan_markers(buoys: &[Buoy], locale: Locale) -> Vec<PlannedMarker> {
    buoys
        .iter()
        .filter_map(|buoy| {
            let (lat, lng) = buoy.position()?;
            Some(PlannedMarker {
                buoy_id: buoy.id,
                position: LngLat { lng, lat },
                element: MarkerElement {
                    dot: DotStyle::RESTING,
                    label: buoy
                        .last_reading
                        .as_ref()
                        .and_then(|r| r.significant_height)
                        .map(meters),
                },
                href: buoy_path(locale, &buoy.name),
            })
        })
        .collect()
}

pub fn bounds_of(markers: &[PlannedMarker]) -> Option<LngLatBounds> {
    let (first, rest) = markers.split_first()?;
    let mut bounds = LngLatBounds::around(first.position);
    for m in rest {
        bounds.extend(m.position);
    }
    Some(bounds)
}

/// The live map a [`MarkerLayer`] draws on
pub trait MapCanvas {
    type Marker;
    type Listener;

    fn add_marker(&mut self, element: MarkerElement, position: LngLat) -> Self::Marker;
    fn remove_marker(&mut self, marker: Self::Marker);
    fn add_listener(
        &mut self,
        marker: &Self::Marker,
        event: MarkerEvent,
        handler: MarkerHandler,
    ) -> Self::Listener;
    fn remove_listener(&mut self, marker: &Self::Marker, listener: Self::Listener);
    fn fit_bounds(&mut self, bounds: LngLatBounds, options: FitBoundsOptions);
    fn disconnect_resize_observer(&mut self);
}

struct MarkerEntry<M: MapCanvas> {
    marker: M::Marker,
    listeners: Vec<M::Listener>,
}

/// Keeps the pins on a map in step with the current buoy list.
///
/// Pins are (re)built once both the buoy list and the map are ready, and
/// every rebuild removes the previous pins and their listeners first.
/// `teardown` (also run on drop) empties the map and disconnects the
/// resize observer; the layer is inert afterwards.
pub struct MarkerLayer<M: MapCanvas> {
    map: M,
    locale: Locale,
    navigate: Rc<dyn Fn(&str)>,
    buoys: Vec<Buoy>,
    loaded: bool,
    torn_down: bool,
    markers: Vec<MarkerEntry<M>>,
}

impl<M: MapCanvas> MarkerLayer<M> {
    pub fn new(map: M, locale: Locale, navigate: impl Fn(&str) + 'static) -> Self {
        Self {
            map,
            locale,
            navigate: Rc::new(navigate),
            buoys: Vec::new(),
            loaded: false,
            torn_down: false,
            markers: Vec::new(),
        }
    }

    pub fn set_buoys(&mut self, buoys: Vec<Buoy>) {
        self.buoys = buoys;
        if self.loaded {
            self.populate();
        }
    }

    pub fn on_map_loaded(&mut self) {
        self.loaded = true;
        self.populate();
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.clear();
        self.map.disconnect_resize_observer();
        self.loaded = false;
        self.torn_down = true;
    }

    fn clear(&mut self) {
        for entry in std::mem::take(&mut self.markers) {
            for listener in entry.listeners {
                self.map.remove_listener(&entry.marker, listener);
            }
            self.map.remove_marker(entry.marker);
        }
    }

    fn populate(&mut self) {
        if self.torn_down {
            return;
        }
        // old pins go first, or handlers pile up across updates
        self.clear();

        let planned = plan_markers(&self.buoys, self.locale);
        for pin in &planned {
            let marker = self.map.add_marker(pin.element.clone(), pin.position);

            let enter = self.map.add_listener(
                &marker,
                MarkerEvent::MouseEnter,
                Box::new(|el: &mut MarkerElement| el.dot = DotStyle::HOVERED),
            );
            let leave = self.map.add_listener(
                &marker,
                MarkerEvent::MouseLeave,
                Box::new(|el: &mut MarkerElement| el.dot = DotStyle::RESTING),
            );
            let navigate = Rc::clone(&self.navigate);
            let href = pin.href.clone();
            let click = self.map.add_listener(
                &marker,
                MarkerEvent::Click,
                Box::new(move |_: &mut MarkerElement| navigate(&href)),
            );

            self.markers.push(MarkerEntry {
                marker,
                listeners: vec![enter, leave, click],
            });
        }

        if let Some(bounds) = bounds_of(&planned) {
            self.map.fit_bounds(bounds, FitBoundsOptions::default());
        }
        debug!(
            markers = self.markers.len(),
            skipped = self.buoys.len() - planned.len(),
            "map markers populated"
        );
    }
}

impl<M: MapCanvas> Drop for MarkerLayer<M> {
    fn drop(&mut self) {
        self.teardown();
    }
}
