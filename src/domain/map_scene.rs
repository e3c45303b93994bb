use std::fmt;

use serde::Serialize;

use super::offer::Offer;
use super::presentation::{self, PriceRange};

const SINGLE_POINT_ZOOM: f64 = 13.0;
const FIT_PADDING_PX: u32 = 24;
const FIT_MAX_ZOOM: u32 = 15;

/// Display toggles owned by the live view for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewPreferences {
    pub grouping: bool,
    pub price_coloring: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            grouping: false,
            price_coloring: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerIcon {
    Photo { url: String },
    Dot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub price: String,
    pub location: String,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub icon: MarkerIcon,
    pub price_label: String,
    pub badge_color: String,
    pub popup: Popup,
}

impl MapMarker {
    /// `None` when the offer has no usable coordinates.
    pub fn from_offer(offer: &Offer, range: PriceRange, price_coloring: bool) -> Option<Self> {
        let geo = offer.geo?;
        let raw = &offer.raw;
        let photo_url = presentation::first_photo_url(raw);
        let price_label = presentation::price_display(raw);
        let badge_color =
            presentation::badge_color(presentation::price_numeric(raw), range, price_coloring);
        let icon = match photo_url {
            Some(ref url) => MarkerIcon::Photo { url: url.clone() },
            None => MarkerIcon::Dot,
        };
        Some(Self {
            id: offer.id.clone(),
            lat: geo.lat,
            lon: geo.lon,
            icon,
            price_label: price_label.clone(),
            badge_color,
            popup: Popup {
                title: presentation::title(offer),
                price: price_label,
                location: presentation::location_display(raw),
                description: presentation::description(raw),
                photo_url,
                url: presentation::safe_url(raw),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    Empty,
    Center { lat: f64, lon: f64, zoom: f64 },
    Bounds {
        south: f64,
        west: f64,
        north: f64,
        east: f64,
        padding: u32,
        max_zoom: u32,
    },
}

impl Viewport {
    fn fit(markers: &[MapMarker], single_zoom: Option<f64>) -> Self {
        match markers {
            [] => Self::Empty,
            [only] => Self::Center {
                lat: only.lat,
                lon: only.lon,
                zoom: single_zoom.unwrap_or(SINGLE_POINT_ZOOM),
            },
            [first, rest @ ..] => {
                let init = (first.lat, first.lon, first.lat, first.lon);
                let (south, west, north, east) =
                    rest.iter().fold(init, |(s, w, n, e), m| {
                        (s.min(m.lat), w.min(m.lon), n.max(m.lat), e.max(m.lon))
                    });
                Self::Bounds {
                    south,
                    west,
                    north,
                    east,
                    padding: FIT_PADDING_PX,
                    max_zoom: FIT_MAX_ZOOM,
                }
            }
        }
    }
}

/// Everything a map renderer needs to draw the current collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapScene {
    pub markers: Vec<MapMarker>,
    pub grouping: bool,
    pub viewport: Viewport,
}

impl Default for MapScene {
    fn default() -> Self {
        Self {
            markers: Vec::new(),
            grouping: false,
            viewport: Viewport::Empty,
        }
    }
}

impl MapScene {
    pub fn build<'a>(
        offers: impl IntoIterator<Item = &'a Offer>,
        preferences: ViewPreferences,
    ) -> Self {
        let located: Vec<&Offer> = offers.into_iter().filter(|o| o.is_located()).collect();
        let range = PriceRange::from_offers(located.iter().copied());
        let markers: Vec<MapMarker> = located
            .iter()
            .filter_map(|o| MapMarker::from_offer(o, range, preferences.price_coloring))
            .collect();
        let single_zoom = match located.as_slice() {
            [only] => only.geo.and_then(|g| g.zoom),
            _ => None,
        };
        let viewport = Viewport::fit(&markers, single_zoom);
        Self {
            markers,
            grouping: preferences.grouping,
            viewport,
        }
    }

    pub fn status_line(&self) -> String {
        if self.markers.is_empty() {
            "No coordinates in offer.map (lat/lon).".into()
        } else {
            points_status(self.markers.len())
        }
    }
}

pub fn points_status(count: usize) -> String {
    format!("Points on map: {count}")
}

impl fmt::Display for MapScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.status_line())?;
        writeln!(
            f,
            "Clustering: {}",
            if self.grouping { "on" } else { "off" }
        )?;
        match self.viewport {
            Viewport::Empty => {}
            Viewport::Center { lat, lon, zoom } => {
                writeln!(f, "View: centered at {lat:.5}, {lon:.5} (zoom {zoom})")?;
            }
            Viewport::Bounds {
                south,
                west,
                north,
                east,
                ..
            } => {
                writeln!(
                    f,
                    "View: bounds {south:.5},{west:.5} to {north:.5},{east:.5}"
                )?;
            }
        }
        for (i, m) in self.markers.iter().enumerate() {
            write!(
                f,
                "\n{}. **{}** (ID: {})\n   {} [{}] | {}\n   {:.5}, {:.5}",
                i + 1,
                m.popup.title,
                m.id,
                m.price_label,
                m.badge_color,
                m.popup.location,
                m.lat,
                m.lon,
            )?;
            write!(
                f,
                "\n   {}",
                m.popup.description.as_deref().unwrap_or("No description")
            )?;
            if let Some(ref url) = m.popup.url {
                write!(f, "\n   {url}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
