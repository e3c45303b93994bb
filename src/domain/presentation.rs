//! Display helpers over raw offer records, used to build map markers and popups.

use serde_json::Value;

use super::offer::{js_number_string, Offer};

const PHOTO_WIDTH: &str = "516";
const PHOTO_HEIGHT: &str = "361";

pub const NEUTRAL_BADGE: &str = "#111827";
pub const FLAT_RANGE_BADGE: &str = "#166534";

/// Cheapest and most expensive numeric price among the offers on the map.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn from_offers<'a>(offers: impl IntoIterator<Item = &'a Offer>) -> Self {
        offers
            .into_iter()
            .filter_map(|o| price_numeric(&o.raw))
            .fold(Self::default(), |range, price| Self {
                min: Some(range.min.map_or(price, |m| m.min(price))),
                max: Some(range.max.map_or(price, |m| m.max(price))),
            })
    }
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_http(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn price_param(offer: &Value) -> Option<&Value> {
    offer
        .get("params")?
        .as_array()?
        .iter()
        .find(|p| p.get("key").and_then(Value::as_str) == Some("price"))?
        .get("value")
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// First photo of the offer, from `photosSet` (srcset) or the templated `photos[0].link`.
pub fn first_photo_url(offer: &Value) -> Option<String> {
    if let Some(set) = non_blank(offer.pointer("/photosSet/0")) {
        let candidate = set
            .split(',')
            .next()
            .and_then(|c| c.split_whitespace().next());
        if let Some(url) = candidate
            && is_http(url)
        {
            return Some(url.to_string());
        }
    }

    let link = non_blank(offer.pointer("/photos/0/link"))?;
    if !is_http(link) {
        return None;
    }
    Some(
        link.replace("{width}", PHOTO_WIDTH)
            .replace("{height}", PHOTO_HEIGHT),
    )
}

pub fn price_display(offer: &Value) -> String {
    let price = offer.get("price");
    if let Some(display) = non_blank(price.and_then(|p| p.get("displayValue"))) {
        return display.to_string();
    }

    let regular = price.and_then(|p| p.get("regularPrice"));
    if let Some(value) = regular.and_then(|r| r.get("value")).and_then(Value::as_number) {
        let symbol = regular
            .and_then(|r| r.get("currencySymbol"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        return with_unit(&js_number_string(value), symbol);
    }

    let flag = |name: &str| price.and_then(|p| p.get(name)).and_then(Value::as_bool) == Some(true);
    if flag("free") {
        return "Free".into();
    }
    if flag("exchange") {
        return "Exchange".into();
    }
    if flag("budget") {
        return "Negotiable".into();
    }

    if let Some(param) = price_param(offer) {
        if let Some(label) = non_blank(param.get("label")) {
            return label.to_string();
        }
        if let Some(value) = param.get("value").and_then(Value::as_number) {
            let currency = param
                .get("currency")
                .and_then(Value::as_str)
                .unwrap_or_default();
            return with_unit(&js_number_string(value), currency);
        }
        if param.get("arranged").and_then(Value::as_bool) == Some(true)
            || param.get("type").and_then(Value::as_str) == Some("arranged")
        {
            return "Negotiable".into();
        }
        if param.get("budget").and_then(Value::as_bool) == Some(true) {
            return "Budget".into();
        }
    }

    "No price".into()
}

fn with_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

/// Numeric price used for color scaling.
pub fn price_numeric(offer: &Value) -> Option<f64> {
    finite(offer.pointer("/price/regularPrice/value"))
        .or_else(|| finite(price_param(offer).and_then(|p| p.get("value"))))
}

/// Badge color for a marker: green for the cheapest offer, red for the priciest.
pub fn badge_color(price: Option<f64>, range: PriceRange, coloring: bool) -> String {
    let (Some(price), Some(min), Some(max)) = (price, range.min, range.max) else {
        return NEUTRAL_BADGE.into();
    };
    if !coloring {
        return NEUTRAL_BADGE.into();
    }
    if max <= min {
        return FLAT_RANGE_BADGE.into();
    }
    let ratio = ((price - min) / (max - min)).clamp(0.0, 1.0);
    let hue = 120.0 - ratio * 120.0;
    format!("hsl({hue:.0} 75% 35%)")
}

pub fn location_display(offer: &Value) -> String {
    let Some(location) = offer.get("location").filter(|l| l.is_object()) else {
        return "No location".into();
    };

    if let Some(path) = non_blank(location.get("pathName")) {
        return path.to_string();
    }

    let name = |flat: &str, nested: &str| {
        non_blank(location.get(flat)).or_else(|| non_blank(location.pointer(nested)))
    };
    let parts: Vec<&str> = [
        name("regionName", "/region/name"),
        name("cityName", "/city/name"),
        name("districtName", "/district/name"),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        "No location".into()
    } else {
        parts.join(", ")
    }
}

/// The offer URL, only when it is an http(s) link.
pub fn safe_url(offer: &Value) -> Option<String> {
    let url = non_blank(offer.get("url"))?;
    is_http(url).then(|| url.to_string())
}

/// Raw description text as the listing supplied it, if any.
pub fn description(offer: &Value) -> Option<String> {
    non_blank(offer.get("description")).map(str::to_string)
}

pub fn title(offer: &Offer) -> String {
    non_blank(offer.raw.get("title"))
        .map_or_else(|| format!("Offer {}", offer.id), str::to_string)
}
