use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// Where a record was collected from. Diagnostics only, never used for merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSource {
    Observed,
    Prerendered,
    InitialSearch,
    Continuation(u32),
}

impl fmt::Display for OfferSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observed => write!(f, "observed"),
            Self::Prerendered => write!(f, "prerendered"),
            Self::InitialSearch => write!(f, "graphql-load"),
            Self::Continuation(n) => write!(f, "continuation-{n}"),
        }
    }
}

impl Serialize for OfferSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub radius: Option<f64>,
    pub zoom: Option<f64>,
}

impl GeoPoint {
    /// Reads the `map` block of a raw offer. Both coordinates must be finite.
    pub fn from_map(map: &Value) -> Option<Self> {
        let lat = coerce_number(map.get("lat")?)?;
        let lon = coerce_number(map.get("lon")?)?;
        Some(Self {
            lat,
            lon,
            radius: map.get("radius").and_then(coerce_number),
            zoom: map.get("zoom").and_then(coerce_number),
        })
    }
}

/// One listing as held by the offer store.
#[derive(Debug, Clone, Serialize)]
pub struct Offer {
    /// Canonical (string) id, the store key.
    pub id: String,
    pub raw: Value,
    pub geo: Option<GeoPoint>,
    pub source: OfferSource,
}

impl Offer {
    /// Builds an offer from a raw record, or `None` when it is not an object or has no usable id.
    pub fn from_raw(raw: &Value, source: OfferSource) -> Option<Self> {
        if !raw.is_object() {
            return None;
        }
        let id = canonical_id(raw.get("id")?)?;
        let geo = raw.get("map").and_then(GeoPoint::from_map);
        Some(Self {
            id,
            raw: raw.clone(),
            geo,
            source,
        })
    }

    pub fn is_located(&self) -> bool {
        self.geo.is_some()
    }
}

/// Normalizes a listing id so that `5`, `5.0` and `"5"` share one key.
/// Any scalar is a key, the empty string included.
pub fn canonical_id(id: &Value) -> Option<String> {
    js_scalar_string(id)
}

/// String form of a scalar: integral numbers lose their fraction, booleans print as words.
/// Objects, arrays and null have no scalar form.
pub fn js_scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(js_number_string(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn js_number_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        #[allow(clippy::cast_possible_truncation)]
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Numbers and numeric strings as `f64`, finite results only.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_and_string_ids_share_a_key() {
        assert_eq!(canonical_id(&json!(5)), Some("5".into()));
        assert_eq!(canonical_id(&json!("5")), Some("5".into()));
        assert_eq!(canonical_id(&json!(5.0)), Some("5".into()));
    }

    #[test]
    fn empty_string_id_is_its_own_key() {
        assert_eq!(canonical_id(&json!("")), Some(String::new()));
        let offer = Offer::from_raw(&json!({"id": "", "title": "x"}), OfferSource::Observed).unwrap();
        assert_eq!(offer.id, "");
    }

    #[test]
    fn fractional_id_keeps_fraction() {
        assert_eq!(canonical_id(&json!(1.5)), Some("1.5".into()));
    }

    #[test]
    fn unusable_ids_are_rejected() {
        assert!(canonical_id(&json!(null)).is_none());
        assert!(canonical_id(&json!({"id": 1})).is_none());
        assert!(canonical_id(&json!([1])).is_none());
    }

    #[test]
    fn offer_from_raw_extracts_geo() {
        let raw = json!({"id": 7, "map": {"lat": 52.1, "lon": 21.0, "zoom": 13, "radius": 2}});
        let offer = Offer::from_raw(&raw, OfferSource::Observed).unwrap();
        assert_eq!(offer.id, "7");
        let geo = offer.geo.unwrap();
        assert!((geo.lat - 52.1).abs() < f64::EPSILON);
        assert_eq!(geo.zoom, Some(13.0));
        assert_eq!(geo.radius, Some(2.0));
    }

    #[test]
    fn geo_is_none_without_finite_coordinates() {
        let missing = json!({"id": 1});
        assert!(Offer::from_raw(&missing, OfferSource::Observed).unwrap().geo.is_none());

        let partial = json!({"id": 1, "map": {"lat": 52.1}});
        assert!(Offer::from_raw(&partial, OfferSource::Observed).unwrap().geo.is_none());

        let garbage = json!({"id": 1, "map": {"lat": "north", "lon": 21.0}});
        assert!(Offer::from_raw(&garbage, OfferSource::Observed).unwrap().geo.is_none());
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let raw = json!({"id": "a", "map": {"lat": "52.25", "lon": " 21.01 "}});
        let geo = Offer::from_raw(&raw, OfferSource::Prerendered).unwrap().geo.unwrap();
        assert!((geo.lon - 21.01).abs() < 1e-9);
    }

    #[test]
    fn non_objects_are_not_offers() {
        assert!(Offer::from_raw(&json!("x"), OfferSource::Observed).is_none());
        assert!(Offer::from_raw(&json!(null), OfferSource::Observed).is_none());
        assert!(Offer::from_raw(&json!({"title": "no id"}), OfferSource::Observed).is_none());
    }

    #[test]
    fn source_labels() {
        assert_eq!(OfferSource::Observed.to_string(), "observed");
        assert_eq!(OfferSource::Prerendered.to_string(), "prerendered");
        assert_eq!(OfferSource::InitialSearch.to_string(), "graphql-load");
        assert_eq!(OfferSource::Continuation(2).to_string(), "continuation-2");
    }

    #[test]
    fn js_scalar_string_matches_string_coercion() {
        assert_eq!(js_scalar_string(&json!(true)), Some("true".into()));
        assert_eq!(js_scalar_string(&json!(40)), Some("40".into()));
        assert_eq!(js_scalar_string(&json!("abc")), Some("abc".into()));
        assert!(js_scalar_string(&json!({})).is_none());
    }
}
