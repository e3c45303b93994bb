//! Locating listing arrays and next-page links inside known response shapes.
//!
//! Upstream has shipped some field names under two spellings. Both spellings
//! are tried, in the order below, and neither is assumed to be dead.

use serde_json::Value;
use url::Url;

/// Candidate paths for the listing array of a search-style response, in priority order.
pub const SEARCH_OFFER_PATHS: [&str; 5] = [
    "/data/clientCompatibleListings/data",
    "/data/clientComptabileListings/data",
    "/data",
    "/data/clientCompatibleObservedAds/data",
    "/data/clientComptaibleObservedAds/data",
];

/// Where the prerendered page state keeps its listings.
pub const EMBEDDED_OFFERS_PATH: &str = "/listing/listing/ads";

/// Candidate paths for the continuation link, in priority order.
pub const NEXT_HREF_PATHS: [&str; 4] = [
    "/data/clientComptabileListings/links/next/href",
    "/data/clientCompatibleListings/links/next/href",
    "/links/next/href",
    "/data/links/next/href",
];

/// Raw listing records of a search response, or nothing when no known path holds an array.
pub fn extract_search_offers(payload: &Value) -> Vec<Value> {
    first_array(payload, &SEARCH_OFFER_PATHS)
}

/// Raw listing records of a prerendered state blob.
pub fn extract_embedded_offers(state: &Value) -> Vec<Value> {
    first_array(state, &[EMBEDDED_OFFERS_PATH])
}

/// The next-page link of a paged response, resolved against `origin`.
pub fn extract_next_href(payload: &Value, origin: &Url) -> Option<Url> {
    NEXT_HREF_PATHS.iter().find_map(|path| {
        let href = payload.pointer(path)?.as_str()?.trim();
        if href.is_empty() {
            return None;
        }
        origin.join(href).ok()
    })
}

fn first_array(payload: &Value, paths: &[&str]) -> Vec<Value> {
    paths
        .iter()
        .find_map(|path| payload.pointer(path).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn origin() -> Url {
        Url::parse("https://www.olx.pl").unwrap()
    }

    #[test]
    fn listings_success_path() {
        let payload = json!({
            "data": {"clientCompatibleListings": {"__typename": "ListingSuccess", "data": [{"id": 1}, {"id": 2}]}}
        });
        assert_eq!(extract_search_offers(&payload).len(), 2);
    }

    #[test]
    fn misspelled_listings_alias() {
        let payload = json!({"data": {"clientComptabileListings": {"data": [{"id": 9}]}}});
        let offers = extract_search_offers(&payload);
        assert_eq!(offers, vec![json!({"id": 9})]);
    }

    #[test]
    fn correct_spelling_wins_over_alias() {
        let payload = json!({"data": {
            "clientCompatibleListings": {"data": [{"id": "right"}]},
            "clientComptabileListings": {"data": [{"id": "alias"}]}
        }});
        assert_eq!(extract_search_offers(&payload)[0]["id"], "right");
    }

    #[test]
    fn top_level_data_array_fallback() {
        let payload = json!({"data": [{"id": 1}, {"id": 2}, {"id": 3}]});
        assert_eq!(extract_search_offers(&payload).len(), 3);
    }

    #[test]
    fn observed_ads_and_alias() {
        let observed = json!({"data": {"clientCompatibleObservedAds": {"data": [{"id": 1}]}}});
        assert_eq!(extract_search_offers(&observed).len(), 1);
        let alias = json!({"data": {"clientComptaibleObservedAds": {"data": [{"id": 1}, {"id": 2}]}}});
        assert_eq!(extract_search_offers(&alias).len(), 2);
    }

    #[test]
    fn non_array_candidates_are_skipped() {
        let payload = json!({"data": {
            "clientCompatibleListings": {"data": {"not": "an array"}},
            "clientComptabileListings": {"data": [{"id": 4}]}
        }});
        assert_eq!(extract_search_offers(&payload)[0]["id"], 4);
    }

    #[test]
    fn missing_paths_yield_empty() {
        assert!(extract_search_offers(&json!({})).is_empty());
        assert!(extract_search_offers(&json!(null)).is_empty());
        assert!(extract_search_offers(&json!({"data": null})).is_empty());
        assert!(extract_search_offers(&json!({"data": {"clientCompatibleListings": null}})).is_empty());
        assert!(extract_search_offers(&json!("text")).is_empty());
    }

    #[test]
    fn error_shape_yields_empty() {
        let payload = json!({"data": {"clientCompatibleListings": {
            "__typename": "ListingError",
            "error": {"code": 400, "detail": "bad", "status": 400, "title": "Bad", "validation": []}
        }}});
        assert!(extract_search_offers(&payload).is_empty());
    }

    #[test]
    fn embedded_state_ads() {
        let state = json!({"listing": {"listing": {"ads": [{"id": 1}]}}});
        assert_eq!(extract_embedded_offers(&state).len(), 1);
        assert!(extract_embedded_offers(&json!({"listing": null})).is_empty());
        assert!(extract_embedded_offers(&json!({"listing": {"listing": {}}})).is_empty());
    }

    #[test]
    fn next_href_relative_is_resolved() {
        let payload = json!({"data": {"clientCompatibleListings": {"links": {"next": {"href": "/api/v1/offers/?offset=40"}}}}});
        let next = extract_next_href(&payload, &origin()).unwrap();
        assert_eq!(next.as_str(), "https://www.olx.pl/api/v1/offers/?offset=40");
    }

    #[test]
    fn next_href_misspelled_alias_is_tried_first() {
        let payload = json!({"data": {
            "clientComptabileListings": {"links": {"next": {"href": "https://www.olx.pl/a"}}},
            "clientCompatibleListings": {"links": {"next": {"href": "https://www.olx.pl/b"}}}
        }});
        assert_eq!(extract_next_href(&payload, &origin()).unwrap().path(), "/a");
    }

    #[test]
    fn next_href_top_level_links() {
        let payload = json!({"data": [], "links": {"next": {"href": "https://www.olx.pl/api/v1/offers/?offset=80"}}});
        assert!(extract_next_href(&payload, &origin()).is_some());
        let nested = json!({"data": {"links": {"next": {"href": "/x"}}}});
        assert!(extract_next_href(&nested, &origin()).is_some());
    }

    #[test]
    fn blank_or_missing_href_is_none() {
        assert!(extract_next_href(&json!({"links": {"next": {"href": "  "}}}), &origin()).is_none());
        assert!(extract_next_href(&json!({"links": {"next": null}}), &origin()).is_none());
        assert!(extract_next_href(&json!({"links": {"next": {"href": 5}}}), &origin()).is_none());
        assert!(extract_next_href(&json!(null), &origin()).is_none());
    }
}
