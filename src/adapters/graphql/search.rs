use serde_json::Value;
use url::Url;

use crate::domain::extract::{extract_next_href, extract_search_offers};
use crate::domain::payload::parse_body;
use crate::domain::search_params::SearchParameter;

/// `ListingSearchQuery` as the site's own frontend sends it.
pub const LISTING_SEARCH_QUERY: &str = r"
query ListingSearchQuery(
  $searchParameters: [SearchParameter!] = []
  $fetchJobSummary: Boolean = false
  $fetchPayAndShip: Boolean = false
) {
  clientCompatibleListings(searchParameters: $searchParameters) {
    __typename
    ... on ListingSuccess {
      __typename
      data {
        id
        title
        url
        description
        photos {
          link
          height
          rotation
          width
        }
        location {
          city {
            id
            name
            normalized_name
            _nodeId
          }
          district {
            id
            name
            normalized_name
            _nodeId
          }
          region {
            id
            name
            normalized_name
            _nodeId
          }
        }
        params {
          key
          name
          type
          value {
            __typename
            ... on GenericParam {
              key
              label
            }
            ... on PriceParam {
              value
              type
              label
              currency
              arranged
              budget
              negotiable
            }
          }
        }
        map {
          lat
          lon
          radius
          show_detailed
          zoom
        }
        jobSummary @include(if: $fetchJobSummary) {
          whyApply
          whyApplyTags
        }
        payAndShip @include(if: $fetchPayAndShip) {
          sellerPaidDeliveryEnabled
        }
      }
      links {
        next {
          href
        }
      }
    }
    ... on ListingError {
      __typename
      error {
        code
        detail
        status
        title
        validation {
          detail
          field
          title
        }
      }
    }
  }
}
";

/// Request body of the search call.
pub fn build_search_document(params: &[SearchParameter]) -> Value {
    serde_json::json!({
        "query": LISTING_SEARCH_QUERY,
        "variables": {
            "searchParameters": params,
            "fetchJobSummary": false,
            "fetchPayAndShip": true,
        }
    })
}

/// One page of results: the raw offers it carried and where the next page lives.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub offers: Vec<Value>,
    pub next: Option<Url>,
}

impl SearchPage {
    /// Undecodable bodies are an empty page without a next link.
    pub fn from_body(body: &str, origin: &Url) -> Self {
        match parse_body(body) {
            Some(payload) => Self::from_payload(&payload, origin),
            None => Self::default(),
        }
    }

    pub fn from_payload(payload: &Value, origin: &Url) -> Self {
        Self {
            offers: extract_search_offers(payload),
            next: extract_next_href(payload, origin),
        }
    }
}
