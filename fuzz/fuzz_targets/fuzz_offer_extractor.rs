#![no_main]
use libfuzzer_sys::fuzz_target;

use olx_map::domain::extract::{extract_next_href, extract_search_offers};
use olx_map::domain::offer::{Offer, OfferSource};
use olx_map::domain::payload::parse_body;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data)
        && let Some(payload) = parse_body(text)
    {
        let origin = url::Url::parse("https://www.olx.pl/").unwrap();
        for raw in extract_search_offers(&payload) {
            let _ = Offer::from_raw(&raw, OfferSource::Observed);
        }
        let _ = extract_next_href(&payload, &origin);
    }
});
