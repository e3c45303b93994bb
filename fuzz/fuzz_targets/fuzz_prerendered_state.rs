#![no_main]
use libfuzzer_sys::fuzz_target;

use olx_map::adapters::page::inline_state::extract_prerendered_state;
use olx_map::domain::extract::extract_embedded_offers;
use olx_map::domain::payload::parse_payload;

fuzz_target!(|data: &[u8]| {
    if let Ok(html) = std::str::from_utf8(data)
        && let Some(state) = extract_prerendered_state(html)
        && let Some(parsed) = parse_payload(Some(&state))
    {
        let _ = extract_embedded_offers(&parsed);
    }
});
