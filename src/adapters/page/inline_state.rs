use scraper::{Html, Selector};
use serde_json::Value;

const STATE_GLOBAL: &str = "__PRERENDERED_STATE__";

/// Pulls the value assigned to `window.__PRERENDERED_STATE__` out of a page's
/// inline scripts.
///
/// The site assigns a JSON string literal whose content is itself JSON; the
/// literal is returned as `Value::String` and decoded later by the payload parser.
pub fn extract_prerendered_state(html: &str) -> Option<Value> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script:not([src])").ok()?;

    document.select(&selector).find_map(|script| {
        let text = script.text().collect::<String>();
        assigned_value(&text)
    })
}

fn assigned_value(script: &str) -> Option<Value> {
    let mut rest = script;
    while let Some(at) = rest.find(STATE_GLOBAL) {
        rest = &rest[at + STATE_GLOBAL.len()..];
        let Some(rhs) = rest.trim_start().strip_prefix('=') else {
            continue;
        };
        // `==` is a comparison, not an assignment.
        if rhs.starts_with('=') {
            continue;
        }
        let mut values = serde_json::Deserializer::from_str(rhs.trim_start()).into_iter::<Value>();
        if let Some(Ok(value)) = values.next() {
            return Some(value);
        }
    }
    None
}
