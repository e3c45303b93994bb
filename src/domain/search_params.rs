use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::Value;
use url::Url;
use url::form_urlencoded;

use super::offer::js_scalar_string;
use crate::error::{OlxMapError, Result};

/// Page size of the search call. Fixed upstream, not configurable.
pub const DEFAULT_LIMIT: u32 = 40;

/// Cookie whose first `-` segment doubles as the session/location token.
const SESSION_COOKIE: &str = "onap";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchParameter {
    pub key: String,
    pub value: String,
}

impl SearchParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// The listing page a load is started from, plus the session's cookie header.
#[derive(Debug, Clone)]
pub struct PageContext {
    url: Url,
    cookie: Option<String>,
}

impl PageContext {
    pub fn new(url: Url, cookie: Option<String>) -> Self {
        Self { url, cookie }
    }

    pub fn parse(page_url: &str, cookie: Option<String>) -> Result<Self> {
        let url = Url::parse(page_url.trim())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OlxMapError::InvalidPage {
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        Ok(Self::new(url, cookie))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Origin used to resolve relative continuation links.
    pub fn origin(&self) -> Url {
        let mut origin = self.url.clone();
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);
        origin
    }

    fn query_value(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn cookie_value(&self, name: &str) -> Option<&str> {
        let prefix = format!("{name}=");
        self.cookie
            .as_deref()?
            .split(';')
            .find_map(|pair| pair.trim().strip_prefix(prefix.as_str()))
    }

    /// Non-empty path segments joined with commas, as the friendly-links endpoint expects.
    pub fn friendly_path(&self) -> String {
        self.url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect::<Vec<_>>().join(","))
            .unwrap_or_default()
    }

    /// The page query with `reason` dropped and `page=2` forced when a `min_id` cursor has no page.
    pub fn forwarded_query(&self) -> String {
        let mut pairs: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != "reason")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let has = |pairs: &[(String, String)], key: &str| pairs.iter().any(|(k, _)| k == key);
        if has(&pairs, "min_id") && !has(&pairs, "page") {
            pairs.push(("page".into(), "2".into()));
        }
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }

    /// Full parameter-resolution URL for this page.
    pub fn friendly_links_url(&self, endpoint_base: &str) -> String {
        let query = self.forwarded_query();
        let mut url = format!("{endpoint_base}{}/", self.friendly_path());
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        url
    }

    pub fn pagination(&self) -> PaginationContext {
        let page = self
            .query_value("page")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|&p| p > 0)
            .unwrap_or(1);

        let last_seen_id = self.query_value("min_id").filter(|v| !v.is_empty());

        let session_token = self
            .query_value("sl")
            .filter(|v| !v.is_empty())
            .or_else(|| self.session_token_from_cookie());

        PaginationContext {
            offset: (page - 1).saturating_mul(DEFAULT_LIMIT),
            limit: DEFAULT_LIMIT,
            last_seen_id,
            session_token,
        }
    }

    fn session_token_from_cookie(&self) -> Option<String> {
        let raw = self.cookie_value(SESSION_COOKIE)?;
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;
        let first = decoded.split('-').next()?.trim();
        (!first.is_empty()).then(|| first.to_string())
    }
}

/// Paging inputs derived once per load action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationContext {
    pub offset: u32,
    pub limit: u32,
    pub last_seen_id: Option<String>,
    pub session_token: Option<String>,
}

impl Default for PaginationContext {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            last_seen_id: None,
            session_token: None,
        }
    }
}

/// Turns a friendly-links response into the ordered `searchParameters` list.
pub fn build_search_parameters(resolution: &Value, ctx: &PaginationContext) -> Vec<SearchParameter> {
    let mut params = vec![
        SearchParameter::new("offset", ctx.offset.to_string()),
        SearchParameter::new("limit", ctx.limit.to_string()),
    ];

    if let Some(data) = resolution.get("data").and_then(Value::as_object) {
        for (key, value) in data {
            match value {
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(v) = js_scalar_string(item) {
                            params.push(SearchParameter::new(format!("{key}[{i}]"), v));
                        }
                    }
                }
                other => {
                    if let Some(v) = js_scalar_string(other) {
                        params.push(SearchParameter::new(key.clone(), v));
                    }
                }
            }
        }
    }

    if let Some(ref id) = ctx.last_seen_id {
        params.push(SearchParameter::new("last_seen_id", id.clone()));
    }
    if let Some(ref sl) = ctx.session_token {
        params.push(SearchParameter::new("sl", sl.clone()));
    }

    params
}
