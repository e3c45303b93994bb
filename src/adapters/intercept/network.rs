use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::domain::extract::extract_search_offers;
use crate::domain::offer::OfferSource;
use crate::domain::payload::parse_payload;
use crate::error::Result;
use crate::ports::transport::{Transport, TransportRequest, TransportResponse};
use crate::session::collector::{OfferCollector, RenderMode};

/// Passive observer of search responses the page itself receives.
pub struct NetworkTap {
    target_url: String,
    collector: Arc<OfferCollector>,
}

impl NetworkTap {
    pub fn new(target_url: impl Into<String>, collector: Arc<OfferCollector>) -> Self {
        Self {
            target_url: target_url.into(),
            collector,
        }
    }

    /// POST to the search endpoint, with or without a query string.
    pub fn matches(&self, method: &Method, url: &str) -> bool {
        if *method != Method::POST {
            return false;
        }
        url == self.target_url
            || url
                .strip_prefix(self.target_url.as_str())
                .is_some_and(|rest| rest.starts_with('?'))
    }

    /// Merges whatever offers `payload` carries. Returns how many ids were new.
    pub fn observe(&self, payload: Option<&Value>) -> usize {
        let Some(parsed) = parse_payload(payload) else {
            return 0;
        };
        let offers = extract_search_offers(&parsed);
        if offers.is_empty() {
            return 0;
        }
        let added = self
            .collector
            .merge(&offers, OfferSource::Observed, RenderMode::Refresh);
        debug!(
            records = offers.len(),
            added = added.len(),
            "Observed search response"
        );
        added.len()
    }

    /// Starts tracking one request made with the open/send style API.
    pub fn open(&self, method: Method, url: impl Into<String>) -> TappedRequest<'_> {
        TappedRequest {
            tap: self,
            method,
            url: url.into(),
        }
    }
}

/// A request whose method and URL are remembered until its response loads.
pub struct TappedRequest<'a> {
    tap: &'a NetworkTap,
    method: Method,
    url: String,
}

impl TappedRequest<'_> {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `response` may be JSON text or an already-structured value.
    pub fn on_load(self, response: &Value) -> usize {
        if !self.tap.matches(&self.method, &self.url) {
            return 0;
        }
        self.tap.observe(Some(response))
    }
}

/// Forwards every exchange to `inner` unchanged and shows matching search
/// responses to the tap on the way back.
pub struct ObservingTransport<T> {
    inner: T,
    tap: Arc<NetworkTap>,
}

impl<T: Transport> ObservingTransport<T> {
    pub fn new(inner: T, tap: Arc<NetworkTap>) -> Self {
        Self { inner, tap }
    }

    pub fn tap(&self) -> &Arc<NetworkTap> {
        &self.tap
    }
}

#[async_trait]
impl<T: Transport> Transport for ObservingTransport<T> {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let observed = self.tap.matches(&request.method, &request.url);
        let response = self.inner.send(request).await?;
        if observed {
            self.tap
                .observe(Some(&Value::String(response.body.clone())));
        }
        Ok(response)
    }
}
