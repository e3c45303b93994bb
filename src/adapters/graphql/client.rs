use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::config::types::ClientConfig;
use crate::domain::payload::parse_body;
use crate::domain::search_params::{PageContext, SearchParameter};
use crate::error::{OlxMapError, RequestStage, Result};
use crate::ports::transport::{Transport, TransportRequest, TransportResponse};

use super::search::{SearchPage, build_search_document};

/// The three request kinds of a load sequence, over a credentialed transport.
pub struct OlxGraphQLClient {
    transport: Arc<dyn Transport>,
    graphql_url: String,
    friendly_links_url: String,
}

impl OlxGraphQLClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            graphql_url: config.graphql_url(),
            friendly_links_url: config.friendly_links_url(),
        }
    }

    pub fn graphql_url(&self) -> &str {
        &self.graphql_url
    }

    async fn exchange(
        &self,
        stage: RequestStage,
        request: TransportRequest,
    ) -> Result<TransportResponse> {
        let url = request.url.clone();
        debug!(%stage, method = %request.method, url = %url, "Sending request");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(OlxMapError::Status {
                stage,
                status: response.status.as_u16(),
                url,
            });
        }

        debug!(%stage, body_len = response.body.len(), "Response received");
        trace!(%stage, body = %response.body, "Raw response");
        Ok(response)
    }

    /// Resolves the page's human-readable path into structured search parameters.
    pub async fn resolve_parameters(&self, page: &PageContext) -> Result<Value> {
        let url = page.friendly_links_url(&self.friendly_links_url);
        let response = self
            .exchange(RequestStage::FriendlyLinks, TransportRequest::get(url))
            .await?;
        Ok(parse_body(&response.body).unwrap_or(Value::Null))
    }

    pub async fn search(&self, params: &[SearchParameter], origin: &Url) -> Result<SearchPage> {
        let document = build_search_document(params);
        let request = TransportRequest::post(&self.graphql_url, document.to_string())
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("x-client", "DESKTOP");
        let response = self.exchange(RequestStage::Search, request).await?;
        Ok(SearchPage::from_body(&response.body, origin))
    }

    pub async fn fetch_continuation(
        &self,
        url: &Url,
        iteration: u32,
        origin: &Url,
    ) -> Result<SearchPage> {
        let request = TransportRequest::get(url.as_str()).header("accept", "application/json");
        let response = self
            .exchange(RequestStage::Continuation(iteration), request)
            .await?;
        Ok(SearchPage::from_body(&response.body, origin))
    }
}
