use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::cookie::Jar;
use tracing::debug;
use url::Url;

use crate::config::types::ClientConfig;
use crate::error::Result;
use crate::ports::transport::{Transport, TransportRequest, TransportResponse};

/// `Transport` over a reqwest client that carries the browser session's cookies.
///
/// The configured cookies are host-only cookies of `base_url`, so requests to
/// any other host go out without them.
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url)?;
        let jar = Jar::default();
        let pairs = config.cookie.as_deref().unwrap_or_default().split(';');
        for pair in pairs.map(str::trim).filter(|p| p.contains('=')) {
            jar.add_cookie_str(pair, &base);
        }

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .cookie_provider(Arc::new(jar));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            http: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(method = %request.method, url = %request.url, status = status.as_u16(), "Exchange done");
        Ok(TransportResponse { status, body })
    }
}
