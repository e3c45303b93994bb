use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use reqwest::Method;
use serde_json::Value;

use crate::adapters::graphql::client::OlxGraphQLClient;
use crate::adapters::intercept::network::{NetworkTap, ObservingTransport};
use crate::adapters::intercept::prerendered::PrerenderedStateTap;
use crate::adapters::page::inline_state::extract_prerendered_state;
use crate::adapters::page::state_slot::PageStateSlot;
use crate::adapters::view::scene_view::SceneView;
use crate::config::types::Config;
use crate::domain::extract::extract_embedded_offers;
use crate::domain::map_scene::ViewPreferences;
use crate::domain::payload::parse_payload;
use crate::domain::presentation;
use crate::ports::live_view::LiveView;
use crate::ports::state_source::StateSource;
use crate::ports::transport::{Transport, TransportRequest};
use crate::session::collector::OfferCollector;
use crate::session::{LoadOutcome, MapSession};

const MAP_URI: &str = "olx://map";
const OFFER_URI_PREFIX: &str = "olx://offers/";

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct LoadOffersToolParams {
    /// Address of an OLX search results page (e.g. "https://www.olx.pl/nieruchomosci/mieszkania/warszawa/?page=2")
    pub page_url: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ViewOptionsToolParams {
    /// Group nearby markers into clusters
    pub grouping: Option<bool>,
    /// Color price badges from green (cheapest) to red (most expensive)
    pub price_coloring: Option<bool>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CapturePageToolParams {
    /// Address of the OLX page whose prerendered state should be captured
    pub page_url: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ObserveResponseToolParams {
    /// HTTP method of the captured request (e.g. "POST")
    pub method: String,
    /// URL the captured request was sent to
    pub url: String,
    /// Response body exactly as received
    pub body: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct PageRequestToolParams {
    /// HTTP method (e.g. "GET", "POST")
    pub method: String,
    /// Absolute URL to request
    pub url: String,
    /// Optional request body, sent as JSON
    pub body: Option<String>,
}

// ---------- Server ----------

/// Everything the server drives, wired together.
pub struct MapComponents {
    pub session: Arc<MapSession>,
    pub view: Arc<SceneView>,
    pub slot: Arc<PageStateSlot>,
    pub tap: Arc<NetworkTap>,
    /// Page-side traffic: search responses passing through it are observed.
    pub page_transport: Arc<dyn Transport>,
}

impl MapComponents {
    /// Builds the collector, taps and session around one credentialed transport.
    pub fn assemble(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let view = Arc::new(SceneView::new());
        let live: Arc<dyn LiveView> = view.clone();
        let preferences = ViewPreferences {
            grouping: config.view.grouping_enabled,
            price_coloring: config.view.price_coloring_enabled,
        };
        let collector = Arc::new(OfferCollector::new(
            live,
            preferences,
            Duration::from_millis(config.view.marker_pace_ms),
        ));

        let client = OlxGraphQLClient::new(Arc::clone(&transport), &config.client);
        let tap = Arc::new(NetworkTap::new(client.graphql_url(), Arc::clone(&collector)));
        let page_transport: Arc<dyn Transport> =
            Arc::new(ObservingTransport::new(transport, Arc::clone(&tap)));
        let session = Arc::new(MapSession::new(
            collector,
            client,
            config.client.cookie.clone(),
        ));
        let slot = Arc::new(PageStateSlot::new(config.state_tap.observe_reassignment));

        Self {
            session,
            view,
            slot,
            tap,
            page_transport,
        }
    }

    /// Starts the prerendered-state tap on the slot. Needs a running runtime.
    pub fn install_state_tap(&self, config: &Config) {
        let source: Arc<dyn StateSource> = self.slot.clone();
        let delays: Vec<Duration> = config
            .state_tap
            .sample_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect();
        PrerenderedStateTap::new(source, Arc::clone(self.session.collector())).install(&delays);
    }
}

#[derive(Clone)]
pub struct OlxMapServer {
    session: Arc<MapSession>,
    view: Arc<SceneView>,
    slot: Arc<PageStateSlot>,
    tap: Arc<NetworkTap>,
    page_transport: Arc<dyn Transport>,
    tool_router: ToolRouter<Self>,
}

fn parse_method(method: &str) -> Option<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).ok()
}

#[tool_router]
impl OlxMapServer {
    pub fn new(components: MapComponents) -> Self {
        Self {
            session: components.session,
            view: components.view,
            slot: components.slot,
            tap: components.tap,
            page_transport: components.page_transport,
            tool_router: Self::tool_router(),
        }
    }

    fn collector(&self) -> &Arc<OfferCollector> {
        self.session.collector()
    }

    /// Load offers for an OLX search page through the site's own search API.
    #[tool(
        name = "olx_load_offers",
        description = "Load offers for an OLX search results page: resolves the page's filters, runs the GraphQL search and follows up to 5 next-page links. Offers are added to the map collection. Returns a status line.",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn olx_load_offers(
        &self,
        Parameters(params): Parameters<LoadOffersToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let page = match self.session.page_context(&params.page_url) {
            Ok(page) => page,
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "{e}. Pass the full address of an OLX search page, e.g. https://www.olx.pl/nieruchomosci/mieszkania/."
                ))]));
            }
        };

        let outcome = self.session.load_more(&page).await;
        match outcome {
            LoadOutcome::Completed { .. } => {
                let mut text = outcome.status_message().unwrap_or_default();
                let _ = write!(
                    text,
                    "\nOffers collected: {} ({} with coordinates)",
                    self.collector().len(),
                    self.collector().offers().iter().filter(|o| o.is_located()).count(),
                );
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            LoadOutcome::Failed(ref e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "{}\n{e}",
                outcome.status_message().unwrap_or_default()
            ))])),
            LoadOutcome::AlreadyRunning => Ok(CallToolResult::success(vec![Content::text(
                "A load is already in progress; nothing was started.",
            )])),
        }
    }

    /// Open the map view and render every collected offer.
    #[tool(
        name = "olx_open_map",
        description = "Open the map view and render every collected offer that has coordinates. Returns the rendered map.",
        annotations(read_only_hint = false, open_world_hint = false)
    )]
    async fn olx_open_map(&self) -> Result<CallToolResult, McpError> {
        self.collector().open_view();
        Ok(CallToolResult::success(vec![Content::text(
            self.view.snapshot(),
        )]))
    }

    #[tool(
        name = "olx_close_map",
        description = "Close the map view. Offers keep being collected while it is closed.",
        annotations(read_only_hint = false, open_world_hint = false)
    )]
    async fn olx_close_map(&self) -> Result<CallToolResult, McpError> {
        self.collector().close_view();
        Ok(CallToolResult::success(vec![Content::text(
            "Map view closed.",
        )]))
    }

    #[tool(
        name = "olx_map_view",
        description = "Show the map as currently rendered: status line, viewport and one entry per marker with price, location and link.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn olx_map_view(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(
            self.view.snapshot(),
        )]))
    }

    #[tool(
        name = "olx_set_view_options",
        description = "Toggle marker clustering and price coloring. An open map is re-rendered. Omitted options keep their current value.",
        annotations(read_only_hint = false, open_world_hint = false)
    )]
    async fn olx_set_view_options(
        &self,
        Parameters(params): Parameters<ViewOptionsToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let prefs = self
            .collector()
            .update_preferences(params.grouping, params.price_coloring);
        let on_off = |b: bool| if b { "on" } else { "off" };
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Clustering: {}\nPrice coloring: {}",
            on_off(prefs.grouping),
            on_off(prefs.price_coloring),
        ))]))
    }

    /// Fetch a page and hand its prerendered state to the state tap.
    #[tool(
        name = "olx_capture_page",
        description = "Fetch an OLX page and capture the offers embedded in its prerendered state (window.__PRERENDERED_STATE__).",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn olx_capture_page(
        &self,
        Parameters(params): Parameters<CapturePageToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let request = TransportRequest::get(&params.page_url).header("accept", "text/html");
        let response = match self.page_transport.send(request).await {
            Ok(r) if r.is_success() => r,
            Ok(r) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Page request failed ({}) for {}",
                    r.status.as_u16(),
                    params.page_url
                ))]));
            }
            Err(e) => {
                return Ok(CallToolResult::error(vec![Content::text(format!(
                    "Page request failed: {e}"
                ))]));
            }
        };

        let Some(state) = extract_prerendered_state(&response.body) else {
            return Ok(CallToolResult::error(vec![Content::text(
                "No window.__PRERENDERED_STATE__ assignment found on the page.",
            )]));
        };
        let embedded = parse_payload(Some(&state))
            .map(|parsed| extract_embedded_offers(&parsed).len())
            .unwrap_or_default();
        self.slot.assign(state);
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Prerendered state captured: {embedded} embedded offers."
        ))]))
    }

    /// Feed an exchange captured elsewhere through the request tap.
    #[tool(
        name = "olx_observe_response",
        description = "Feed a request/response pair captured in the browser through the network tap. Only POST responses of the GraphQL search endpoint contribute offers.",
        annotations(read_only_hint = false, open_world_hint = false)
    )]
    async fn olx_observe_response(
        &self,
        Parameters(params): Parameters<ObserveResponseToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let Some(method) = parse_method(&params.method) else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Invalid HTTP method '{}'",
                params.method
            ))]));
        };
        let request = self.tap.open(method, params.url);
        let matched = self.tap.matches(request.method(), request.url());
        let added = request.on_load(&Value::String(params.body));
        let text = if matched {
            format!("Observed search response: {added} new offers.")
        } else {
            "Not a search response; ignored.".to_string()
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    /// Issue a request the way the page would; search responses are observed.
    #[tool(
        name = "olx_page_request",
        description = "Send an HTTP request through the observing transport, as the page itself would. GraphQL search responses passing through are collected.",
        annotations(read_only_hint = false, open_world_hint = true)
    )]
    async fn olx_page_request(
        &self,
        Parameters(params): Parameters<PageRequestToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let Some(method) = parse_method(&params.method) else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "Invalid HTTP method '{}'",
                params.method
            ))]));
        };
        let before = self.collector().len();
        let request = TransportRequest {
            method,
            url: params.url.clone(),
            headers: vec![
                ("accept".into(), "application/json".into()),
                ("content-type".into(), "application/json".into()),
            ],
            body: params.body,
        };
        match self.page_transport.send(request).await {
            Ok(response) => {
                let added = self.collector().len().saturating_sub(before);
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Status: {}\nBody: {} bytes\nNew offers: {added}",
                    response.status.as_u16(),
                    response.body.len(),
                ))]))
            }
            Err(e) => Ok(CallToolResult::error(vec![Content::text(format!(
                "Request to {} failed: {e}",
                params.url
            ))])),
        }
    }

    #[tool(
        name = "olx_offers",
        description = "List every collected offer with its id, title, price, coordinates and where it was collected from.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn olx_offers(&self) -> Result<CallToolResult, McpError> {
        let offers = self.collector().offers();
        let mut text = String::new();
        let _ = writeln!(
            text,
            "Offers: {} | Load state: {}\n",
            offers.len(),
            self.session.state()
        );
        for (i, offer) in offers.iter().enumerate() {
            let _ = write!(
                text,
                "{}. **{}** (ID: {})\n   {} | source: {}",
                i + 1,
                presentation::title(offer),
                offer.id,
                presentation::price_display(&offer.raw),
                offer.source,
            );
            match offer.geo {
                Some(geo) => {
                    let _ = writeln!(text, " | {:.5}, {:.5}", geo.lat, geo.lon);
                }
                None => {
                    let _ = writeln!(text, " | no coordinates");
                }
            }
        }
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for OlxMapServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "OLX map server: collects offers from OLX search pages and lays them out on a map.\n\
                 \n\
                 ## Collecting\n\
                 - olx_load_offers: load a search page through the GraphQL API (first page plus up to 5 follow-ups)\n\
                 - olx_capture_page: capture offers embedded in a page's prerendered state\n\
                 - olx_observe_response: feed a search response captured in the browser\n\
                 - olx_page_request: send a request as the page would; search responses are collected\n\
                 \n\
                 ## Map\n\
                 - olx_open_map / olx_close_map: open (full render) or close the map view\n\
                 - olx_map_view: the rendered map with one entry per marker\n\
                 - olx_set_view_options: clustering and price coloring toggles\n\
                 - olx_offers: every collected offer with its provenance\n\
                 \n\
                 ## Resources\n\
                 olx://map holds the rendered map; olx://offers/{id} holds the raw record of a collected offer."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let map = (MAP_URI.to_string(), "OLX map".to_string());
        let offers = self
            .collector()
            .offers()
            .into_iter()
            .map(|o| (format!("{OFFER_URI_PREFIX}{}", o.id), presentation::title(&o)));
        let resources: Vec<Resource> = std::iter::once(map)
            .chain(offers)
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![ResourceTemplate {
            annotations: None,
            raw: RawResourceTemplate {
                uri_template: format!("{OFFER_URI_PREFIX}{{id}}"),
                name: "OLX Offer".into(),
                title: Some("Collected offer".into()),
                description: Some(
                    "Raw offer record as collected (via olx_load_offers or the taps)".into(),
                ),
                mime_type: Some("application/json".into()),
                icons: None,
            },
        }];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        if request.uri == MAP_URI {
            return Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(self.view.snapshot(), request.uri)],
            });
        }
        let offer = request
            .uri
            .strip_prefix(OFFER_URI_PREFIX)
            .and_then(|id| self.collector().get(id));
        match offer {
            Some(offer) => {
                let text = serde_json::to_string_pretty(&offer.raw).map_err(|e| {
                    McpError::internal_error(format!("failed to encode offer: {e}"), None)
                })?;
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(text, request.uri)],
                })
            }
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
