use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub state_tap: StateTapConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Unset means the transport default (no explicit timeout).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// `Cookie` header of the browser session to reuse, e.g. `"onap=abc-123; ..."`.
    #[serde(default)]
    pub cookie: Option<String>,
}

impl ClientConfig {
    pub fn graphql_url(&self) -> String {
        format!("{}/apigateway/graphql", self.base_url.trim_end_matches('/'))
    }

    pub fn friendly_links_url(&self) -> String {
        format!(
            "{}/api/v1/friendly-links/query-params/",
            self.base_url.trim_end_matches('/')
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: None,
            cookie: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewConfig {
    #[serde(default)]
    pub grouping_enabled: bool,
    #[serde(default = "default_true")]
    pub price_coloring_enabled: bool,
    /// Delay between markers added incrementally after a continuation page.
    #[serde(default = "default_marker_pace_ms")]
    pub marker_pace_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            grouping_enabled: false,
            price_coloring_enabled: true,
            marker_pace_ms: default_marker_pace_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateTapConfig {
    /// When false the state slot refuses subscriptions and the tap samples instead.
    #[serde(default = "default_true")]
    pub observe_reassignment: bool,
    #[serde(default = "default_sample_delays_ms")]
    pub sample_delays_ms: Vec<u64>,
}

impl Default for StateTapConfig {
    fn default() -> Self {
        Self {
            observe_reassignment: true,
            sample_delays_ms: default_sample_delays_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.olx.pl".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

fn default_true() -> bool {
    true
}

fn default_marker_pace_ms() -> u64 {
    5
}

fn default_sample_delays_ms() -> Vec<u64> {
    vec![300, 1000, 2500]
}
