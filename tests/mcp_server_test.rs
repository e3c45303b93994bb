use std::sync::Arc;

use olx_map::adapters::http::client::ReqwestTransport;
use olx_map::config::types::Config;
use olx_map::mcp::server::{MapComponents, OlxMapServer};
use olx_map::ports::state_source::StateSource;
use olx_map::ports::transport::Transport;

use rmcp::ServerHandler;
use serde_json::json;
use std::time::Duration;

fn components(config: &Config) -> MapComponents {
    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.client).unwrap());
    MapComponents::assemble(config, transport)
}

#[test]
fn server_lists_all_tools() {
    let server = OlxMapServer::new(components(&Config::default()));
    let info = server.get_info();
    let instructions = info.instructions.unwrap();
    for tool in [
        "olx_load_offers",
        "olx_capture_page",
        "olx_observe_response",
        "olx_page_request",
        "olx_open_map",
        "olx_close_map",
        "olx_map_view",
        "olx_set_view_options",
        "olx_offers",
    ] {
        assert!(instructions.contains(tool), "{tool} missing from instructions");
    }
    assert!(instructions.contains("olx://map"));
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.resources.is_some());
}

#[test]
fn assemble_targets_configured_endpoint() {
    let mut config = Config::default();
    config.client.base_url = "https://www.olx.ua/".into();
    let parts = components(&config);
    assert!(parts.tap.matches(&reqwest::Method::POST, "https://www.olx.ua/apigateway/graphql"));
    assert!(!parts.tap.matches(&reqwest::Method::POST, "https://www.olx.pl/apigateway/graphql"));
}

#[tokio::test]
async fn installed_state_tap_collects_assigned_state() {
    let config = Config::default();
    let parts = components(&config);
    parts.install_state_tap(&config);

    parts.slot.assign(json!({"listing": {"listing": {"ads": [
        {"id": 1, "map": {"lat": 52.0, "lon": 21.0}},
        {"id": 2}
    ]}}}));
    let collector = Arc::clone(parts.session.collector());
    for _ in 0..50 {
        if collector.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(collector.len(), 2);
    assert!(parts.slot.current().is_some());
}
