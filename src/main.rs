use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use olx_map::adapters::http::client::ReqwestTransport;
use olx_map::config::load_config;
use olx_map::mcp::server::{MapComponents, OlxMapServer};
use olx_map::ports::transport::Transport;

fn find_config_path() -> PathBuf {
    let candidates = [
        PathBuf::from("config.yaml"),
        binary_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries MCP JSON-RPC, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting olx-map server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;
    if config.client.cookie.is_none() {
        tracing::warn!("No session cookie configured, requests run without the browser session");
    }

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(&config.client)?);
    let components = MapComponents::assemble(&config, transport);
    components.install_state_tap(&config);

    let server = OlxMapServer::new(components);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
