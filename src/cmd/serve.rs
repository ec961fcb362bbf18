//! HTTP server command — `leadboard serve`.

use anyhow::Result;

use leadboard::crm::server::{ServerConfig, start_server};

pub async fn cmd_serve(config: ServerConfig) -> Result<()> {
    tracing::info!(
        host = %config.host,
        port = config.port,
        in_memory = config.in_memory,
        "starting leadboard server"
    );
    start_server(config).await
}
