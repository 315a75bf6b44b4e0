//! Switchyard gateway binary.
//!
//! Settings come from defaults, the file named by `SWITCHYARD_CONFIG` and
//! `SWITCHYARD_*` environment variables (see [`switchyard_gateway::config`]).
//! Log filtering follows `RUST_LOG`.

use anyhow::Context;
use switchyard_gateway::{GatewayServer, GatewaySettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = GatewaySettings::load().context("loading settings")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("switchyard_gateway=info,tower_http=info"));
    if settings.log_json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!(
        host = %settings.host,
        port = settings.port,
        chat_timeout_secs = settings.provider.chat_timeout_secs,
        "switchyard configuration loaded"
    );

    GatewayServer::new(settings).start().await
}
