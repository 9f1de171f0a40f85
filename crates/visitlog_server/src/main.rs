use anyhow::Context as _;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;
use visitlog_domain::paths;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = std::env::var(paths::VISITLOG_SERVER_ADDR_ENV)
        .unwrap_or_else(|_| "127.0.0.1:8422".to_owned())
        .parse()
        .context("invalid VISITLOG_SERVER_ADDR")?;

    let config = visitlog_server::ServerConfig::from_env()?;
    tracing::info!(
        database = %config.connection_string.data_source().display(),
        "using settings database"
    );

    let server = visitlog_server::start_server_with_config(addr, config).await?;
    tracing::info!(addr = %server.addr, "visitlog_server listening");
    server.wait().await?;
    Ok(())
}
