use anyhow::Context as _;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use visitlog_backend::{AppConfig, ConnectionString, SqliteStoreFactory};
use visitlog_domain::SettingsStoreFactory;

pub mod controller;
pub mod pages;
mod render;
pub mod server;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub connection_string: ConnectionString,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app = AppConfig::from_env().context("failed to load configuration")?;
        Ok(Self {
            connection_string: app.connection_string,
        })
    }
}

/// A running server. Dropping it stops accepting requests; the page registry and
/// any connections it still holds go away once in-flight requests finish.
pub struct StartedServer {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<anyhow::Result<()>>>,
}

impl StartedServer {
    /// Runs until the server fails.
    pub async fn wait(mut self) -> anyhow::Result<()> {
        self.join().await
    }

    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.join().await
    }

    async fn join(&mut self) -> anyhow::Result<()> {
        match self.task.take() {
            Some(task) => task.await.context("server task panicked")?,
            None => Ok(()),
        }
    }
}

impl Drop for StartedServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

pub async fn start_server(addr: SocketAddr) -> anyhow::Result<StartedServer> {
    start_server_with_config(addr, ServerConfig::from_env()?).await
}

pub async fn start_server_with_config(
    addr: SocketAddr,
    config: ServerConfig,
) -> anyhow::Result<StartedServer> {
    let factory = SqliteStoreFactory::from_connection_string(&config.connection_string);
    start_server_with_factory(addr, Arc::new(factory)).await
}

/// Creates the schema before accepting requests. A storage failure here is fatal.
pub async fn start_server_with_factory(
    addr: SocketAddr,
    factory: Arc<dyn SettingsStoreFactory>,
) -> anyhow::Result<StartedServer> {
    let schema_factory = factory.clone();
    tokio::task::spawn_blocking(move || schema_factory.ensure_schema())
        .await
        .context("schema task panicked")?
        .context("failed to prepare settings storage")?;

    let app: Router = server::router(factory);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let actual = listener.local_addr().context("failed to read local addr")?;

    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stopped.await;
            })
            .await
            .context("server failed")
    });

    Ok(StartedServer {
        addr: actual,
        stop: Some(stop),
        task: Some(task),
    })
}
