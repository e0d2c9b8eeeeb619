use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tiddler_hub::{api, config::ServerConfig};
use tiddler_hub_core::{storage::FileStore, TiddlerBag};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "tiddler_hub=info,tiddler_hub_core=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::parse();

    let store = FileStore::open(&config.folder)?;
    let bag = Arc::new(TiddlerBag::new(store));
    let app = api::router(bag, config.max_body_bytes);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {} serving {}", addr, config.folder.display());
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
