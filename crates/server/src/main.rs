//! shellcache server entry point.
//!
//! Boots the caching worker behind an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchClient, FetchConfig, LogNotifier, ServiceWorker};
use shellcache_core::{AppConfig, CacheDb, CacheStorage};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let store: Arc<dyn CacheStorage> = Arc::new(CacheDb::open(&config.db_path).await?);
    let http = Arc::new(FetchClient::new(FetchConfig::from_app_config(&config)?)?);
    let worker = ServiceWorker::new(&config, Arc::clone(&store), http, Arc::new(LogNotifier))?;

    tracing::info!(
        origin = %config.origin,
        generation = %worker.generation(),
        db_path = %config.db_path.display(),
        "Starting shellcache server on stdio transport"
    );

    let handler = handler::ShellcacheServer::new(Arc::new(worker), store);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
