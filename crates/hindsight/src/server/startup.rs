//! REST server startup and configuration

use anyhow::Result;
use axum::serve;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::server::routing::create_router;
use crate::server::SharedMemory;

/// Serve the memory over HTTP until interrupted
pub async fn start_server(addr: SocketAddr, memory: SharedMemory) -> Result<()> {
  let stats = memory.stats();
  info!(
    "starting hindsight REST server on {addr} ({} records, learning {})",
    stats.records,
    if stats.enabled { "enabled" } else { "disabled" }
  );

  let app = create_router(memory).layer(
    ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
  );

  let listener = TcpListener::bind(addr).await?;
  info!("server listening on {}", listener.local_addr()?);

  serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!("server shut down gracefully");
  Ok(())
}

#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
}
