//! Hindsight REST Server
//!
//! HTTP front end for the feedback memory: record feedback, fetch
//! improvement suggestions and similar successful queries, read accuracy
//! reports.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use hindsight::server::startup::start_server;
use hindsight::{Config, FeedbackMemory};

#[derive(Parser)]
#[command(name = "hindsight_server")]
#[command(about = "Hindsight REST API Server")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Args {
  /// Server bind address (overrides the config file)
  #[arg(long)]
  bind: Option<SocketAddr>,

  /// Path to a JSON config file
  #[arg(long)]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let default = if args.verbose { "hindsight=debug,tower_http=debug,info" } else { "hindsight=info,warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

  info!("Starting Hindsight REST Server v{}", env!("CARGO_PKG_VERSION"));

  let config = Config::load(args.config.as_deref())?;
  let bind = args.bind.unwrap_or(config.server.bind);
  let memory = Arc::new(FeedbackMemory::from_config(&config).await);

  start_server(bind, memory).await
}
