//! # Ofrezco Live Server
//!
//! Realtime buyer/seller chat and interest notifications for the Ofrezco
//! marketplace.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! ofrezco-live
//!
//! # Run with custom config (ofrezco-live.toml in the working directory)
//! ofrezco-live
//!
//! # Run with environment variables
//! OFREZCO_PORT=8000 OFREZCO_DATABASE_URL=sqlite://dev.db ofrezco-live
//! ```

mod config;
mod error;
mod handlers;
mod metrics;
mod store;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ofrezco_live=debug,ofrezco_live_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        "Starting Ofrezco Live on {}:{}",
        config.host,
        config.port
    );

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
