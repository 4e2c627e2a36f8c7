//! # Purse Server
//!
//! Balance top-up, balance query and donation feed server.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! purse
//!
//! # Run with a specific config file
//! PURSE_CONFIG=/path/to/purse.toml purse
//!
//! # Run with environment variables
//! PURSE_HOST=127.0.0.1 PURSE_TOPUP_PORT=9081 purse
//! ```

use anyhow::Result;
use purse_server::{Config, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "purse_server=debug,purse_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;

    tracing::info!(
        "Starting Purse server on {} (feed {}, top-up {}, balance {})",
        config.host,
        config.pubsub.port,
        config.topup.port,
        config.balance.port
    );

    let server = Server::bind(config).await?;
    server.run_until_ctrl_c().await?;

    Ok(())
}
