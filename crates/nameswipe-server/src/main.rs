//! Nameswipe Server - Main entry point

use anyhow::Result;
use nameswipe_common::logging::{init_logging, LogConfig};
use nameswipe_server::{api, config::Config};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("nameswipe-server".to_string())
        .filter_directives(
            "nameswipe_server=debug,nameswipe_ingest=info,tower_http=debug,sqlx=warn".to_string(),
        )
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    info!("Starting Nameswipe Server");

    let config = Config::load()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        "Configuration loaded"
    );

    api::serve(config).await
}
