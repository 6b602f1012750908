//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own, without the workspace's `medex-run` entry point.
//!
//! ## Intended use
//! Development and debugging of the HTTP surface, with OpenAPI/Swagger UI at `/swagger-ui`.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medex_core::{config::data_dir_from_env_value, CoreConfig, MedexService};

/// Main entry point for the medex REST API server
///
/// # Environment Variables
/// - `MEDEX_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `MEDEX_DATA_DIR`: Knowledge base and patient data directory (default: "data")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the data directory cannot be prepared or holds malformed mappings,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("medex_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MEDEX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("MEDEX_DATA_DIR").ok());

    tracing::info!("-- Starting medex REST API on {}", addr);

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let service = MedexService::open(cfg)?;

    api_rest::serve(&addr, service).await
}
