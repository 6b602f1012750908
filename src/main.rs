use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medex_core::{CoreConfig, MedexService, config::data_dir_from_env_value};

/// Main entry point for medex
///
/// Loads the knowledge base once and serves the REST API over it.
///
/// # Environment Variables
/// - `MEDEX_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDEX_DATA_DIR`: Knowledge base and patient data directory (default: "data")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medex_run=info".parse()?)
                .add_directive("medex_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MEDEX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("MEDEX_DATA_DIR").ok());

    tracing::info!("++ Starting medex REST on {}", rest_addr);
    tracing::info!("++ Knowledge base at {}", data_dir.display());

    let cfg = Arc::new(CoreConfig::new(data_dir)?);
    let service = MedexService::open(cfg)?;

    api_rest::serve(&rest_addr, service).await
}
