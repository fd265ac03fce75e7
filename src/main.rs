//! Bootstrap binary: initializes logging, configuration, and the database
//! schema. Request handling lives in the surrounding application; this binary
//! only prepares the ledger store the engine operates on.

use dotenvy::dotenv;
use susu_engine::config::{AppConfig, database};
use susu_engine::errors::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Non-fatal; env vars can be set externally
    dotenv().ok();

    let config = AppConfig::load()?;
    info!(database_url = %config.database_url, "loaded configuration");

    let db = sea_orm::Database::connect(&config.database_url).await?;
    database::create_tables(&db).await?;
    info!("database schema ready");

    Ok(())
}
