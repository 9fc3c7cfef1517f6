//! Apply the spin wheel schema to the database named by `DATABASE_URL`.

use anyhow::Context;
use spinwheel_postgres::{PostgresConfig, PostgresDrawStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = PostgresConfig::from_env();
    tracing::info!(database = config.redacted_url(), "Running migrations");

    let store = PostgresDrawStore::connect(&config)
        .await
        .context("connecting to PostgreSQL")?;
    store.migrate().await.context("applying migrations")?;

    tracing::info!("Migrations complete");
    Ok(())
}
