// src/bin/setup_db.rs
use anyhow::{Context, Result};
use dotenv::dotenv;
use log::info;
use std::env;

use indicator_collector::services::db::{PgSink, DEFAULT_ACQUIRE_TIMEOUT};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    // Get database URL from environment
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let sink = PgSink::connect_lazy(&database_url, DEFAULT_ACQUIRE_TIMEOUT).context("invalid DATABASE_URL")?;
    sink.ensure_schema().await.context("failed to create fact_raw_data")?;

    info!("Database setup complete!");
    Ok(())
}
