// src/bin/check_fetchers.rs
//! Calls every configured fetcher once and prints what it would store.
//! No retries, no writes.
use anyhow::{Context, Result};
use log::{error, info};

use indicator_collector::config::build_tasks;
use indicator_collector::CollectorConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = CollectorConfig::from_env().context("invalid configuration")?;
    let tasks = build_tasks(&config.task_definitions()?)?;

    for task in &tasks {
        info!("Checking {} via {}", task.display_name, task.fetcher.source());
        match task.fetcher.fetch().await {
            Ok(series) => match series.latest() {
                Some(latest) => println!(
                    "{:<28} {:>4}  {}  {:>12}  ({} observations{})",
                    task.display_name,
                    task.indicator_id,
                    latest.date(),
                    latest.value,
                    series.len(),
                    if series.is_chronological() { "" } else { ", NOT in date order" }
                ),
                None => println!("{:<28} {:>4}  no data", task.display_name, task.indicator_id),
            },
            Err(e) => {
                error!("{} failed: {}", task.display_name, e);
                println!("{:<28} {:>4}  error: {}", task.display_name, task.indicator_id, e);
            }
        }
    }

    Ok(())
}
