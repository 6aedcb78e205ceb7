use anyhow::{Context, Result};
use log::{info, warn};
use std::process::ExitCode;
use std::sync::Arc;

use indicator_collector::config::build_tasks;
use indicator_collector::services::db::PgSink;
use indicator_collector::{CollectorConfig, DisabledSink, LogObserver, Pipeline, RunObserver, Sink};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize the logger
    env_logger::init();
    info!("Starting daily indicator data collection...");

    let config = CollectorConfig::from_env().context("invalid configuration")?;
    let definitions = config.task_definitions().context("failed to load task definitions")?;
    let tasks = build_tasks(&definitions).context("failed to build tasks")?;
    info!("Loaded {} indicator task(s)", tasks.len());

    let observer: Arc<dyn RunObserver> = Arc::new(LogObserver);
    // Connects on first write; an outage fails tasks, not start-up.
    let sink: Arc<dyn Sink> = match &config.database_url {
        Some(url) => Arc::new(
            PgSink::connect_lazy(url, config.db_acquire_timeout).context("invalid DATABASE_URL")?,
        ),
        None => {
            warn!("DATABASE_URL not set, collected values will not be saved");
            Arc::new(DisabledSink::new(observer.clone()))
        }
    };

    let pipeline = Pipeline::new(sink, observer).with_retry_policy(config.retry.clone());
    let summary = pipeline.run(&tasks).await;

    for report in &summary.reports {
        info!("{} ({}): {}", report.display_name, report.indicator_id, report.outcome);
    }

    if config.strict_exit && summary.has_failures() {
        warn!("{} task(s) failed and STRICT_EXIT is set", summary.failed());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
