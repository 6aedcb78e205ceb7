// src/services/pipeline.rs
use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::{FetchError, TaskError};
use crate::models::{IndicatorId, RunSummary, Series, TaskOutcome};
use crate::observer::RunObserver;
use super::fetcher::Fetcher;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::sink::Sink;

/// One indicator to collect: where it is stored, what to call it in logs,
/// and where its data comes from.
pub struct IndicatorTask {
    pub indicator_id: IndicatorId,
    pub display_name: String,
    pub fetcher: Box<dyn Fetcher>,
}

impl IndicatorTask {
    pub fn new(
        indicator_id: impl Into<IndicatorId>,
        display_name: impl Into<String>,
        fetcher: impl Fetcher + 'static,
    ) -> Self {
        IndicatorTask {
            indicator_id: indicator_id.into(),
            display_name: display_name.into(),
            fetcher: Box::new(fetcher),
        }
    }
}

/// Fetches the latest observation of each task and writes it to the sink.
///
/// Tasks run one after another in list order. Whatever happens to one task
/// (fetch exhausted, sink failure, no data) is recorded in the summary and
/// the run moves on; `run` itself never fails.
pub struct Pipeline {
    sink: Arc<dyn Sink>,
    observer: Arc<dyn RunObserver>,
    policy: RetryPolicy,
}

impl Pipeline {
    pub fn new(sink: Arc<dyn Sink>, observer: Arc<dyn RunObserver>) -> Self {
        Pipeline {
            sink,
            observer,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn run(&self, tasks: &[IndicatorTask]) -> RunSummary {
        let mut summary = RunSummary::default();

        for task in tasks {
            self.observer.info(&format!("Processing task: {}", task.display_name));

            let outcome = match self.process(task).await {
                Ok(Some((date, value))) => {
                    self.observer.info(&format!(
                        "Successfully collected {} for {}",
                        task.display_name, date
                    ));
                    TaskOutcome::Succeeded { date, value }
                }
                Ok(None) => {
                    self.observer.warn(&format!("No data returned for {}", task.display_name));
                    TaskOutcome::NoData
                }
                Err(e) => {
                    self.observer.error(&format!("Failed to process {}: {}", task.display_name, e));
                    TaskOutcome::Failed { error: e.to_string() }
                }
            };

            summary.record(task.indicator_id, &task.display_name, outcome);
        }

        self.observer.info(&format!(
            "Data collection finished: {} succeeded, {} without data, {} failed",
            summary.succeeded(),
            summary.no_data(),
            summary.failed()
        ));
        summary
    }

    /// `Ok(None)` when the fetcher had nothing to report.
    async fn process(&self, task: &IndicatorTask) -> Result<Option<(NaiveDate, f64)>, TaskError> {
        let series = self
            .fetch_with_retry(task)
            .await
            .map_err(|source| TaskError::FetchFailed {
                attempts: self.policy.attempts(),
                source,
            })?;

        let latest = match series.latest() {
            Some(observation) => *observation,
            None => return Ok(None),
        };

        // Fetchers promise oldest-first; the last element wins either way.
        if !series.is_chronological() {
            self.observer.warn(&format!(
                "Series for {} is not in date order; using its last element ({})",
                task.display_name,
                latest.date()
            ));
        }

        let date = latest.date();
        self.sink.upsert(task.indicator_id, date, latest.value).await?;
        Ok(Some((date, latest.value)))
    }

    async fn fetch_with_retry(&self, task: &IndicatorTask) -> Result<Series, FetchError> {
        let fetcher = task.fetcher.as_ref();
        let attempt_timeout = self.policy.attempt_timeout;

        retry_with_backoff(&self.policy, self.observer.as_ref(), &task.display_name, move || async move {
            match attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, fetcher.fetch()).await {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(limit)),
                },
                None => fetcher.fetch().await,
            }
        })
        .await
    }
}
