// src/config.rs
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::db::DEFAULT_ACQUIRE_TIMEOUT;
use crate::services::eastmoney::EastmoneyIndexFetcher;
use crate::services::eastmoney_macro::EastmoneyMacroFetcher;
use crate::services::pipeline::IndicatorTask;
use crate::services::retry::RetryPolicy;
use crate::services::treasury::TreasuryCsvFetcher;

/// Settings for one collection run, read from the environment (and `.env`).
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// `None` runs with writes disabled.
    pub database_url: Option<String>,
    /// How long a write waits for a database connection before failing.
    pub db_acquire_timeout: Duration,
    pub tasks_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    /// Exit non-zero when any task failed.
    pub strict_exit: bool,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut retry = RetryPolicy::default();
        if let Some(raw) = var("RETRY_MAX_ATTEMPTS") {
            retry.max_attempts = parse_var("RETRY_MAX_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = var("RETRY_INITIAL_DELAY_SECS") {
            retry.initial_delay = parse_secs("RETRY_INITIAL_DELAY_SECS", &raw)?;
        }
        if let Some(raw) = var("RETRY_MULTIPLIER") {
            retry.multiplier = parse_var("RETRY_MULTIPLIER", &raw)?;
        }
        if let Some(raw) = var("FETCH_TIMEOUT_SECS") {
            retry.attempt_timeout = Some(parse_secs("FETCH_TIMEOUT_SECS", &raw)?);
        }
        validate_retry(&retry)?;

        let db_acquire_timeout = match var("DB_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => parse_secs("DB_ACQUIRE_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_ACQUIRE_TIMEOUT,
        };

        let strict_exit = match var("STRICT_EXIT") {
            Some(raw) => parse_flag("STRICT_EXIT", &raw)?,
            None => false,
        };

        Ok(CollectorConfig {
            database_url: var("DATABASE_URL"),
            db_acquire_timeout,
            tasks_file: var("INDICATOR_TASKS_FILE").map(PathBuf::from),
            retry,
            strict_exit,
        })
    }

    /// Task definitions from `INDICATOR_TASKS_FILE`, or the built-in list.
    pub fn task_definitions(&self) -> Result<Vec<TaskDefinition>, ConfigError> {
        match &self.tasks_file {
            Some(path) => load_task_definitions(path),
            None => Ok(default_task_definitions()),
        }
    }
}

fn parse_var<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::InvalidVar {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_secs(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse_var(name, raw)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidVar {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidVar {
            name,
            value: raw.to_string(),
            reason: "expected true/false".to_string(),
        }),
    }
}

fn validate_retry(policy: &RetryPolicy) -> Result<(), ConfigError> {
    if policy.max_attempts == 0 {
        return Err(ConfigError::InvalidRetryPolicy("max attempts must be at least 1".to_string()));
    }
    if !policy.multiplier.is_finite() || policy.multiplier < 0.0 {
        return Err(ConfigError::InvalidRetryPolicy(format!(
            "multiplier must be a non-negative number, got {}",
            policy.multiplier
        )));
    }
    if policy.attempt_timeout == Some(Duration::ZERO) {
        return Err(ConfigError::InvalidRetryPolicy("fetch timeout must be positive".to_string()));
    }
    Ok(())
}

/// Where an indicator's data comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDefinition {
    EastmoneyIndex { symbol: String },
    EastmoneyMacro { report: String, column: String },
    TreasuryCsv { rate_type: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub indicator_id: i32,
    pub name: String,
    pub source: SourceDefinition,
}

impl TaskDefinition {
    pub fn build(&self) -> Result<IndicatorTask, ConfigError> {
        let task = match &self.source {
            SourceDefinition::EastmoneyIndex { symbol } => {
                IndicatorTask::new(self.indicator_id, self.name.clone(), EastmoneyIndexFetcher::new(symbol)?)
            }
            SourceDefinition::EastmoneyMacro { report, column } => IndicatorTask::new(
                self.indicator_id,
                self.name.clone(),
                EastmoneyMacroFetcher::new(report, column)?,
            ),
            SourceDefinition::TreasuryCsv { rate_type, column } => IndicatorTask::new(
                self.indicator_id,
                self.name.clone(),
                TreasuryCsvFetcher::new(rate_type.clone(), column.clone()),
            ),
        };
        Ok(task)
    }
}

pub fn default_task_definitions() -> Vec<TaskDefinition> {
    vec![
        TaskDefinition {
            indicator_id: 1,
            name: "CSI Liquor Index".to_string(),
            source: SourceDefinition::EastmoneyIndex { symbol: "sz399997".to_string() },
        },
        TaskDefinition {
            indicator_id: 5,
            name: "CSI Semiconductor Index".to_string(),
            source: SourceDefinition::EastmoneyIndex { symbol: "sz399987".to_string() },
        },
    ]
}

pub fn load_task_definitions(path: &Path) -> Result<Vec<TaskDefinition>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::TaskFile {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::TaskFileFormat {
        path: path.display().to_string(),
        source,
    })
}

/// Builds tasks in the given order. Indicator ids must be unique, otherwise
/// two tasks would overwrite each other's facts.
pub fn build_tasks(definitions: &[TaskDefinition]) -> Result<Vec<IndicatorTask>, ConfigError> {
    let mut seen = HashSet::new();
    definitions
        .iter()
        .map(|definition| {
            if !seen.insert(definition.indicator_id) {
                return Err(ConfigError::InvalidTask(format!(
                    "indicator id {} is listed more than once",
                    definition.indicator_id
                )));
            }
            definition.build()
        })
        .collect()
}
