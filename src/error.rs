// src/error.rs
use thiserror::Error;

/// Failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("attempt timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("{0}")]
    Provider(String),
}

impl FetchError {
    pub fn parse(message: impl Into<String>) -> Self {
        FetchError::Parse(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        FetchError::Provider(message.into())
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("value {0} cannot be stored")]
    InvalidValue(f64),

    #[error("{0}")]
    Unavailable(String),
}

/// Terminal failure of one indicator task; the run itself continues.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("fetch failed after {attempts} attempt(s): {source}")]
    FetchFailed {
        attempts: u32,
        #[source]
        source: FetchError,
    },

    #[error("sink write failed: {0}")]
    SinkWriteFailed(#[from] SinkError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value {value:?}: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("cannot read task file {path}: {source}")]
    TaskFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid task file {path}: {source}")]
    TaskFileFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid task definition: {0}")]
    InvalidTask(String),
}
