// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod observer;
pub mod services;

pub use config::CollectorConfig;
pub use error::{ConfigError, FetchError, SinkError, TaskError};
pub use models::{FactRecord, IndicatorId, Observation, RunSummary, Series, TaskOutcome, TaskReport};
pub use observer::{LogObserver, RunObserver};
pub use services::fetcher::{Fetcher, FnFetcher};
pub use services::pipeline::{IndicatorTask, Pipeline};
pub use services::retry::{retry_with_backoff, RetryPolicy};
pub use services::sink::{DisabledSink, MemorySink, Sink};
