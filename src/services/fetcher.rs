// src/services/fetcher.rs
use async_trait::async_trait;
use std::future::Future;

use crate::error::FetchError;
use crate::models::Series;

/// Produces the time series for one indicator, bound to its provider series
/// at construction. Implementations should return observations oldest first.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self) -> Result<Series, FetchError>;

    /// Short description of the upstream series, for log lines.
    fn source(&self) -> String;
}

/// Wraps an async closure as a `Fetcher`.
pub struct FnFetcher<F> {
    source: String,
    fetch: F,
}

impl<F, Fut> FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Series, FetchError>> + Send,
{
    pub fn new(source: impl Into<String>, fetch: F) -> Self {
        FnFetcher {
            source: source.into(),
            fetch,
        }
    }
}

#[async_trait]
impl<F, Fut> Fetcher for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Series, FetchError>> + Send,
{
    async fn fetch(&self) -> Result<Series, FetchError> {
        (self.fetch)().await
    }

    fn source(&self) -> String {
        self.source.clone()
    }
}
