// src/services/sink.rs
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::SinkError;
use crate::models::{FactRecord, IndicatorId};
use crate::observer::RunObserver;

/// Durable fact store keyed by (indicator, date).
///
/// `upsert` is last-write-wins: a second write for the same key replaces the
/// value and refreshes the write time, it never adds a row.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn upsert(&self, indicator_id: IndicatorId, date: NaiveDate, value: f64) -> Result<(), SinkError>;
}

pub(crate) fn check_value(value: f64) -> Result<(), SinkError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SinkError::InvalidValue(value))
    }
}

/// In-process fact table.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<BTreeMap<(IndicatorId, NaiveDate), FactRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, indicator_id: IndicatorId, date: NaiveDate) -> Option<FactRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|records| records.get(&(indicator_id, date)).cloned())
    }

    /// All records ordered by (indicator, date).
    pub fn records(&self) -> Vec<FactRecord> {
        self.records
            .lock()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn upsert(&self, indicator_id: IndicatorId, date: NaiveDate, value: f64) -> Result<(), SinkError> {
        check_value(value)?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("memory sink lock poisoned".to_string()))?;
        records.insert(
            (indicator_id, date),
            FactRecord {
                indicator_id,
                date,
                value,
                written_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// Stand-in used when no database is configured: every write is skipped
/// with a warning to the run's observer.
pub struct DisabledSink {
    observer: Arc<dyn RunObserver>,
}

impl DisabledSink {
    pub fn new(observer: Arc<dyn RunObserver>) -> Self {
        DisabledSink { observer }
    }
}

#[async_trait]
impl Sink for DisabledSink {
    async fn upsert(&self, indicator_id: IndicatorId, date: NaiveDate, value: f64) -> Result<(), SinkError> {
        self.observer.warn(&format!(
            "No database configured, skipping save: metric_id={}, date={}, value={}",
            indicator_id, date, value
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::{Level, RecordingObserver};

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[tokio::test]
    async fn second_write_replaces_value() {
        let sink = MemorySink::new();
        sink.upsert(IndicatorId(5), d(), 10.0).await.unwrap();
        sink.upsert(IndicatorId(5), d(), 12.0).await.unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get(IndicatorId(5), d()).unwrap().value, 12.0);
    }

    #[tokio::test]
    async fn same_value_rewrite_refreshes_write_time() {
        let sink = MemorySink::new();
        sink.upsert(IndicatorId(1), d(), 100.2).await.unwrap();
        let first = sink.get(IndicatorId(1), d()).unwrap();
        sink.upsert(IndicatorId(1), d(), 100.2).await.unwrap();
        let second = sink.get(IndicatorId(1), d()).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(second.value, first.value);
        assert!(second.written_at >= first.written_at);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let sink = MemorySink::new();
        let next = d().succ_opt().unwrap();
        sink.upsert(IndicatorId(1), d(), 1.0).await.unwrap();
        sink.upsert(IndicatorId(1), next, 2.0).await.unwrap();
        sink.upsert(IndicatorId(5), d(), 3.0).await.unwrap();

        let keys: Vec<_> = sink.records().iter().map(|r| (r.indicator_id, r.date)).collect();
        assert_eq!(keys, vec![(IndicatorId(1), d()), (IndicatorId(1), next), (IndicatorId(5), d())]);
    }

    #[tokio::test]
    async fn non_finite_values_are_rejected() {
        let sink = MemorySink::new();
        let err = sink.upsert(IndicatorId(1), d(), f64::NAN).await.unwrap_err();
        assert!(matches!(err, SinkError::InvalidValue(_)));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn disabled_sink_reports_every_skipped_write() {
        let observer = Arc::new(RecordingObserver::new());
        let sink = DisabledSink::new(observer.clone());

        sink.upsert(IndicatorId(1), d(), 1803.25).await.unwrap();
        sink.upsert(IndicatorId(5), d(), 4120.5).await.unwrap();

        assert_eq!(
            observer.at(Level::Warn),
            vec![
                "No database configured, skipping save: metric_id=1, date=2024-03-01, value=1803.25".to_string(),
                "No database configured, skipping save: metric_id=5, date=2024-03-01, value=4120.5".to_string(),
            ]
        );
        assert!(observer.at(Level::Info).is_empty());
    }
}
