// src/models.rs
use serde::{Serialize, Deserialize};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::fmt;

/// Identity of an indicator in the fact table (`metric_id` column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndicatorId(pub i32);

impl fmt::Display for IndicatorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for IndicatorId {
    fn from(id: i32) -> Self {
        IndicatorId(id)
    }
}

/// One data point of a provider time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Observation { timestamp, value }
    }

    /// Observation stamped at midnight UTC of `date`.
    pub fn on_date(date: NaiveDate, value: f64) -> Self {
        Observation {
            timestamp: date.and_time(NaiveTime::default()).and_utc(),
            value,
        }
    }

    /// Calendar date of the observation; time of day is dropped.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Observations in the order the fetcher produced them, expected oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    observations: Vec<Observation>,
}

impl Series {
    pub fn new(observations: Vec<Observation>) -> Self {
        Series { observations }
    }

    pub fn empty() -> Self {
        Series::default()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Last observation in fetch order (not the max timestamp).
    pub fn latest(&self) -> Option<&Observation> {
        self.observations.last()
    }

    /// True when timestamps never decrease along the sequence.
    pub fn is_chronological(&self) -> bool {
        self.observations
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp)
    }
}

impl FromIterator<Observation> for Series {
    fn from_iter<I: IntoIterator<Item = Observation>>(iter: I) -> Self {
        Series::new(iter.into_iter().collect())
    }
}

/// Persisted unit, unique per (indicator_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRecord {
    pub indicator_id: IndicatorId,
    pub date: NaiveDate,
    pub value: f64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub written_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { date: NaiveDate, value: f64 },
    NoData,
    Failed { error: String },
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskOutcome::Succeeded { date, value } => write!(f, "succeeded: {} = {}", date, value),
            TaskOutcome::NoData => write!(f, "no data"),
            TaskOutcome::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub indicator_id: IndicatorId,
    pub display_name: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Per-task results of one run, in task order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub reports: Vec<TaskReport>,
}

impl RunSummary {
    pub fn record(&mut self, indicator_id: IndicatorId, display_name: &str, outcome: TaskOutcome) {
        self.reports.push(TaskReport {
            indicator_id,
            display_name: display_name.to_string(),
            outcome,
        });
    }

    pub fn outcome_for(&self, indicator_id: IndicatorId) -> Option<&TaskOutcome> {
        self.reports
            .iter()
            .find(|r| r.indicator_id == indicator_id)
            .map(|r| &r.outcome)
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Succeeded { .. }))
    }

    pub fn no_data(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::NoData))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}
