// src/observer.rs
//! Observability collaborator handed to the retrier and the pipeline.
//!
//! Library code reports through a `RunObserver` it is given rather than
//! calling the logging macros itself, so a run can be observed (and asserted
//! on) without touching process-wide logger state.

use log::{error, info, warn};

pub trait RunObserver: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `log` facade; what gets printed is up to `env_logger`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

const TARGET: &str = "indicator_collector";

impl RunObserver for LogObserver {
    fn info(&self, message: &str) {
        info!(target: TARGET, "{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(target: TARGET, "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: TARGET, "{}", message);
    }
}

#[cfg(test)]
pub(crate) use recording::{Level, RecordingObserver};

#[cfg(test)]
mod recording {
    use super::RunObserver;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Info,
        Warn,
        Error,
    }

    /// Keeps every line it receives, for assertions in tests.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        lines: Mutex<Vec<(Level, String)>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<(Level, String)> {
            self.lines.lock().map(|l| l.clone()).unwrap_or_default()
        }

        pub fn at(&self, level: Level) -> Vec<String> {
            self.lines()
                .into_iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m)
                .collect()
        }

        fn push(&self, level: Level, message: &str) {
            if let Ok(mut lines) = self.lines.lock() {
                lines.push((level, message.to_string()));
            }
        }
    }

    impl RunObserver for RecordingObserver {
        fn info(&self, message: &str) {
            self.push(Level::Info, message);
        }

        fn warn(&self, message: &str) {
            self.push(Level::Warn, message);
        }

        fn error(&self, message: &str) {
            self.push(Level::Error, message);
        }
    }
}
