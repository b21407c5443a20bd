use crate::types::ObjectOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub level: String,
    pub message: String,
}

/// Summary of a single dispatch run, written as JSON to the logs directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub app_version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub objects_listed: usize,
    pub outcomes: Vec<ObjectOutcome>,
    pub error_count: usize,
    pub log_entries: Vec<LogEntry>,
}

impl RunReport {
    pub fn published_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ObjectOutcome::Published { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ObjectOutcome::Failed { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ObjectOutcome::Skipped { .. }))
            .count()
    }

    /// Write the report as pretty JSON into `dir`, returning the file path
    pub fn save_to_dir(&self, dir: &Path) -> Result<PathBuf, String> {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create logs directory: {}", e))?;

        let short_id: String = self.run_id.chars().take(8).collect();
        let filename = format!(
            "run_{}_{}.json",
            self.started_at.format("%Y%m%d_%H%M%S"),
            short_id
        );
        let report_path = dir.join(filename);

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;

        fs::write(&report_path, json)
            .map_err(|e| format!("Failed to write report file: {}", e))?;

        Ok(report_path)
    }
}

/// Forwards messages to `tracing` and keeps the current run's entries
pub struct RunLogger {
    logs: Arc<Mutex<Vec<LogEntry>>>,
    error_count: Arc<Mutex<usize>>,
}

impl RunLogger {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(Mutex::new(Vec::new())),
            error_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn log(&self, level: Level, message: String) {
        if level == Level::ERROR {
            tracing::error!("{}", message);
        } else if level == Level::WARN {
            tracing::warn!("{}", message);
        } else if level == Level::INFO {
            tracing::info!("{}", message);
        } else {
            tracing::debug!("{}", message);
        }

        if level == Level::ERROR {
            if let Ok(mut count) = self.error_count.lock() {
                *count += 1;
            }
        }

        let entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            message,
        };

        if let Ok(mut logs) = self.logs.lock() {
            if logs.len() >= MAX_ENTRIES {
                logs.remove(0);
            }
            logs.push(entry);
        }
    }

    pub fn info(&self, message: String) {
        self.log(Level::INFO, message);
    }

    pub fn warn(&self, message: String) {
        self.log(Level::WARN, message);
    }

    pub fn error(&self, message: String) {
        self.log(Level::ERROR, message);
    }

    pub fn debug(&self, message: String) {
        self.log(Level::DEBUG, message);
    }

    /// Drain entries and reset the error count for the next run
    pub fn take_entries(&self) -> (Vec<LogEntry>, usize) {
        let entries = std::mem::take(&mut *self.logs.lock().unwrap_or_else(|e| e.into_inner()));
        let errors = std::mem::take(&mut *self.error_count.lock().unwrap_or_else(|e| e.into_inner()));
        (entries, errors)
    }
}

impl Default for RunLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the global subscriber: human-readable lines on stdout, plus a
/// daily JSON log file when `logs_dir` is given. Keep the returned guard
/// alive until exit so the file writer flushes.
pub fn init_tracing(logs_dir: Option<&Path>) -> Result<Option<WorkerGuard>, String> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("review-relay")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| format!("Failed to open log file in {}: {}", dir.display(), e))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| format!("Failed to initialise logging: {}", e))?;

    Ok(guard)
}
