//! Poll, classify, dispatch, acknowledge.
//!
//! One run takes a single listing snapshot of the bucket and walks it in
//! order. Each object goes through
//! `unprocessed -> download -> publish -> processed`, and any failure leaves
//! it unprocessed for the next run. Only a failed listing aborts a run.

use crate::classifier::{classify, is_processed, processed_key, review_title, scratch_path};
use crate::config::RelayConfig;
use crate::object_store::ObjectStore;
use crate::publishers::{AudioPublisher, VideoPublisher};
use crate::run_log::{RunLogger, RunReport};
use crate::types::{FailureStage, MediaKind, ObjectOutcome, PublishedMedia, SkipReason, StoreObject};
use chrono::Utc;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Per-run naming and staging settings
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub download_dir: PathBuf,
    pub title_prefix: String,
    pub description: String,
}

impl DispatchSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            download_dir: config.download_dir.clone(),
            title_prefix: config.title_prefix.clone(),
            description: config.description.clone(),
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn ObjectStore>,
    video: Arc<dyn VideoPublisher>,
    audio: Arc<dyn AudioPublisher>,
    settings: DispatchSettings,
    logger: Arc<RunLogger>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        video: Arc<dyn VideoPublisher>,
        audio: Arc<dyn AudioPublisher>,
        settings: DispatchSettings,
        logger: Arc<RunLogger>,
    ) -> Self {
        Self {
            store,
            video,
            audio,
            settings,
            logger,
        }
    }

    /// List the bucket once and handle every unprocessed object in order.
    ///
    /// Returns `Err` only when the listing fails; per-object failures are
    /// part of the report.
    pub async fn run_once(&self) -> Result<RunReport, String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        // Entries left over from an aborted run belong to that run
        let _ = self.logger.take_entries();

        self.logger.info("Checking for new files...".to_string());

        let objects = match self.store.list_objects().await {
            Ok(objects) => objects,
            Err(e) => {
                self.logger.error(format!("Error connecting to object store: {}", e));
                return Err(e);
            }
        };

        let pending = objects.iter().filter(|o| !is_processed(&o.key)).count();
        self.logger.debug(format!(
            "Listed {} object(s), {} not yet processed",
            objects.len(),
            pending
        ));
        if pending == 0 {
            self.logger.info("No new files found.".to_string());
        }

        let listed: HashSet<&str> = objects.iter().map(|o| o.key.as_str()).collect();

        let mut outcomes = Vec::with_capacity(objects.len());
        for object in &objects {
            let half_renamed = !is_processed(&object.key)
                && listed.contains(processed_key(&object.key).as_str());
            let outcome = if half_renamed {
                self.finish_rename(&object.key).await
            } else {
                self.process_object(object).await
            };
            outcomes.push(outcome);
        }

        let mut report = RunReport {
            run_id,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            started_at,
            finished_at: started_at,
            objects_listed: objects.len(),
            outcomes,
            error_count: 0,
            log_entries: Vec::new(),
        };

        if pending > 0 {
            self.logger.info(format!(
                "Run complete: {} published, {} failed, {} skipped",
                report.published_count(),
                report.failed_count(),
                report.skipped_count()
            ));
        }

        let (log_entries, error_count) = self.logger.take_entries();
        report.log_entries = log_entries;
        report.error_count = error_count;
        report.finished_at = Utc::now();

        Ok(report)
    }

    /// Delete an original whose processed copy already exists.
    ///
    /// A previous run published it and copied it but failed to delete it, so
    /// it is not published again.
    async fn finish_rename(&self, key: &str) -> ObjectOutcome {
        self.logger.warn(format!(
            "{} already has a processed copy; removing the leftover original",
            key
        ));

        match self.store.delete_object(key).await {
            Ok(()) => ObjectOutcome::Skipped {
                key: key.to_string(),
                reason: SkipReason::AlreadyProcessed,
            },
            Err(error) => {
                self.logger.error(format!("Failed to remove leftover {}: {}", key, error));
                ObjectOutcome::Failed {
                    key: key.to_string(),
                    stage: FailureStage::Mark,
                    error,
                }
            }
        }
    }

    /// Drive a single object through download, publish, and mark
    pub async fn process_object(&self, object: &StoreObject) -> ObjectOutcome {
        let key = object.key.clone();

        if is_processed(&key) {
            return ObjectOutcome::Skipped { key, reason: SkipReason::AlreadyProcessed };
        }

        let kind = classify(&key);
        if kind == MediaKind::Unrecognized {
            self.logger.debug(format!("Skipping {} (unrecognized extension)", key));
            return ObjectOutcome::Skipped { key, reason: SkipReason::UnrecognizedExtension };
        }

        self.logger.info(format!("Found new file: {} ({}, {} bytes)", key, kind.as_str(), object.size));

        let local_path = match self.download(&key).await {
            Ok(path) => path,
            Err(error) => {
                self.logger.error(format!("Failed to download {}: {}", key, error));
                return ObjectOutcome::Failed { key, stage: FailureStage::Download, error };
            }
        };

        let title = review_title(&self.settings.title_prefix, &key);
        let published = match kind {
            MediaKind::Video => self
                .video
                .publish(&local_path, &title, &self.settings.description)
                .await
                .map(PublishedMedia::VideoId),
            _ => self
                .audio
                .publish(&local_path, &title)
                .await
                .map(PublishedMedia::TrackUrl),
        };

        let remote = match published {
            Ok(remote) => remote,
            Err(error) => {
                self.logger.error(format!("Failed to publish {}: {}", key, error));
                return ObjectOutcome::Failed { key, stage: FailureStage::Publish, error };
            }
        };

        match self.store.mark_processed(&key).await {
            Ok(new_key) => {
                self.logger.info(format!("Marked {} as processed ({}, now {}).", key, remote, new_key));
                ObjectOutcome::Published { key, remote }
            }
            Err(error) => {
                self.logger.error(format!(
                    "Published {} as {} but failed to mark it processed: {}",
                    key, remote, error
                ));
                ObjectOutcome::Failed { key, stage: FailureStage::Mark, error }
            }
        }
    }

    async fn download(&self, key: &str) -> Result<PathBuf, String> {
        let local_path = scratch_path(&self.settings.download_dir, key)?;
        let bytes = self.store.download_object(key, &local_path).await?;
        self.logger.debug(format!("Downloaded {} ({} bytes) to {}", key, bytes, local_path.display()));
        Ok(local_path)
    }

    /// Repeat `run_once` every `interval`.
    ///
    /// A failed listing is logged and the next tick proceeds. Stops after
    /// `max_runs` runs when given, otherwise never returns.
    pub async fn watch<F>(&self, interval: Duration, max_runs: Option<usize>, mut on_report: F)
    where
        F: FnMut(&RunReport),
    {
        let mut runs = 0usize;
        loop {
            match self.run_once().await {
                Ok(report) => on_report(&report),
                Err(e) => tracing::warn!("Run aborted, retrying in {}s: {}", interval.as_secs(), e),
            }

            runs += 1;
            if max_runs.is_some_and(|max| runs >= max) {
                return;
            }

            tokio::time::sleep(interval).await;
        }
    }
}
