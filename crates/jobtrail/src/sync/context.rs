//! One fetch, classify and merge pass over the mailbox.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tracing::Instrument;

use super::status::SyncStatus;
use super::{RunReport, SyncError};
use crate::classifier::{self, ClassificationResult, Classifier};
use crate::config::{Config, RetrySettings, SyncSettings};
use crate::db::{job_repo, Database, DatabaseError};
use crate::dedup::{DedupKey, ProcessedKeys};
use crate::email::{decode_message, EmailError, MailSource, MessageId, RawMessage};
use crate::error::JobtrailError;
use crate::merge::{MergeEngine, MergeOutcome};
use crate::retry::RetryPolicy;
use crate::watermark::{days_before, WatermarkTracker};

/// Everything a pass needs, built once at startup and shared by the
/// background worker and any foreground trigger.
///
/// The processed-key set lives behind the pass gate: holding the lock is
/// what it means for a pass to be running.
pub struct SyncContext {
    db: Database,
    settings: SyncSettings,
    classifier: Arc<dyn Classifier>,
    merge: MergeEngine,
    watermark: WatermarkTracker,
    connect_retry: RetryPolicy,
    pass: Mutex<ProcessedKeys>,
    stop: Arc<AtomicBool>,
}

impl SyncContext {
    pub fn new(
        db: Database,
        settings: SyncSettings,
        retry: &RetrySettings,
        classifier: Arc<dyn Classifier>,
    ) -> Result<Self, DatabaseError> {
        let processed = ProcessedKeys::load(&db)?;
        Ok(Self {
            merge: MergeEngine::new(db.clone(), RetryPolicy::from(&retry.storage)),
            watermark: WatermarkTracker::new(db.clone()),
            connect_retry: RetryPolicy::from(&retry.connect),
            db,
            settings,
            classifier,
            pass: Mutex::new(processed),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Builds the context, including the configured classifier strategy.
    pub fn from_config(db: Database, config: &Config) -> Result<Self, JobtrailError> {
        let classifier = classifier::from_settings(&config.classifier)?;
        info!("Using {} classifier", classifier.name());
        Ok(Self::new(db, config.sync.clone(), &config.retry, classifier)?)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flag checked between messages. Setting it makes the running pass
    /// finish the current message and return without advancing the watermark.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_busy(&self) -> bool {
        self.pass.try_lock().is_err()
    }

    pub fn status(&self) -> Result<SyncStatus, DatabaseError> {
        SyncStatus::load(&self.db)
    }

    /// Classifies one message with the configured strategy. Failures
    /// degrade to `NotJobRelated`.
    pub async fn classify(&self, message: &RawMessage) -> ClassificationResult {
        self.classifier.classify(message).await
    }

    /// Runs one pass from the stored watermark.
    ///
    /// Returns [`SyncError::Busy`] at once if another pass holds the gate.
    /// Per-message problems are counted in the report; only failures that
    /// make the whole pass meaningless (cannot connect, cannot list, store
    /// unavailable) are returned as errors, and those leave the watermark
    /// where it was.
    pub async fn run_once(&self, source: &mut dyn MailSource) -> Result<RunReport, SyncError> {
        let mut processed = self.pass.try_lock().map_err(|_| SyncError::Busy)?;
        let started_at = Utc::now();

        let span = tracing::info_span!("sync_pass", started_at = %started_at);
        let result = self
            .run_pass(source, &mut processed, started_at)
            .instrument(span)
            .await;

        match &result {
            Ok(report) => {
                info!("Sync pass finished: {}", report);
                if let Err(e) = SyncStatus::record_success(&self.db, Utc::now(), &report.to_string())
                {
                    warn!("Could not persist sync status: {}", e);
                }
            }
            Err(e) => {
                error!("Sync pass failed: {}", e);
                if let Err(status_err) = SyncStatus::record_failure(&self.db, &e.summary()) {
                    warn!("Could not persist sync status: {}", status_err);
                }
            }
        }
        result
    }

    async fn run_pass(
        &self,
        source: &mut dyn MailSource,
        processed: &mut ProcessedKeys,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, SyncError> {
        let mut report = RunReport::default();

        let watermark = self.watermark.load()?;
        let since = WatermarkTracker::window_start(
            watermark,
            started_at,
            self.settings.lookback_days,
            self.settings.initial_lookback_days,
        );

        self.connect(source).await?;

        let ids = match source.list_since(since).await {
            Ok(ids) => ids,
            Err(e) => {
                logout_quietly(source).await;
                return Err(e.into());
            }
        };
        report.messages_listed = ids.len();
        info!("{} messages since {}", ids.len(), since.format("%Y-%m-%d"));

        for id in ids {
            if self.stop.load(Ordering::Acquire) {
                info!("Stop requested, leaving the rest of the batch for the next pass");
                report.interrupted = true;
                break;
            }
            let span = tracing::debug_span!("message", uid = id);
            self.handle_message(source, id, processed, &mut report)
                .instrument(span)
                .await;
        }

        if report.archived > 0 {
            if let Err(e) = source.expunge().await {
                warn!("Expunge failed: {}", e);
            }
        }
        logout_quietly(source).await;

        if report.interrupted {
            return Ok(report);
        }

        let new_watermark = self.watermark.advance(started_at)?;
        report.new_watermark = Some(new_watermark);
        report.purged = self.purge_deleted(new_watermark)?;

        Ok(report)
    }

    async fn connect(&self, source: &mut dyn MailSource) -> Result<(), EmailError> {
        let mut failed = 0;
        loop {
            match source.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    failed += 1;
                    let delay = if e.is_retryable() {
                        self.connect_retry.backoff(failed)
                    } else {
                        None
                    };
                    let Some(delay) = delay else {
                        return Err(e);
                    };
                    warn!(
                        "Connect failed (attempt {}/{}): {}; retrying in {:?}",
                        failed, self.connect_retry.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn handle_message(
        &self,
        source: &mut dyn MailSource,
        id: MessageId,
        processed: &mut ProcessedKeys,
        report: &mut RunReport,
    ) {
        let bytes = match source.fetch(id).await {
            Ok(bytes) => bytes,
            Err(EmailError::MessageNotFound(_)) => {
                debug!("Message {} vanished before fetch", id);
                return;
            }
            Err(e) => {
                warn!("Fetch of message {} failed: {}", id, e);
                report.fetch_failed += 1;
                return;
            }
        };

        let message = match decode_message(&bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!("Skipping undecodable message {}: {}", id, e);
                report.decode_failed += 1;
                return;
            }
        };

        let key = DedupKey::for_message(&message);
        if processed.contains(&key) {
            debug!("Already handled '{}'", message.subject);
            report.skipped_known += 1;
            return;
        }

        let result = match self.classifier.try_classify(&message).await {
            Ok(result) => result,
            Err(e) => {
                // Not recorded, so a later pass classifies it again.
                warn!(
                    "{} classifier failed for '{}', treating as not job related: {}",
                    self.classifier.name(),
                    message.subject,
                    e
                );
                report.classification_failed += 1;
                return;
            }
        };

        match result {
            ClassificationResult::NotJobRelated => {
                if let Err(e) = self.merge.record_not_job_related(&key).await {
                    error!("Could not record '{}' as handled: {}", message.subject, e);
                    report.storage_failed += 1;
                    return;
                }
                processed.insert(&key);
                report.not_job_related += 1;

                if self.settings.archive_non_job {
                    match source.mark_for_deletion(id).await {
                        Ok(()) => report.archived += 1,
                        Err(e) => warn!("Could not archive message {}: {}", id, e),
                    }
                }
            }
            ClassificationResult::JobRelated(extraction) => {
                match self.merge.merge(&key, &extraction, message.date).await {
                    Ok(outcome) => {
                        processed.insert(&key);
                        match outcome {
                            MergeOutcome::Inserted { .. } => report.inserted += 1,
                            MergeOutcome::Updated { status_changed, .. } => {
                                report.merged += 1;
                                if status_changed {
                                    report.status_changed += 1;
                                }
                            }
                            MergeOutcome::SkippedDeleted { .. } => report.skipped_deleted += 1,
                        }
                    }
                    Err(e) => {
                        error!(
                            "Dropping update for '{}' ({} / {}): {}",
                            message.subject, extraction.company, extraction.position, e
                        );
                        report.storage_failed += 1;
                    }
                }
            }
        }
    }

    fn purge_deleted(&self, watermark: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let cutoff = days_before(watermark, self.settings.soft_delete_grace_days).date_naive();
        let purged = self
            .db
            .with_conn(|conn| job_repo::purge_deleted_before(conn, cutoff))?;
        if purged > 0 {
            info!("Purged {} deleted records older than {}", purged, cutoff);
        }
        Ok(purged)
    }
}

async fn logout_quietly(source: &mut dyn MailSource) {
    if let Err(e) = source.logout().await {
        debug!("Logout failed: {}", e);
    }
}
