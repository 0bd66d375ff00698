//! Reconciles classified messages into the job record store.
//!
//! Records are matched on the exact `(company, position)` pair. Every merge
//! runs in one immediate transaction together with the write that marks the
//! message key as processed, so either both land or neither does.

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use rusqlite::Connection;

use crate::classifier::JobExtraction;
use crate::db::job_repo::{self, NewJob};
use crate::db::processed_repo::{self, ProcessedOutcome, ProcessedRow};
use crate::db::{Database, DatabaseError};
use crate::dedup::DedupKey;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted { id: i64 },
    Updated { id: i64, status_changed: bool },
    /// The matching record is soft-deleted and was left alone.
    SkippedDeleted { id: i64 },
}

impl MergeOutcome {
    pub fn job_id(&self) -> i64 {
        match self {
            MergeOutcome::Inserted { id }
            | MergeOutcome::Updated { id, .. }
            | MergeOutcome::SkippedDeleted { id } => *id,
        }
    }

    fn processed_outcome(&self) -> ProcessedOutcome {
        match self {
            MergeOutcome::Inserted { .. } => ProcessedOutcome::Inserted,
            MergeOutcome::Updated { .. } => ProcessedOutcome::Merged,
            MergeOutcome::SkippedDeleted { .. } => ProcessedOutcome::SkippedDeleted,
        }
    }
}

/// Appends `addition` to `existing` separated by a blank line.
pub fn append_notes(existing: &str, addition: &str) -> String {
    let existing = existing.trim_end();
    let addition = addition.trim();
    match (existing.is_empty(), addition.is_empty()) {
        (true, _) => addition.to_string(),
        (false, true) => existing.to_string(),
        (false, false) => format!("{}\n\n{}", existing, addition),
    }
}

/// Applies one extraction inside an open transaction. Does not record the key.
pub fn apply(
    conn: &Connection,
    key: &DedupKey,
    extraction: &JobExtraction,
    observed_on: NaiveDate,
) -> Result<MergeOutcome, DatabaseError> {
    let existing =
        job_repo::find_by_company_position(conn, &extraction.company, &extraction.position)?;

    let Some(mut record) = existing else {
        let id = job_repo::insert(
            conn,
            &NewJob {
                company: extraction.company.clone(),
                position: extraction.position.clone(),
                status: extraction.status,
                application_date: observed_on,
                notes: extraction.normalized_content.trim().to_string(),
                dedup_key: Some(key.to_string()),
            },
        )?;
        return Ok(MergeOutcome::Inserted { id });
    };

    if record.is_deleted {
        return Ok(MergeOutcome::SkippedDeleted { id: record.id });
    }

    record.notes = append_notes(&record.notes, &extraction.normalized_content);
    record.last_updated = record.last_updated.max(observed_on);

    let status_changed = record.status != extraction.status;
    if status_changed {
        record.status = extraction.status;
        record.updated = true;
    }

    job_repo::update(conn, &record)?;
    Ok(MergeOutcome::Updated {
        id: record.id,
        status_changed,
    })
}

/// Runs merges with a bounded retry on lock contention.
#[derive(Clone)]
pub struct MergeEngine {
    db: Database,
    retry: RetryPolicy,
}

impl MergeEngine {
    pub fn new(db: Database, retry: RetryPolicy) -> Self {
        Self { db, retry }
    }

    /// Reconciles one job-related message and records its key.
    ///
    /// A transient failure retries the whole transaction; once the budget
    /// is spent, or on any other error, the store is left as it was before
    /// the call and the error is returned.
    pub async fn merge(
        &self,
        key: &DedupKey,
        extraction: &JobExtraction,
        observed_at: DateTime<Utc>,
    ) -> Result<MergeOutcome, DatabaseError> {
        let observed_on = observed_at.date_naive();
        let outcome = self
            .retry
            .run("merge", DatabaseError::is_transient, || {
                self.db.with_transaction(|tx| {
                    let outcome = apply(tx, key, extraction, observed_on)?;
                    processed_repo::insert(
                        tx,
                        &ProcessedRow {
                            dedup_key: key.to_string(),
                            outcome: outcome.processed_outcome(),
                            job_id: Some(outcome.job_id()),
                            processed_at: Utc::now(),
                        },
                    )?;
                    Ok(outcome)
                })
            })
            .await?;

        match outcome {
            MergeOutcome::Inserted { id } => info!(
                "New record #{}: {} / {} ({})",
                id, extraction.company, extraction.position, extraction.status
            ),
            MergeOutcome::Updated { id, status_changed } => info!(
                "Merged into record #{}{}",
                id,
                if status_changed { ", status changed" } else { "" }
            ),
            MergeOutcome::SkippedDeleted { id } => {
                debug!("Record #{} is deleted, not reviving it", id)
            }
        }
        Ok(outcome)
    }

    /// Records the key of a message that was classified as not job related.
    pub async fn record_not_job_related(&self, key: &DedupKey) -> Result<(), DatabaseError> {
        self.retry
            .run("record key", DatabaseError::is_transient, || {
                self.db.with_conn(|conn| {
                    processed_repo::insert(
                        conn,
                        &ProcessedRow {
                            dedup_key: key.to_string(),
                            outcome: ProcessedOutcome::NotJobRelated,
                            job_id: None,
                            processed_at: Utc::now(),
                        },
                    )
                })
            })
            .await
    }
}
