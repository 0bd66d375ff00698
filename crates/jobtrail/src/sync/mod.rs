//! The fetch, classify and merge pass, and the worker that schedules it.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::DatabaseError;
use crate::email::EmailError;

pub mod context;
pub mod status;
pub mod worker;

pub use context::SyncContext;
pub use status::SyncStatus;
pub use worker::SyncWorker;

/// Errors that abort a whole pass. The watermark is left untouched.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("A sync pass is already running")]
    Busy,

    #[error("Mail source unavailable: {0}")]
    Connection(#[from] EmailError),

    #[error("Store unavailable: {0}")]
    Storage(#[from] DatabaseError),
}

impl SyncError {
    /// One line for the health indicator.
    pub fn summary(&self) -> String {
        match self {
            SyncError::Busy => "Sync already in progress".to_string(),
            SyncError::Connection(EmailError::AuthenticationFailed(_))
            | SyncError::Connection(EmailError::CredentialsNotFound(_)) => {
                "Mail server rejected the credentials".to_string()
            }
            SyncError::Connection(EmailError::Timeout(_)) => {
                "Mail server did not respond in time".to_string()
            }
            SyncError::Connection(_) => "Cannot reach mail server".to_string(),
            SyncError::Storage(_) => "Local database unavailable".to_string(),
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub messages_listed: usize,
    /// Already handled on an earlier pass, skipped before classification.
    pub skipped_known: usize,
    pub not_job_related: usize,
    pub inserted: usize,
    pub merged: usize,
    pub status_changed: usize,
    pub skipped_deleted: usize,
    pub archived: usize,
    pub fetch_failed: usize,
    pub decode_failed: usize,
    pub classification_failed: usize,
    pub storage_failed: usize,
    /// Soft-deleted rows physically removed after the pass.
    pub purged: usize,
    /// A stop was requested before every message was handled.
    pub interrupted: bool,
    /// Set only when the batch completed and the watermark advanced.
    pub new_watermark: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn records_touched(&self) -> usize {
        self.inserted + self.merged
    }

    pub fn messages_failed(&self) -> usize {
        self.fetch_failed + self.decode_failed + self.classification_failed + self.storage_failed
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} messages: {} new, {} merged, {} skipped, {} failed",
            self.messages_listed,
            self.inserted,
            self.merged,
            self.skipped_known + self.skipped_deleted + self.not_job_related,
            self.messages_failed()
        )?;
        if self.interrupted {
            f.write_str(" (stopped early)")?;
        }
        Ok(())
    }
}
