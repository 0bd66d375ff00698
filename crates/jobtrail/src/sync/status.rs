//! Health indicator persisted after every pass.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{state_repo, Database, DatabaseError};

/// What a foreground surface shows: healthy or not, when the last
/// successful pass finished, and a one-line summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub healthy: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub summary: String,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            healthy: true,
            last_synced_at: None,
            summary: "Never synced".to_string(),
        }
    }
}

impl SyncStatus {
    pub fn load(db: &Database) -> Result<Self, DatabaseError> {
        db.with_conn(|conn| {
            let healthy = state_repo::get(conn, state_repo::KEY_LAST_SYNC_OK)?;
            let Some(healthy) = healthy else {
                return Ok(SyncStatus::default());
            };
            let last_synced_at = state_repo::get(conn, state_repo::KEY_LAST_SYNC_AT)?
                .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
                .map(|ts| ts.with_timezone(&Utc));
            let summary = state_repo::get(conn, state_repo::KEY_LAST_SYNC_SUMMARY)?
                .unwrap_or_default();
            Ok(SyncStatus {
                healthy: healthy == "1",
                last_synced_at,
                summary,
            })
        })
    }

    /// Records a completed pass.
    pub(crate) fn record_success(
        db: &Database,
        at: DateTime<Utc>,
        summary: &str,
    ) -> Result<(), DatabaseError> {
        db.with_transaction(|tx| {
            state_repo::set(tx, state_repo::KEY_LAST_SYNC_OK, "1")?;
            state_repo::set(tx, state_repo::KEY_LAST_SYNC_AT, &at.to_rfc3339())?;
            state_repo::set(tx, state_repo::KEY_LAST_SYNC_SUMMARY, summary)
        })
    }

    /// Records a failed pass. The last successful time is kept.
    pub(crate) fn record_failure(db: &Database, summary: &str) -> Result<(), DatabaseError> {
        db.with_transaction(|tx| {
            state_repo::set(tx, state_repo::KEY_LAST_SYNC_OK, "0")?;
            state_repo::set(tx, state_repo::KEY_LAST_SYNC_SUMMARY, summary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_never_synced() {
        let db = Database::open_in_memory().unwrap();
        let status = SyncStatus::load(&db).unwrap();
        assert_eq!(status, SyncStatus::default());
    }

    #[test]
    fn test_failure_keeps_last_success_time() {
        let db = Database::open_in_memory().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 7, 0, 0).unwrap();

        SyncStatus::record_success(&db, at, "3 messages, 1 new").unwrap();
        let ok = SyncStatus::load(&db).unwrap();
        assert!(ok.healthy);
        assert_eq!(ok.last_synced_at, Some(at));

        SyncStatus::record_failure(&db, "Cannot reach mail server").unwrap();
        let failed = SyncStatus::load(&db).unwrap();
        assert!(!failed.healthy);
        assert_eq!(failed.last_synced_at, Some(at));
        assert_eq!(failed.summary, "Cannot reach mail server");
    }
}
