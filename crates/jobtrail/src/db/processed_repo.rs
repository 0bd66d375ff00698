//! Processed message repository: the durable half of the dedup key set.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

/// What happened to a message whose key was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessedOutcome {
    Inserted,
    Merged,
    SkippedDeleted,
    NotJobRelated,
}

impl ProcessedOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessedOutcome::Inserted => "inserted",
            ProcessedOutcome::Merged => "merged",
            ProcessedOutcome::SkippedDeleted => "skipped_deleted",
            ProcessedOutcome::NotJobRelated => "not_job_related",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "inserted" => Some(ProcessedOutcome::Inserted),
            "merged" => Some(ProcessedOutcome::Merged),
            "skipped_deleted" => Some(ProcessedOutcome::SkippedDeleted),
            "not_job_related" => Some(ProcessedOutcome::NotJobRelated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRow {
    pub dedup_key: String,
    pub outcome: ProcessedOutcome,
    pub job_id: Option<i64>,
    pub processed_at: DateTime<Utc>,
}

/// Records a key. Strict insert: a duplicate key is a constraint error, so
/// two passes racing on the same message cannot both commit a merge.
pub fn insert(conn: &Connection, row: &ProcessedRow) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO processed_messages (dedup_key, outcome, job_id, processed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            row.dedup_key,
            row.outcome.as_str(),
            row.job_id,
            row.processed_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn contains(conn: &Connection, key: &str) -> Result<bool, DatabaseError> {
    let found = conn
        .query_row(
            "SELECT 1 FROM processed_messages WHERE dedup_key = ?1",
            params![key],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn find(conn: &Connection, key: &str) -> Result<Option<ProcessedRow>, DatabaseError> {
    let raw = conn
        .query_row(
            "SELECT dedup_key, outcome, job_id, processed_at FROM processed_messages
             WHERE dedup_key = ?1",
            params![key],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((dedup_key, outcome, job_id, processed_at)) = raw else {
        return Ok(None);
    };
    let outcome = ProcessedOutcome::parse(&outcome).ok_or_else(|| DatabaseError::InvalidField {
        field: "outcome",
        reason: format!("unknown outcome '{}'", outcome),
    })?;
    let processed_at = DateTime::parse_from_rfc3339(&processed_at)
        .map_err(|e| DatabaseError::InvalidField {
            field: "processed_at",
            reason: e.to_string(),
        })?
        .with_timezone(&Utc);

    Ok(Some(ProcessedRow {
        dedup_key,
        outcome,
        job_id,
        processed_at,
    }))
}

/// Every recorded key, for seeding the in-memory set at startup.
pub fn all_keys(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT dedup_key FROM processed_messages")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}
