//! Job repository: CRUD operations for the `jobs` table.
//!
//! Functions take a `&Connection` so they compose inside
//! [`Database::with_transaction`](super::Database::with_transaction)
//! as well as plain [`Database::with_conn`](super::Database::with_conn) calls.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::DatabaseError;
use crate::classifier::JobStatus;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A persisted job application record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: i64,
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    pub application_date: NaiveDate,
    pub last_updated: NaiveDate,
    pub notes: String,
    pub dedup_key: Option<String>,
    pub updated: bool,
    pub is_deleted: bool,
}

/// Fields for a row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    pub application_date: NaiveDate,
    pub notes: String,
    pub dedup_key: Option<String>,
}

impl JobRecord {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            company: row.get("company")?,
            position: row.get("position")?,
            status: row.get("status")?,
            application_date: parse_date_column(row, "application_date")?,
            last_updated: parse_date_column(row, "last_updated")?,
            notes: row.get("notes")?,
            dedup_key: row.get("dedup_key")?,
            updated: row.get("updated")?,
            is_deleted: row.get("is_deleted")?,
        })
    }
}

fn parse_date_column(row: &Row<'_>, column: &str) -> Result<NaiveDate, rusqlite::Error> {
    let raw: String = row.get(column)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Inserts a new row and returns its surrogate id. `last_updated` starts
/// equal to `application_date` and `updated` starts false.
pub fn insert(conn: &Connection, job: &NewJob) -> Result<i64, DatabaseError> {
    let date = format_date(job.application_date);
    conn.execute(
        "INSERT INTO jobs (company, position, status, application_date, last_updated,
         notes, dedup_key, updated, is_deleted)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, 0, 0)",
        params![
            job.company,
            job.position,
            job.status,
            date,
            job.notes,
            job.dedup_key,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites every mutable column of an existing row.
pub fn update(conn: &Connection, job: &JobRecord) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET company=?2, position=?3, status=?4, application_date=?5,
         last_updated=?6, notes=?7, updated=?8, is_deleted=?9
         WHERE id=?1",
        params![
            job.id,
            job.company,
            job.position,
            job.status,
            format_date(job.application_date),
            format_date(job.last_updated),
            job.notes,
            job.updated,
            job.is_deleted,
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound(job.id));
    }
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<JobRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM jobs WHERE id = ?1",
            params![id],
            JobRecord::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Finds the record for a (company, position) pair.
///
/// An active row wins over a soft-deleted one; among equals the oldest
/// row wins. Soft-deleted rows are still returned so the caller can refuse
/// to resurrect them.
pub fn find_by_company_position(
    conn: &Connection,
    company: &str,
    position: &str,
) -> Result<Option<JobRecord>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT * FROM jobs WHERE company = ?1 AND position = ?2
             ORDER BY is_deleted ASC, id ASC LIMIT 1",
            params![company, position],
            JobRecord::from_row,
        )
        .optional()?;
    Ok(row)
}

/// Lists records that are not soft-deleted, most recently touched first.
pub fn list_active(conn: &Connection) -> Result<Vec<JobRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM jobs WHERE is_deleted = 0 ORDER BY last_updated DESC, id DESC",
    )?;
    let rows = stmt
        .query_map([], JobRecord::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_all(conn: &Connection) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row("SELECT COUNT(*) FROM jobs", [], |r| r.get(0))?;
    Ok(count)
}

/// Sets or clears the `updated` flag. Returns false when no row matched.
pub fn set_updated_flag(conn: &Connection, id: i64, updated: bool) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET updated = ?2 WHERE id = ?1",
        params![id, updated],
    )?;
    Ok(changed > 0)
}

/// Marks a record soft-deleted and stamps `last_updated` with the deletion date.
pub fn soft_delete(conn: &Connection, id: i64, on: NaiveDate) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE jobs SET is_deleted = 1, last_updated = ?2 WHERE id = ?1",
        params![id, format_date(on)],
    )?;
    Ok(changed > 0)
}

/// Physically removes soft-deleted rows last touched before `cutoff`.
pub fn purge_deleted_before(conn: &Connection, cutoff: NaiveDate) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM jobs WHERE is_deleted = 1 AND last_updated < ?1",
        params![format_date(cutoff)],
    )?;
    Ok(removed)
}

/// Every non-null dedup key carried by a job row.
pub fn all_dedup_keys(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT dedup_key FROM jobs WHERE dedup_key IS NOT NULL")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn sample_job(company: &str, position: &str) -> NewJob {
        NewJob {
            company: company.to_string(),
            position: position.to_string(),
            status: JobStatus::Applied,
            application_date: date("2026-03-01"),
            notes: "Email subject: hi".to_string(),
            dedup_key: None,
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let id = db
            .with_conn(|conn| insert(conn, &sample_job("Acme Corp", "Software Engineer")))
            .unwrap();

        let found = db.with_conn(|conn| find_by_id(conn, id)).unwrap().unwrap();
        assert_eq!(found.company, "Acme Corp");
        assert_eq!(found.status, JobStatus::Applied);
        assert_eq!(found.last_updated, date("2026-03-01"));
        assert!(!found.updated);
        assert!(!found.is_deleted);
    }

    #[test]
    fn test_find_nonexistent() {
        let db = test_db();
        assert!(db.with_conn(|conn| find_by_id(conn, 999)).unwrap().is_none());
    }

    #[test]
    fn test_update_round_trip() {
        let db = test_db();
        db.with_conn(|conn| {
            let id = insert(conn, &sample_job("Acme", "Analyst"))?;
            let mut job = find_by_id(conn, id)?.unwrap();
            job.status = JobStatus::Interview;
            job.updated = true;
            job.last_updated = date("2026-03-05");
            update(conn, &job)?;

            let found = find_by_id(conn, id)?.unwrap();
            assert_eq!(found.status, JobStatus::Interview);
            assert!(found.updated);
            assert_eq!(found.last_updated, date("2026-03-05"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_missing_row_is_not_found() {
        let db = test_db();
        let result = db.with_conn(|conn| {
            let id = insert(conn, &sample_job("Acme", "Analyst"))?;
            let mut job = find_by_id(conn, id)?.unwrap();
            job.id = 4242;
            update(conn, &job)
        });
        assert!(matches!(result, Err(DatabaseError::NotFound(4242))));
    }

    #[test]
    fn test_find_by_company_position_prefers_active() {
        let db = test_db();
        db.with_conn(|conn| {
            let deleted = insert(conn, &sample_job("Acme", "Analyst"))?;
            soft_delete(conn, deleted, date("2026-03-02"))?;
            let active = insert(conn, &sample_job("Acme", "Analyst"))?;

            let found = find_by_company_position(conn, "Acme", "Analyst")?.unwrap();
            assert_eq!(found.id, active);
            assert!(find_by_company_position(conn, "Acme", "Designer")?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_list_active_excludes_deleted() {
        let db = test_db();
        db.with_conn(|conn| {
            insert(conn, &sample_job("A", "One"))?;
            let b = insert(conn, &sample_job("B", "Two"))?;
            soft_delete(conn, b, date("2026-03-02"))?;

            let active = list_active(conn)?;
            assert_eq!(active.len(), 1);
            assert_eq!(active[0].company, "A");
            assert_eq!(count_all(conn)?, 2);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_purge_deleted_before_cutoff() {
        let db = test_db();
        db.with_conn(|conn| {
            let old = insert(conn, &sample_job("Old", "Role"))?;
            soft_delete(conn, old, date("2026-01-01"))?;
            let recent = insert(conn, &sample_job("Recent", "Role"))?;
            soft_delete(conn, recent, date("2026-03-01"))?;
            insert(conn, &sample_job("Live", "Role"))?;

            let removed = purge_deleted_before(conn, date("2026-02-01"))?;
            assert_eq!(removed, 1);
            assert!(find_by_id(conn, old)?.is_none());
            assert!(find_by_id(conn, recent)?.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_dedup_keys_and_updated_flag() {
        let db = test_db();
        db.with_conn(|conn| {
            let mut job = sample_job("Acme", "Analyst");
            job.dedup_key = Some("abc".to_string());
            let id = insert(conn, &job)?;
            insert(conn, &sample_job("Other", "Role"))?;

            assert_eq!(all_dedup_keys(conn)?, vec!["abc".to_string()]);

            assert!(set_updated_flag(conn, id, true)?);
            assert!(find_by_id(conn, id)?.unwrap().updated);
            assert!(!set_updated_flag(conn, 999, false)?);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_legacy_offer_status_reads_as_offered() {
        let db = test_db();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs (company, position, status, application_date, last_updated)
                 VALUES ('Acme', 'Analyst', 'Offer', '2026-01-01', '2026-01-01')",
                [],
            )?;
            let id = conn.last_insert_rowid();
            assert_eq!(find_by_id(conn, id)?.unwrap().status, JobStatus::Offered);
            Ok(())
        })
        .unwrap();
    }
}
