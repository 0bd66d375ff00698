//! Foreground record operations: the edits a user makes by hand.
//!
//! Each call is one transaction scoped to a single record, so these
//! interleave safely with background merges.

use chrono::{NaiveDate, Utc};

use crate::classifier::JobStatus;
use crate::db::job_repo::{self, JobRecord, NewJob, DATE_FORMAT};
use crate::db::{Database, DatabaseError};

pub const PLACEHOLDER_COMPANY: &str = "New Company";
pub const PLACEHOLDER_POSITION: &str = "New Position";

/// A partial edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecordEdit {
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: Option<JobStatus>,
    /// `YYYY-MM-DD`.
    pub application_date: Option<String>,
}

fn non_empty(field: &'static str, value: &str) -> Result<String, DatabaseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::InvalidField {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_date(value: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        DatabaseError::InvalidField {
            field: "application_date",
            reason: format!("'{}' is not a YYYY-MM-DD date", value),
        }
    })
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Clone)]
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a blank record dated today for the user to fill in.
    pub fn add_placeholder(&self) -> Result<JobRecord, DatabaseError> {
        self.db.with_transaction(|tx| {
            let id = job_repo::insert(
                tx,
                &NewJob {
                    company: PLACEHOLDER_COMPANY.to_string(),
                    position: PLACEHOLDER_POSITION.to_string(),
                    status: JobStatus::Applied,
                    application_date: today(),
                    notes: String::new(),
                    dedup_key: None,
                },
            )?;
            job_repo::find_by_id(tx, id)?.ok_or(DatabaseError::NotFound(id))
        })
    }

    /// Applies a validated edit and stamps `last_updated` with today.
    /// A status change flags the record as updated, like a merge would.
    pub fn edit(&self, id: i64, edit: RecordEdit) -> Result<JobRecord, DatabaseError> {
        let company = edit
            .company
            .as_deref()
            .map(|c| non_empty("company", c))
            .transpose()?;
        let position = edit
            .position
            .as_deref()
            .map(|p| non_empty("position", p))
            .transpose()?;
        let application_date = edit.application_date.as_deref().map(parse_date).transpose()?;

        self.db.with_transaction(|tx| {
            let mut record = job_repo::find_by_id(tx, id)?.ok_or(DatabaseError::NotFound(id))?;

            if let Some(company) = company {
                record.company = company;
            }
            if let Some(position) = position {
                record.position = position;
            }
            if let Some(date) = application_date {
                record.application_date = date;
            }
            if let Some(status) = edit.status {
                if status != record.status {
                    record.status = status;
                    record.updated = true;
                }
            }
            record.last_updated = today();

            job_repo::update(tx, &record)?;
            Ok(record)
        })
    }

    /// Replaces the notes. Merges only ever append; this is the one path
    /// that overwrites.
    pub fn set_notes(&self, id: i64, notes: &str) -> Result<(), DatabaseError> {
        self.db.with_transaction(|tx| {
            let mut record = job_repo::find_by_id(tx, id)?.ok_or(DatabaseError::NotFound(id))?;
            record.notes = notes.to_string();
            job_repo::update(tx, &record)
        })
    }

    /// Clears the `updated` flag.
    pub fn acknowledge(&self, id: i64) -> Result<(), DatabaseError> {
        let found = self
            .db
            .with_conn(|conn| job_repo::set_updated_flag(conn, id, false))?;
        if !found {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    pub fn soft_delete(&self, id: i64) -> Result<(), DatabaseError> {
        let found = self
            .db
            .with_conn(|conn| job_repo::soft_delete(conn, id, today()))?;
        if !found {
            return Err(DatabaseError::NotFound(id));
        }
        log::info!("Record #{} deleted", id);
        Ok(())
    }

    pub fn list_active(&self) -> Result<Vec<JobRecord>, DatabaseError> {
        self.db.with_conn(job_repo::list_active)
    }

    pub fn get(&self, id: i64) -> Result<Option<JobRecord>, DatabaseError> {
        self.db.with_conn(|conn| job_repo::find_by_id(conn, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RecordStore {
        RecordStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_add_placeholder() {
        let store = store();
        let record = store.add_placeholder().unwrap();
        assert_eq!(record.company, PLACEHOLDER_COMPANY);
        assert_eq!(record.position, PLACEHOLDER_POSITION);
        assert_eq!(record.status, JobStatus::Applied);
        assert_eq!(record.application_date, today());
        assert_eq!(record.notes, "");
        assert!(!record.updated);
        assert_eq!(store.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_edit_fields_without_status_keeps_flag() {
        let store = store();
        let id = store.add_placeholder().unwrap().id;

        let record = store
            .edit(
                id,
                RecordEdit {
                    company: Some("  Initech ".into()),
                    position: Some("QA Engineer".into()),
                    application_date: Some("2024-02-29".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(record.company, "Initech");
        assert_eq!(record.application_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(!record.updated);
    }

    #[test]
    fn test_edit_status_sets_flag_and_acknowledge_clears() {
        let store = store();
        let id = store.add_placeholder().unwrap().id;

        let record = store
            .edit(
                id,
                RecordEdit {
                    status: Some(JobStatus::Interview),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(record.updated);

        store.acknowledge(id).unwrap();
        assert!(!store.get(id).unwrap().unwrap().updated);
    }

    #[test]
    fn test_edit_validation() {
        let store = store();
        let id = store.add_placeholder().unwrap().id;

        let err = store
            .edit(
                id,
                RecordEdit {
                    company: Some("   ".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidField { field: "company", .. }));

        let err = store
            .edit(
                id,
                RecordEdit {
                    application_date: Some("03/01/2024".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::InvalidField {
                field: "application_date",
                ..
            }
        ));

        assert_eq!(store.get(id).unwrap().unwrap().company, PLACEHOLDER_COMPANY);
    }

    #[test]
    fn test_missing_record() {
        let store = store();
        assert!(matches!(
            store.edit(42, RecordEdit::default()),
            Err(DatabaseError::NotFound(42))
        ));
        assert!(matches!(store.acknowledge(42), Err(DatabaseError::NotFound(42))));
        assert!(matches!(store.soft_delete(42), Err(DatabaseError::NotFound(42))));
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_set_notes_overwrites() {
        let store = store();
        let id = store.add_placeholder().unwrap().id;
        store.set_notes(id, "first").unwrap();
        store.set_notes(id, "replaced").unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().notes, "replaced");
    }

    #[test]
    fn test_soft_delete_hides_record() {
        let store = store();
        let keep = store.add_placeholder().unwrap().id;
        let gone = store.add_placeholder().unwrap().id;
        store.soft_delete(gone).unwrap();

        let active: Vec<i64> = store.list_active().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(active, vec![keep]);
        assert!(store.get(gone).unwrap().unwrap().is_deleted);
    }
}
