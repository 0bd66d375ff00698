//! Message identity keys and the set of keys already handled.

use std::collections::HashSet;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::db::{job_repo, processed_repo, Database, DatabaseError};
use crate::email::RawMessage;

/// SHA-256 (hex) of subject, sender and date. Computed before the message
/// is classified so a re-fetched message is skipped for free.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn for_message(message: &RawMessage) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(message.subject.as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.sender.as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.date.to_rfc3339().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory view of every key whose handling committed.
///
/// Loaded once per context from `processed_messages` and the `dedup_key`
/// column of `jobs`, then kept current by [`ProcessedKeys::insert`] after
/// each committed transaction.
#[derive(Debug, Default)]
pub struct ProcessedKeys {
    keys: HashSet<String>,
}

impl ProcessedKeys {
    pub fn load(db: &Database) -> Result<Self, DatabaseError> {
        let keys = db.with_conn(|conn| {
            let mut keys: HashSet<String> = processed_repo::all_keys(conn)?.into_iter().collect();
            keys.extend(job_repo::all_dedup_keys(conn)?);
            Ok(keys)
        })?;
        log::debug!("Loaded {} processed message keys", keys.len());
        Ok(Self { keys })
    }

    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key.as_str())
    }

    pub fn insert(&mut self, key: &DedupKey) -> bool {
        self.keys.insert(key.0.clone())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::processed_repo::{ProcessedOutcome, ProcessedRow};
    use chrono::{TimeZone, Utc};

    fn message(subject: &str) -> RawMessage {
        RawMessage {
            subject: subject.to_string(),
            sender: "hr@acme.example".to_string(),
            date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            body: "body is not part of the key".to_string(),
        }
    }

    #[test]
    fn test_key_is_deterministic() {
        let a = DedupKey::for_message(&message("Your application"));
        let mut refetched = message("Your application");
        refetched.body = "different rendering".to_string();
        assert_eq!(a, DedupKey::for_message(&refetched));
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_changes_with_identity_fields() {
        let base = DedupKey::for_message(&message("Your application"));
        assert_ne!(base, DedupKey::for_message(&message("Your application!")));

        let mut other_sender = message("Your application");
        other_sender.sender = "jobs@acme.example".to_string();
        assert_ne!(base, DedupKey::for_message(&other_sender));

        let mut later = message("Your application");
        later.date = later.date + chrono::Duration::seconds(1);
        assert_ne!(base, DedupKey::for_message(&later));
    }

    #[test]
    fn test_field_separator_prevents_shifting() {
        let mut a = message("ab");
        a.sender = "c".to_string();
        let mut b = message("a");
        b.sender = "bc".to_string();
        assert_ne!(DedupKey::for_message(&a), DedupKey::for_message(&b));
    }

    #[test]
    fn test_load_merges_both_tables() {
        let db = Database::open_in_memory().unwrap();
        let processed = DedupKey::for_message(&message("processed"));
        db.with_conn(|conn| {
            processed_repo::insert(
                conn,
                &ProcessedRow {
                    dedup_key: processed.to_string(),
                    outcome: ProcessedOutcome::NotJobRelated,
                    job_id: None,
                    processed_at: Utc::now(),
                },
            )?;
            job_repo::insert(
                conn,
                &job_repo::NewJob {
                    company: "Acme".into(),
                    position: "Data Analyst".into(),
                    status: crate::classifier::JobStatus::Applied,
                    application_date: chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                    notes: String::new(),
                    dedup_key: Some("legacy-key".into()),
                },
            )
        })
        .unwrap();

        let mut keys = ProcessedKeys::load(&db).unwrap();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&processed));

        let fresh = DedupKey::for_message(&message("fresh"));
        assert!(!keys.contains(&fresh));
        assert!(keys.insert(&fresh));
        assert!(!keys.insert(&fresh));
        assert!(keys.contains(&fresh));
    }
}
