//! Persisted "processed up to" timestamp.

use chrono::{DateTime, Duration, Utc};

use crate::db::{state_repo, Database, DatabaseError};

#[derive(Clone)]
pub struct WatermarkTracker {
    db: Database,
}

impl WatermarkTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The stored watermark. An unparseable value is logged and ignored.
    pub fn load(&self) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let raw = self
            .db
            .with_conn(|conn| state_repo::get(conn, state_repo::KEY_WATERMARK))?;
        Ok(raw.and_then(|value| match DateTime::parse_from_rfc3339(&value) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                log::warn!("Ignoring unreadable watermark '{}': {}", value, e);
                None
            }
        }))
    }

    /// Stores `ts` unless the stored watermark is already later.
    pub fn advance(&self, ts: DateTime<Utc>) -> Result<DateTime<Utc>, DatabaseError> {
        let current = self.load()?;
        let next = current.map_or(ts, |c| c.max(ts));
        self.db.with_conn(|conn| {
            state_repo::set(conn, state_repo::KEY_WATERMARK, &next.to_rfc3339())
        })?;
        Ok(next)
    }

    /// Start of the window to ask the mail source for: the watermark minus
    /// `lookback_days`, or `now - initial_lookback_days` on the first run.
    pub fn window_start(
        watermark: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        lookback_days: u32,
        initial_lookback_days: u32,
    ) -> DateTime<Utc> {
        match watermark {
            Some(ts) => days_before(ts, lookback_days),
            None => days_before(now, initial_lookback_days),
        }
    }
}

/// `ts` minus `days`, clamped to the earliest representable time.
pub fn days_before(ts: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    ts.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_store_has_no_watermark() {
        let tracker = WatermarkTracker::new(Database::open_in_memory().unwrap());
        assert_eq!(tracker.load().unwrap(), None);
    }

    #[test]
    fn test_advance_never_moves_back() {
        let tracker = WatermarkTracker::new(Database::open_in_memory().unwrap());
        let later = Utc.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();

        assert_eq!(tracker.advance(later).unwrap(), later);
        assert_eq!(tracker.advance(earlier).unwrap(), later);
        assert_eq!(tracker.load().unwrap(), Some(later));
    }

    #[test]
    fn test_garbage_watermark_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|c| state_repo::set(c, state_repo::KEY_WATERMARK, "yesterday"))
            .unwrap();
        assert_eq!(WatermarkTracker::new(db).load().unwrap(), None);
    }

    #[test]
    fn test_window_start() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();
        let mark = Utc.with_ymd_and_hms(2024, 5, 9, 12, 0, 0).unwrap();

        assert_eq!(
            WatermarkTracker::window_start(Some(mark), now, 1, 7),
            Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap()
        );
        assert_eq!(
            WatermarkTracker::window_start(None, now, 1, 7),
            Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_huge_lookback_clamps_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap();

        assert_eq!(
            WatermarkTracker::window_start(Some(now), now, u32::MAX, 1),
            DateTime::<Utc>::MIN_UTC
        );
        assert_eq!(
            WatermarkTracker::window_start(None, now, 1, u32::MAX),
            DateTime::<Utc>::MIN_UTC
        );
    }
}
