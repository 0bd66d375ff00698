//! Builders for test messages and settings.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use jobtrail::config::{RetryPolicySettings, RetrySettings, SyncSettings};

/// Builds RFC 5322 message bytes.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    from: String,
    subject: String,
    date: DateTime<Utc>,
    body: String,
    charset: Option<String>,
    raw_subject: Option<Vec<u8>>,
}

impl MessageBuilder {
    pub fn new(subject: &str) -> Self {
        Self {
            from: "Acme Recruiting <jobs@acme.example>".to_string(),
            subject: subject.to_string(),
            date: hours_ago(2),
            body: String::new(),
            charset: Some("utf-8".to_string()),
            raw_subject: None,
        }
    }

    pub fn from(mut self, from: &str) -> Self {
        self.from = from.to_string();
        self
    }

    pub fn date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// Subject header bytes written verbatim, for charset edge cases.
    pub fn raw_subject(mut self, bytes: &[u8]) -> Self {
        self.raw_subject = Some(bytes.to_vec());
        self
    }

    pub fn charset(mut self, charset: Option<&str>) -> Self {
        self.charset = charset.map(str::to_string);
        self
    }

    pub fn date_value(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(format!("From: {}\r\n", self.from).as_bytes());
        out.extend_from_slice(b"To: me@example.com\r\n");
        out.extend_from_slice(b"Subject: ");
        match &self.raw_subject {
            Some(raw) => out.extend_from_slice(raw),
            None => out.extend_from_slice(self.subject.as_bytes()),
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(format!("Date: {}\r\n", self.date.to_rfc2822()).as_bytes());
        out.extend_from_slice(b"MIME-Version: 1.0\r\n");
        match &self.charset {
            Some(charset) => out.extend_from_slice(
                format!("Content-Type: text/plain; charset={}\r\n", charset).as_bytes(),
            ),
            None => out.extend_from_slice(b"Content-Type: text/plain\r\n"),
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(self.body.replace('\n', "\r\n").as_bytes());
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// A whole-second timestamp `hours` before now, so re-runs still see it
/// inside the watermark window.
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp() - hours * 3600, 0).unwrap()
}

pub fn march(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
}

/// Retry settings with millisecond delays.
pub fn fast_retry() -> RetrySettings {
    let fast = RetryPolicySettings {
        max_attempts: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
        jitter: 0.0,
    };
    RetrySettings {
        connect: fast.clone(),
        storage: fast,
    }
}

/// Sync settings with a wide first window so fixed test dates are inside it.
pub fn sync_settings() -> SyncSettings {
    SyncSettings {
        initial_lookback_days: 365 * 50,
        ..SyncSettings::default()
    }
}
