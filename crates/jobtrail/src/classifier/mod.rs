//! Decides whether a message is about one of the user's own job
//! applications and, if so, extracts company, position and status.
//!
//! Two interchangeable strategies implement [`Classifier`]:
//! [`HeuristicClassifier`] (keyword scoring plus a proper-noun tagger) and
//! [`LlmClassifier`] (an OpenAI-compatible chat completion with a strict
//! response schema).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use log::warn;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClassifierSettings;
use crate::email::RawMessage;

pub mod heuristic;
pub mod keywords;
pub mod llm;
pub mod response;
pub mod tagger;
pub mod tokenize;

pub use heuristic::HeuristicClassifier;
pub use llm::LlmClassifier;

/// Where an application stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    Applied,
    Interview,
    Offered,
    Rejected,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Applied => "Applied",
            JobStatus::Interview => "Interview",
            JobStatus::Offered => "Offered",
            JobStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown application status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    /// Case-insensitive. `Offer` is accepted for rows written by older tools.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "applied" => Ok(JobStatus::Applied),
            "interview" => Ok(JobStatus::Interview),
            "offered" | "offer" => Ok(JobStatus::Offered),
            "rejected" => Ok(JobStatus::Rejected),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl ToSql for JobStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for JobStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Fields extracted from a job-related message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExtraction {
    pub company: String,
    pub position: String,
    pub status: JobStatus,
    /// Text appended to the record's notes.
    pub normalized_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationResult {
    NotJobRelated,
    JobRelated(JobExtraction),
}

impl ClassificationResult {
    pub fn is_job_related(&self) -> bool {
        matches!(self, ClassificationResult::JobRelated(_))
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("classification service unreachable: {0}")]
    Transport(String),

    #[error("classification service returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("classification response is not valid JSON: {0}")]
    MalformedResponse(String),

    #[error("classification response violates schema: {0}")]
    SchemaViolation(String),

    #[error("classifier configuration error: {0}")]
    Config(String),
}

/// A strategy that turns a decoded message into a [`ClassificationResult`].
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Classifies, surfacing failures so the caller can decide whether the
    /// message should be retried on a later pass.
    async fn try_classify(
        &self,
        message: &RawMessage,
    ) -> Result<ClassificationResult, ClassificationError>;

    /// Classifies, degrading any failure to `NotJobRelated` with a logged cause.
    async fn classify(&self, message: &RawMessage) -> ClassificationResult {
        match self.try_classify(message).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    "{} classifier failed for '{}': {}",
                    self.name(),
                    message.subject,
                    e
                );
                ClassificationResult::NotJobRelated
            }
        }
    }
}

/// Builds the configured strategy.
pub fn from_settings(
    settings: &ClassifierSettings,
) -> Result<Arc<dyn Classifier>, ClassificationError> {
    match settings {
        ClassifierSettings::Heuristic { min_job_score } => {
            Ok(Arc::new(HeuristicClassifier::new(*min_job_score)))
        }
        ClassifierSettings::Llm(llm) => Ok(Arc::new(LlmClassifier::from_settings(llm)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("Applied".parse::<JobStatus>().unwrap(), JobStatus::Applied);
        assert_eq!("interview".parse::<JobStatus>().unwrap(), JobStatus::Interview);
        assert_eq!("Offer".parse::<JobStatus>().unwrap(), JobStatus::Offered);
        assert_eq!(" REJECTED ".parse::<JobStatus>().unwrap(), JobStatus::Rejected);
        assert!("Ghosted".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_display_round_trips() {
        for status in [
            JobStatus::Applied,
            JobStatus::Interview,
            JobStatus::Offered,
            JobStatus::Rejected,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_from_settings_builds_heuristic_by_default() {
        let classifier = from_settings(&ClassifierSettings::default()).unwrap();
        assert_eq!(classifier.name(), "heuristic");
    }

    struct Failing;

    #[async_trait]
    impl Classifier for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn try_classify(
            &self,
            _message: &RawMessage,
        ) -> Result<ClassificationResult, ClassificationError> {
            Err(ClassificationError::Transport("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_classify_degrades_failure_to_not_job_related() {
        let message = RawMessage {
            subject: "Interview".into(),
            sender: "hr@example.com".into(),
            date: chrono::Utc::now(),
            body: String::new(),
        };
        assert_eq!(
            Failing.classify(&message).await,
            ClassificationResult::NotJobRelated
        );
    }
}
