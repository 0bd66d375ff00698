pub mod classifier;
pub mod config;
pub mod db;
pub mod dedup;
pub mod email;
pub mod error;
pub mod merge;
pub mod records;
pub mod retry;
pub mod secrets;
pub mod sync;
pub mod telemetry;
pub mod watermark;

pub use classifier::{
    ClassificationError, ClassificationResult, Classifier, HeuristicClassifier, JobExtraction,
    JobStatus, LlmClassifier,
};
pub use config::{load_config, Config};
pub use db::job_repo::JobRecord;
pub use db::{Database, DatabaseError};
pub use dedup::{DedupKey, ProcessedKeys};
pub use email::{decode_message, EmailError, ImapClient, MailSource, RawMessage};
pub use error::{ConfigError, JobtrailError, Result};
pub use merge::{MergeEngine, MergeOutcome};
pub use records::{RecordEdit, RecordStore};
pub use retry::RetryPolicy;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use sync::{RunReport, SyncContext, SyncError, SyncStatus, SyncWorker};
pub use watermark::WatermarkTracker;
