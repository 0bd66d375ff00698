use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mailbox: MailboxSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub classifier: ClassifierSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    /// Defaults to `~/.jobtrail/data/jobtrail.db`.
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxSettings {
    pub server: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    pub username: String,
    #[serde(default = "default_inbox")]
    pub inbox: String,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub password_env_var: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_imap_port() -> u16 {
    993
}

fn default_inbox() -> String {
    "INBOX".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Safety backoff subtracted from the watermark before searching.
    #[serde(default = "default_one_day")]
    pub lookback_days: u32,
    /// Used instead of the watermark on the very first run.
    #[serde(default = "default_one_day")]
    pub initial_lookback_days: u32,
    /// Delete messages classified as not job related from the inbox.
    #[serde(default)]
    pub archive_non_job: bool,
    #[serde(default = "default_grace_days")]
    pub soft_delete_grace_days: u32,
}

fn default_poll_interval() -> u64 {
    300
}

fn default_one_day() -> u32 {
    1
}

fn default_grace_days() -> u32 {
    30
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            lookback_days: default_one_day(),
            initial_lookback_days: default_one_day(),
            archive_non_job: false,
            soft_delete_grace_days: default_grace_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum ClassifierSettings {
    Heuristic {
        #[serde(default = "default_min_job_score")]
        min_job_score: u32,
    },
    Llm(LlmSettings),
}

fn default_min_job_score() -> u32 {
    2
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        ClassifierSettings::Heuristic {
            min_job_score: default_min_job_score(),
        }
    }
}

/// An OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Base URL, e.g. `http://localhost:11434` or `https://api.openai.com`.
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default)]
    pub api_key_env_var: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_body_chars")]
    pub max_body_chars: usize,
}

fn default_max_body_chars() -> usize {
    4000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "RetryPolicySettings::connect_default")]
    pub connect: RetryPolicySettings,
    #[serde(default = "RetryPolicySettings::storage_default")]
    pub storage: RetryPolicySettings,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            connect: RetryPolicySettings::connect_default(),
            storage: RetryPolicySettings::storage_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Fraction of each delay randomized, `0.0..=1.0`.
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter() -> f64 {
    0.2
}

impl RetryPolicySettings {
    pub fn connect_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }

    pub fn storage_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2_000,
            jitter: default_jitter(),
        }
    }
}
