use std::path::Path;

use crate::config::schema::{ClassifierSettings, Config, RetryPolicySettings};
use crate::error::ConfigError;

/// Upper bound for the day-count settings under `sync`.
pub const MAX_DAYS: u32 = 3650;

/// Supported on-disk formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, format)
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mailbox = &config.mailbox;
    if mailbox.server.trim().is_empty() {
        return Err(ConfigError::invalid("mailbox.server must not be empty"));
    }
    if mailbox.username.trim().is_empty() {
        return Err(ConfigError::invalid("mailbox.username must not be empty"));
    }
    if mailbox.inbox.trim().is_empty() {
        return Err(ConfigError::invalid("mailbox.inbox must not be empty"));
    }
    if !crate::secrets::has_secret_source(
        mailbox.password.as_deref(),
        mailbox.password_file.as_deref(),
        mailbox.password_env_var.as_deref(),
    ) {
        return Err(ConfigError::invalid(
            "mailbox needs one of password, password_file or password_env_var",
        ));
    }

    if config.sync.poll_interval_secs == 0 {
        return Err(ConfigError::invalid(
            "sync.poll_interval_secs must be greater than zero",
        ));
    }

    for (name, days) in [
        ("sync.lookback_days", config.sync.lookback_days),
        ("sync.initial_lookback_days", config.sync.initial_lookback_days),
        ("sync.soft_delete_grace_days", config.sync.soft_delete_grace_days),
    ] {
        if days > MAX_DAYS {
            return Err(ConfigError::invalid(format!(
                "{} must be at most {}, got {}",
                name, MAX_DAYS, days
            )));
        }
    }

    match &config.classifier {
        ClassifierSettings::Heuristic { min_job_score } => {
            if *min_job_score == 0 {
                return Err(ConfigError::invalid(
                    "classifier.min_job_score must be at least 1",
                ));
            }
        }
        ClassifierSettings::Llm(llm) => {
            if !(llm.endpoint.starts_with("http://") || llm.endpoint.starts_with("https://")) {
                return Err(ConfigError::invalid(format!(
                    "classifier.endpoint must be an http(s) URL, got '{}'",
                    llm.endpoint
                )));
            }
            if llm.model.trim().is_empty() {
                return Err(ConfigError::invalid("classifier.model must not be empty"));
            }
            if llm.timeout_secs == 0 {
                return Err(ConfigError::invalid(
                    "classifier.timeout_secs must be greater than zero",
                ));
            }
        }
    }

    validate_retry("retry.connect", &config.retry.connect)?;
    validate_retry("retry.storage", &config.retry.storage)?;

    Ok(())
}

fn validate_retry(name: &str, policy: &RetryPolicySettings) -> Result<(), ConfigError> {
    if policy.max_attempts == 0 {
        return Err(ConfigError::invalid(format!(
            "{}.max_attempts must be at least 1",
            name
        )));
    }
    if !(0.0..=1.0).contains(&policy.jitter) {
        return Err(ConfigError::invalid(format!(
            "{}.jitter must be between 0.0 and 1.0",
            name
        )));
    }
    if policy.max_delay_ms < policy.base_delay_ms {
        return Err(ConfigError::invalid(format!(
            "{}.max_delay_ms must not be smaller than base_delay_ms",
            name
        )));
    }
    Ok(())
}
