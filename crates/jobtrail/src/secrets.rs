//! Credential resolution for the mailbox password and the LLM API key.
//!
//! A credential may be given three ways, checked in this order:
//!
//! 1. inline in the config file (`password: "..."`), handy for a quick local try
//! 2. a file path (`password_file: /run/secrets/imap`), trimmed on read
//! 3. an environment variable name (`password_env_var: IMAP_PASSWORD`)
//!
//! Empty strings count as "not given".

use std::fs;

use secrecy::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

pub type Result<T> = std::result::Result<T, SecretError>;

fn given(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolves a secret from the first source that is given.
///
/// A source that is given but unreadable is an error; later sources are not
/// consulted in that case, so a typo in `password_file` is not masked by a
/// stale environment variable.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = given(direct) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = given(file_path) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|source| SecretError::FileReadError {
                path: expanded,
                source,
            });
    }

    if let Some(name) = given(env_var) {
        return match std::env::var(name) {
            Ok(value) => Ok(SecretString::from(value.trim().to_string())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`] but `Ok(None)` when nothing is configured.
/// Used for the API key of local LLM servers that need none.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    given(direct).is_some() || given(file_path).is_some() || given(env_var).is_some()
}

/// Expands a leading `~` or `~/` to the home directory. `~user` is left alone.
pub fn expand_home(path: &str) -> String {
    if path != "~" && !path.starts_with("~/") {
        return path.to_string();
    }
    match dirs::home_dir() {
        Some(home) if path == "~" => home.to_string_lossy().into_owned(),
        Some(home) => home.join(&path[2..]).to_string_lossy().into_owned(),
        None => path.to_string(),
    }
}
