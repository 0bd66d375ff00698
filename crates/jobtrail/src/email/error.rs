//! Mail source error types.

use thiserror::Error;

/// Errors raised by a mail source while talking to the server.
#[derive(Error, Debug)]
pub enum EmailError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No password could be resolved from the configured sources.
    #[error("Credentials not found: {0}")]
    CredentialsNotFound(String),

    /// IMAP protocol error.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// Message vanished between search and fetch.
    #[error("Message with UID {0} not found")]
    MessageNotFound(u32),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// An operation was attempted before `connect`.
    #[error("Not connected")]
    NotConnected,
}

impl EmailError {
    /// Whether reconnecting with backoff can plausibly succeed.
    ///
    /// Credential and configuration problems will fail the same way on every
    /// attempt, so they are surfaced immediately.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            EmailError::AuthenticationFailed(_)
                | EmailError::CredentialsNotFound(_)
                | EmailError::ConfigError(_)
                | EmailError::FolderNotFound(_)
        )
    }
}

impl From<async_native_tls::Error> for EmailError {
    fn from(err: async_native_tls::Error) -> Self {
        EmailError::TlsError(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for EmailError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        EmailError::Timeout(err.to_string())
    }
}

/// Result type for mail source operations.
pub type Result<T> = std::result::Result<T, EmailError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_not_retryable() {
        assert!(!EmailError::AuthenticationFailed("bad password".into()).is_retryable());
        assert!(!EmailError::CredentialsNotFound("IMAP_PASSWORD".into()).is_retryable());
        assert!(!EmailError::ConfigError("TLS required".into()).is_retryable());
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(EmailError::ConnectionFailed("refused".into()).is_retryable());
        assert!(EmailError::Timeout("connect".into()).is_retryable());
        assert!(EmailError::ProtocolError("BYE".into()).is_retryable());
        assert!(EmailError::TlsError("handshake".into()).is_retryable());
    }
}
