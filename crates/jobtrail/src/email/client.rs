//! IMAP client for connecting to email servers.

use std::net::ToSocketAddrs;
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::config::MailboxSettings;

use super::error::{EmailError, Result};
use super::source::{MailSource, MessageId};

/// Type alias for the underlying async stream (using async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// Builds the `SINCE` search key. IMAP compares dates at day granularity in
/// the server's timezone, so the caller's safety backoff absorbs the skew.
pub fn since_query(since: DateTime<Utc>) -> String {
    format!("SINCE {}", since.format("%d-%b-%Y"))
}

/// IMAP implementation of [`MailSource`] over an implicit-TLS session.
pub struct ImapClient {
    session: Option<Session<TlsStream>>,
    settings: MailboxSettings,
    timeout: Duration,
}

impl ImapClient {
    pub fn new(settings: MailboxSettings) -> Self {
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        Self {
            session: None,
            settings,
            timeout,
        }
    }

    /// Checks if the client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn session(&mut self) -> Result<&mut Session<TlsStream>> {
        self.session.as_mut().ok_or(EmailError::NotConnected)
    }

    /// Gets the password from configured sources (direct value, file, or env var).
    fn password(&self) -> Result<SecretString> {
        if self.settings.password.is_some() {
            warn!(
                "Using a direct password value in the config file is not recommended. \
                 Consider password_env_var or password_file instead."
            );
        }
        crate::secrets::resolve_secret(
            self.settings.password.as_deref(),
            self.settings.password_file.as_deref(),
            self.settings.password_env_var.as_deref(),
        )
        .map_err(|e| EmailError::CredentialsNotFound(e.to_string()))
    }

    fn open_tcp(&self) -> Result<AsyncTcpStream> {
        let addr = format!("{}:{}", self.settings.server, self.settings.port);
        let resolved = addr
            .to_socket_addrs()
            .map_err(|e| EmailError::ConnectionFailed(format!("{}: {}", addr, e)))?
            .next()
            .ok_or_else(|| EmailError::ConnectionFailed(format!("{}: no address", addr)))?;

        let std_stream = std::net::TcpStream::connect_timeout(&resolved, self.timeout)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| EmailError::ConnectionFailed(e.to_string()))?;
        async_io::Async::new(std_stream).map_err(|e| EmailError::ConnectionFailed(e.to_string()))
    }
}

async fn handshake(
    tcp_stream: AsyncTcpStream,
    server: String,
    username: String,
    password: SecretString,
) -> Result<Session<TlsStream>> {
    let tls_stream = TlsConnector::new().connect(&server, tcp_stream).await?;
    let client = async_imap::Client::new(tls_stream);

    client
        .login(&username, password.expose_secret())
        .await
        .map_err(|(e, _)| EmailError::AuthenticationFailed(e.to_string()))
}

#[async_trait]
impl MailSource for ImapClient {
    async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        if !self.settings.use_tls {
            return Err(EmailError::ConfigError(
                "TLS is required for secure email connections".to_string(),
            ));
        }

        info!(
            "Connecting to IMAP server at {}:{}",
            self.settings.server, self.settings.port
        );

        let password = self.password()?;
        let tcp_stream = self.open_tcp()?;
        let login = handshake(
            tcp_stream,
            self.settings.server.clone(),
            self.settings.username.clone(),
            password,
        );
        let mut session = tokio::time::timeout(self.timeout, login).await??;

        let inbox = self.settings.inbox.clone();
        tokio::time::timeout(self.timeout, session.select(&inbox))
            .await?
            .map_err(|e| {
                if e.to_string().contains("NO") {
                    EmailError::FolderNotFound(inbox.clone())
                } else {
                    EmailError::ProtocolError(e.to_string())
                }
            })?;

        info!("Authenticated and selected '{}'", inbox);
        self.session = Some(session);
        Ok(())
    }

    async fn list_since(&mut self, since: DateTime<Utc>) -> Result<Vec<MessageId>> {
        let timeout = self.timeout;
        let query = since_query(since);
        debug!("Searching with query: {}", query);

        let session = self.session()?;
        let uids = tokio::time::timeout(timeout, session.uid_search(&query))
            .await?
            .map_err(|e| EmailError::ProtocolError(e.to_string()))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Found {} messages {}", uid_list.len(), query);
        Ok(uid_list)
    }

    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        let session = self.session()?;
        debug!("Fetching email with UID {}", id);

        let fetch = async {
            let messages = session
                .uid_fetch(id.to_string(), "BODY.PEEK[]")
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
            futures_util::pin_mut!(messages);

            let mut body = None;
            while let Some(message) = messages.next().await {
                let message = message.map_err(|e| EmailError::ProtocolError(e.to_string()))?;
                if body.is_none() {
                    body = message.body().map(|b| b.to_vec());
                }
            }
            body.ok_or(EmailError::MessageNotFound(id))
        };

        tokio::time::timeout(timeout, fetch).await?
    }

    async fn mark_for_deletion(&mut self, id: MessageId) -> Result<()> {
        let timeout = self.timeout;
        let session = self.session()?;

        let store = async {
            let updates = session
                .uid_store(id.to_string(), "+FLAGS (\\Deleted)")
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
            updates
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
            Ok(())
        };

        tokio::time::timeout(timeout, store).await?
    }

    async fn expunge(&mut self) -> Result<()> {
        let timeout = self.timeout;
        let session = self.session()?;

        let expunge = async {
            let removed = session
                .expunge()
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
            let removed = removed
                .try_collect::<Vec<_>>()
                .await
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
            debug!("Expunged {} messages", removed.len());
            Ok(())
        };

        tokio::time::timeout(timeout, expunge).await?
    }

    async fn logout(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            tokio::time::timeout(self.timeout, session.logout())
                .await?
                .map_err(|e| EmailError::ProtocolError(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for ImapClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapClient dropped without explicit logout - session will be closed");
        }
    }
}
