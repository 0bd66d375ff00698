//! The mail source seam between the sync pass and a concrete mailbox.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::Result;

/// Identifier of a message within the selected mailbox (an IMAP UID).
pub type MessageId = u32;

/// A remote mailbox the sync pass can read from and prune.
///
/// Implementations own their session state; `connect` must be called before
/// any other method and `logout` releases the session. Auth failures surface
/// as [`EmailError::AuthenticationFailed`](super::EmailError::AuthenticationFailed)
/// so callers can skip backoff for them.
#[async_trait]
pub trait MailSource: Send {
    async fn connect(&mut self) -> Result<()>;

    /// Identifiers of messages delivered on or after `since`.
    async fn list_since(&mut self, since: DateTime<Utc>) -> Result<Vec<MessageId>>;

    /// Raw RFC 5322 bytes of one message, without marking it read.
    async fn fetch(&mut self, id: MessageId) -> Result<Vec<u8>>;

    async fn mark_for_deletion(&mut self, id: MessageId) -> Result<()>;

    async fn expunge(&mut self) -> Result<()>;

    async fn logout(&mut self) -> Result<()>;
}
