//! Mailbox access and message decoding.
//!
//! [`MailSource`] is the seam the sync pass talks to; [`ImapClient`] is the
//! production implementation. [`decode_message`] turns fetched bytes into a
//! [`RawMessage`] for the classifier.

pub mod client;
pub mod decoder;
pub mod error;
pub mod source;

pub use client::ImapClient;
pub use decoder::{decode_message, DecodeError, RawMessage};
pub use error::EmailError;
pub use source::{MailSource, MessageId};
