//! Message source contract.
//!
//! Anything that can list message ids newer than a watermark and materialize
//! a message fulfills this; the Gmail implementation lives in
//! `google::gmail`, tests use in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::google::GoogleApiError;

/// A raw inbound message. Transient; never persisted by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: String,
    pub subject: String,
    /// Plain text; HTML bodies are converted before this leaves the source.
    pub body: String,
    /// Raw "From" header value.
    pub sender: String,
    /// Epoch seconds.
    pub received_at: i64,
    /// The configured account this message came from.
    pub account: String,
    /// Provider deep link to the message, stored in the ledger.
    pub link: String,
}

/// Retrieval failures are transient by definition: the affected account is
/// skipped for the cycle and retried on the next poll.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mail API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Auth(#[from] GoogleApiError),

    #[error("message {0} not found")]
    NotFound(String),
}

/// Yields messages newer than a given watermark. Pagination is the
/// implementation's problem; callers only ever see finite, materialized
/// sequences.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// List ids of messages in `account` with receipt time strictly after
    /// `since` (epoch seconds).
    async fn list_new(&self, account: &str, since: i64) -> Result<Vec<String>, SourceError>;

    /// Fetch one message with header and body text extracted.
    async fn fetch(&self, account: &str, message_id: &str) -> Result<RawMessage, SourceError>;
}
