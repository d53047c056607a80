//! Tabular ledger store contract.
//!
//! Read everything, replace everything, no incremental append. The
//! reconciler always submits the complete row set, so the store stays a dumb
//! sheet of strings. The Google Sheets implementation lives in
//! `google::sheets`.

use async_trait::async_trait;
use thiserror::Error;

use crate::google::GoogleApiError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheet API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error(transparent)]
    Auth(#[from] GoogleApiError),

    /// The ledger changed between this batch's snapshot and its write-back.
    /// The batch is rejected wholesale and retried against a fresh snapshot
    /// rather than merged field-by-field.
    #[error("ledger changed underneath the batch; snapshot is stale")]
    Conflict,
}

/// A persistent store of named sheets, each an ordered grid of cells.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read every row of a sheet, header included.
    async fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Replace the entire contents of a sheet.
    async fn replace_all(&self, sheet: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError>;
}
