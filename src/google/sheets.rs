//! Google Sheets implementation of the ledger store contract.
//!
//! `read_all` is a values.get over the whole sheet; `replace_all` is a
//! values.clear followed by a values.update, the full-overwrite semantics
//! the reconciler assumes. Authorizes via the dedicated "sheets" token file.

use async_trait::async_trait;
use serde::Deserialize;

use super::{send_with_retry, GoogleApiError, RetryPolicy, TokenStore, SHEETS_ACCOUNT};
use crate::store::{LedgerStore, StoreError};

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsStore {
    client: reqwest::Client,
    tokens: std::sync::Arc<TokenStore>,
    spreadsheet_id: String,
}

impl SheetsStore {
    pub fn new(tokens: std::sync::Arc<TokenStore>, spreadsheet_id: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
            spreadsheet_id,
        }
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.spreadsheet_id, suffix
        )
    }

    async fn check(&self, resp: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(StoreError::Auth(GoogleApiError::AuthExpired));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl LedgerStore for SheetsStore {
    async fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>, StoreError> {
        let access_token = self.tokens.access_token(SHEETS_ACCOUNT).await?;

        let resp = send_with_retry(
            self.client
                .get(self.values_url(sheet))
                .bearer_auth(&access_token),
            &RetryPolicy::default(),
        )
        .await?;
        let resp = self.check(resp).await?;

        let range: ValueRange = resp.json().await.map_err(GoogleApiError::Http)?;
        Ok(range.values)
    }

    async fn replace_all(&self, sheet: &str, rows: Vec<Vec<String>>) -> Result<(), StoreError> {
        let access_token = self.tokens.access_token(SHEETS_ACCOUNT).await?;

        let resp = send_with_retry(
            self.client
                .post(self.values_url(&format!("{}:clear", sheet)))
                .bearer_auth(&access_token)
                .json(&serde_json::json!({})),
            &RetryPolicy::default(),
        )
        .await?;
        self.check(resp).await?;

        let body = serde_json::json!({ "values": rows });
        let resp = send_with_retry(
            self.client
                .put(self.values_url(&format!("{}!A1", sheet)))
                .bearer_auth(&access_token)
                .query(&[("valueInputOption", "RAW")])
                .json(&body),
            &RetryPolicy::default(),
        )
        .await?;
        self.check(resp).await?;

        Ok(())
    }
}
