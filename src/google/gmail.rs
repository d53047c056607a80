//! Gmail implementation of the message source contract.
//!
//! Lists candidate messages with a subject query, pages through
//! `nextPageToken` transparently, filters on `internalDate` against the
//! caller's watermark, and extracts subject/sender/body from a full fetch.

use async_trait::async_trait;
use serde::Deserialize;

use super::{send_with_retry, GoogleApiError, RetryPolicy, TokenStore};
use crate::normalize;
use crate::source::{MessageSource, RawMessage, SourceError};

/// Subject pre-filter; the classifier makes the real call, this just keeps
/// list sizes sane.
const SEARCH_QUERY: &str =
    "subject:application OR subject:interview OR subject:offer OR subject:thank OR subject:hiring";

const PAGE_SIZE: u32 = 100;

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageListResponse {
    #[serde(default)]
    messages: Vec<MessageStub>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageMinimal {
    #[serde(default)]
    id: String,
    /// Epoch milliseconds as a string.
    #[serde(default)]
    internal_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageFull {
    #[serde(default)]
    id: String,
    #[serde(default)]
    internal_date: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PayloadBody>,
    #[serde(default)]
    parts: Vec<Payload>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayloadBody {
    #[serde(default)]
    data: Option<String>,
}

// ============================================================================
// Source
// ============================================================================

pub struct GmailSource {
    client: reqwest::Client,
    tokens: std::sync::Arc<TokenStore>,
}

impl GmailSource {
    pub fn new(tokens: std::sync::Arc<TokenStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokens,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        access_token: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let resp = send_with_retry(
            self.client.get(url).bearer_auth(access_token).query(query),
            &RetryPolicy::default(),
        )
        .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SourceError::Auth(GoogleApiError::AuthExpired));
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await.map_err(GoogleApiError::Http)?)
    }
}

#[async_trait]
impl MessageSource for GmailSource {
    async fn list_new(&self, account: &str, since: i64) -> Result<Vec<String>, SourceError> {
        let access_token = self.tokens.access_token(account).await?;

        let mut stubs: Vec<MessageStub> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("q", SEARCH_QUERY.to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let list: MessageListResponse = self
                .get_json(
                    &access_token,
                    "https://gmail.googleapis.com/gmail/v1/users/me/messages",
                    &query,
                )
                .await?;

            stubs.extend(list.messages);
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        // internalDate is not filterable in the list query at second
        // precision, so check each candidate against the watermark.
        let mut ids = Vec::new();
        for stub in stubs {
            let url = format!(
                "https://gmail.googleapis.com/gmail/v1/users/me/messages/{}",
                stub.id
            );
            let minimal: MessageMinimal = self
                .get_json(&access_token, &url, &[("format", "minimal".to_string())])
                .await?;
            if internal_date_secs(&minimal.internal_date) > since {
                ids.push(minimal.id);
            }
        }
        Ok(ids)
    }

    async fn fetch(&self, account: &str, message_id: &str) -> Result<RawMessage, SourceError> {
        let access_token = self.tokens.access_token(account).await?;
        let url = format!(
            "https://gmail.googleapis.com/gmail/v1/users/me/messages/{}",
            message_id
        );
        let full: MessageFull = self
            .get_json(&access_token, &url, &[("format", "full".to_string())])
            .await?;

        let payload = full.payload.as_ref();
        let header = |name: &str| -> String {
            payload
                .map(|p| &p.headers[..])
                .unwrap_or(&[])
                .iter()
                .find(|h| h.name.eq_ignore_ascii_case(name))
                .map(|h| h.value.clone())
                .unwrap_or_default()
        };

        let body = payload.and_then(extract_body_text).unwrap_or_default();

        Ok(RawMessage {
            id: full.id.clone(),
            subject: header("Subject"),
            body,
            sender: header("From"),
            received_at: internal_date_secs(&full.internal_date),
            account: account.to_string(),
            link: message_link(&full.id),
        })
    }
}

/// Gmail deep link stored in the ledger's Email Link column.
pub fn message_link(message_id: &str) -> String {
    format!("https://mail.google.com/mail/u/0/#inbox/{}", message_id)
}

fn internal_date_secs(internal_date_ms: &str) -> i64 {
    internal_date_ms.parse::<i64>().unwrap_or(0) / 1000
}

/// Walk MIME parts for a text body: `text/plain` preferred, `text/html`
/// converted to plain text as a fallback.
fn extract_body_text(payload: &Payload) -> Option<String> {
    if let Some(text) = find_part(payload, "text/plain") {
        return Some(text);
    }
    find_part(payload, "text/html").map(|html| normalize::html_to_text(&html))
}

fn find_part(payload: &Payload, target_mime: &str) -> Option<String> {
    if payload.mime_type == target_mime {
        if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
            if let Some(text) = decode_url_safe_base64(data) {
                return Some(text);
            }
        }
    }
    payload
        .parts
        .iter()
        .find_map(|part| find_part(part, target_mime))
}

/// Decode URL-safe base64 (no padding) as used by the Gmail API.
fn decode_url_safe_base64(data: &str) -> Option<String> {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
