//! Google API plumbing shared by the Gmail source and the Sheets store:
//! per-account OAuth2 tokens with refresh, and bounded request retries.
//!
//! Token files are plain JSON compatible with what google-auth writes
//! (`token`/`access_token` both accepted), one file per configured account
//! plus one for the spreadsheet writer.

pub mod gmail;
pub mod sheets;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// OAuth scopes the daemon needs.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// Token file account name used for spreadsheet access.
pub const SHEETS_ACCOUNT: &str = "sheets";

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token expired or revoked")]
    AuthExpired,
    #[error("token not found at {0}")]
    TokenNotFound(PathBuf),
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Retry
// ============================================================================

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 2_000,
        }
    }
}

fn status_is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn backoff_delay(
    attempt: u32,
    policy: &RetryPolicy,
    retry_after: Option<&reqwest::header::HeaderValue>,
) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        return Duration::from_secs(secs.min(30));
    }
    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let base = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    // Sub-second clock noise as jitter; good enough to de-synchronize retries.
    let jitter = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_millis() as u64)
        .unwrap_or(0)
        % 150;
    Duration::from_millis(base + jitter)
}

/// Send a request, retrying 429/timeout/5xx and transport-level connect or
/// timeout errors with exponential backoff. Non-retryable responses come
/// back as-is for the caller to interpret.
pub async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, GoogleApiError> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request.send().await.map_err(GoogleApiError::Http);
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if status_is_retryable(status) && attempt < attempts {
                    let delay = backoff_delay(
                        attempt,
                        policy,
                        response.headers().get(reqwest::header::RETRY_AFTER),
                    );
                    log::warn!(
                        "google retry {}/{} after status {} (sleep {:?})",
                        attempt,
                        attempts,
                        status,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                if (err.is_timeout() || err.is_connect()) && attempt < attempts {
                    let delay = backoff_delay(attempt, policy, None);
                    log::warn!(
                        "google retry {}/{} after transport error: {} (sleep {:?})",
                        attempt,
                        attempts,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(GoogleApiError::Http(err));
            }
        }
    }
    Err(GoogleApiError::RefreshFailed("request exhausted retries".to_string()))
}

// ============================================================================
// Tokens
// ============================================================================

/// OAuth2 token payload, field-compatible with google-auth's token JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// ISO 8601 expiry time.
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// Expired if within 60 seconds of expiry, or if expiry is absent or
/// unparseable (refresh will sort it out either way).
pub fn is_token_expired(token: &GoogleToken) -> bool {
    match &token.expiry {
        None => true,
        Some(expiry_str) => {
            match chrono::DateTime::parse_from_rfc3339(&expiry_str.replace('Z', "+00:00"))
                .or_else(|_| chrono::DateTime::parse_from_rfc3339(expiry_str))
            {
                Ok(expiry) => expiry <= chrono::Utc::now() + chrono::Duration::seconds(60),
                Err(_) => true,
            }
        }
    }
}

/// Per-account token files under `<state_dir>/tokens/`.
pub struct TokenStore {
    dir: PathBuf,
    /// Serializes refreshes so concurrent callers don't race the grant.
    refresh_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            dir: state_dir.join("tokens"),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn token_path(&self, account: &str) -> PathBuf {
        self.dir.join(format!("token_{}.json", account))
    }

    pub fn load(&self, account: &str) -> Result<GoogleToken, GoogleApiError> {
        let path = self.token_path(account);
        if !path.exists() {
            return Err(GoogleApiError::TokenNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, account: &str, token: &GoogleToken) -> Result<(), GoogleApiError> {
        std::fs::create_dir_all(&self.dir)?;
        let content = serde_json::to_string_pretty(token)?;
        std::fs::write(self.token_path(account), content)?;
        Ok(())
    }

    /// Get a valid access token for an account, refreshing if expired.
    pub async fn access_token(&self, account: &str) -> Result<String, GoogleApiError> {
        let token = self.load(account)?;
        if !is_token_expired(&token) {
            return Ok(token.token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited.
        let token = self.load(account)?;
        if !is_token_expired(&token) {
            return Ok(token.token);
        }

        let refreshed = refresh_access_token(&token).await?;
        self.save(account, &refreshed)?;
        Ok(refreshed.token)
    }
}

/// Exchange the refresh token for a new access token.
async fn refresh_access_token(token: &GoogleToken) -> Result<GoogleToken, GoogleApiError> {
    let refresh_token = token
        .refresh_token
        .as_ref()
        .ok_or(GoogleApiError::AuthExpired)?;

    let mut form = vec![
        ("client_id", token.client_id.as_str()),
        ("refresh_token", refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = token.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let client = reqwest::Client::new();
    let resp = client.post(&token.token_uri).form(&form).send().await?;
    let status = resp.status();
    let body_text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        let lowered = body_text.to_lowercase();
        if (status.as_u16() == 400 || status.as_u16() == 401)
            && (lowered.contains("invalid_grant") || lowered.contains("expired"))
        {
            return Err(GoogleApiError::AuthExpired);
        }
        return Err(GoogleApiError::RefreshFailed(format!(
            "HTTP {}: {}",
            status, body_text
        )));
    }

    let body: serde_json::Value = serde_json::from_str(&body_text)?;
    let access_token = body["access_token"]
        .as_str()
        .ok_or_else(|| GoogleApiError::RefreshFailed("no access_token in response".into()))?;
    let expires_in = body["expires_in"].as_u64().unwrap_or(3600);
    let expiry = chrono::Utc::now() + chrono::Duration::seconds(expires_in as i64);

    let mut refreshed = token.clone();
    refreshed.token = access_token.to_string();
    refreshed.expiry = Some(expiry.to_rfc3339());
    Ok(refreshed)
}
