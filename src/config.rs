//! Environment-variable configuration, read once at startup.
//!
//! Missing required values abort startup: a half-configured daemon that
//! silently skips accounts or classifies nothing is worse than no daemon.

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::classify::ClassifierMode;

/// Default polling cadence (15 minutes).
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 900;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JOBLEDGER_ACCOUNTS is required (comma-separated account names)")]
    MissingAccounts,

    #[error("JOBLEDGER_SHEET_ID is required")]
    MissingSheetId,

    #[error("OPENAI_API_KEY is required when JOBLEDGER_CLASSIFIER=ai")]
    MissingOpenAiKey,

    #[error("unknown classifier mode {0:?} (expected \"rules\" or \"ai\")")]
    UnknownClassifierMode(String),

    #[error("JOBLEDGER_START_DATE {0:?} is not a YYYY-MM-DD date")]
    BadStartDate(String),

    #[error("JOBLEDGER_START_DATE is required on first run (no persisted watermark for account {0:?})")]
    MissingStartDate(String),

    #[error("cannot resolve home directory for state files")]
    NoHomeDir,
}

/// Runtime configuration for the polling daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inbox account names; each maps to a token file under `state_dir/tokens/`.
    pub accounts: Vec<String>,
    /// Spreadsheet holding the Applications and Dashboard sheets.
    pub sheet_id: String,
    pub classifier_mode: ClassifierMode,
    /// Set when classifier_mode is Ai.
    pub openai_api_key: Option<String>,
    pub poll_interval_secs: u64,
    /// Epoch-seconds floor for accounts with no persisted watermark.
    pub start_timestamp: Option<i64>,
    /// Directory for tokens and the watermark file.
    pub state_dir: PathBuf,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let accounts: Vec<String> = std::env::var("JOBLEDGER_ACCOUNTS")
            .unwrap_or_default()
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if accounts.is_empty() {
            return Err(ConfigError::MissingAccounts);
        }

        let sheet_id =
            std::env::var("JOBLEDGER_SHEET_ID").map_err(|_| ConfigError::MissingSheetId)?;

        let classifier_mode = match std::env::var("JOBLEDGER_CLASSIFIER").ok().as_deref() {
            None | Some("") | Some("rules") => ClassifierMode::Rules,
            Some("ai") => ClassifierMode::Ai,
            Some(other) => return Err(ConfigError::UnknownClassifierMode(other.to_string())),
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty());
        if classifier_mode == ClassifierMode::Ai && openai_api_key.is_none() {
            return Err(ConfigError::MissingOpenAiKey);
        }

        let poll_interval_secs = std::env::var("JOBLEDGER_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let start_timestamp = match std::env::var("JOBLEDGER_START_DATE") {
            Ok(raw) if !raw.is_empty() => Some(parse_start_date(&raw)?),
            _ => None,
        };

        let state_dir = match std::env::var("JOBLEDGER_STATE_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or(ConfigError::NoHomeDir)?
                .join(".jobledger"),
        };

        Ok(Self {
            accounts,
            sheet_id,
            classifier_mode,
            openai_api_key,
            poll_interval_secs,
            start_timestamp,
            state_dir,
        })
    }
}

/// Parse a `YYYY-MM-DD` start date into epoch seconds at UTC midnight.
fn parse_start_date(raw: &str) -> Result<i64, ConfigError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ConfigError::BadStartDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ConfigError::BadStartDate(raw.to_string()))?;
    Ok(midnight.and_utc().timestamp())
}
