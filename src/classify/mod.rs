//! Classification contract: one uniform `classify` seam with two
//! implementations behind it, selected once per run from configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod openai;
pub mod rules;

/// Lifecycle status of a job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    InterviewScheduled,
    Offer,
    Rejected,
}

impl ApplicationStatus {
    /// All statuses in dashboard display order.
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    /// The string stored in the ledger sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    /// Parse a sheet/API string, case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(trimmed))
    }
}

/// Which classifier produced a result, retained for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionMode {
    RuleBased,
    AiBased,
}

impl DetectionMode {
    pub const ALL: [DetectionMode; 2] = [DetectionMode::RuleBased, DetectionMode::AiBased];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMode::RuleBased => "Rule-based",
            DetectionMode::AiBased => "AI-based",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
    }
}

/// Outcome of classifying one message.
///
/// `status == None` means the message is not job-related; there is no
/// separate boolean to keep in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub status: Option<ApplicationStatus>,
    pub mode: DetectionMode,
}

impl ClassificationResult {
    pub fn is_job_related(&self) -> bool {
        self.status.is_some()
    }
}

/// Errors from the classification step.
///
/// Only service-level failures live here. A response the service returned
/// but we cannot parse is NOT an error: it degrades to a negative
/// classification so one garbled reply cannot wedge the pipeline.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API error {status}: {message}")]
    Api { status: u16, message: String },
}

/// Uniform classifier contract. Rule-based is pure and AI suspends on
/// network I/O, so the trait is async for both.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify normalized (lower-cased subject+body) message text.
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError>;

    fn mode(&self) -> DetectionMode;
}

/// Classifier selection, decided once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    Rules,
    Ai,
}

/// Build the configured classifier.
///
/// `openai_api_key` must be present for [`ClassifierMode::Ai`]; config
/// validation guarantees this before we get here.
pub fn build_classifier(
    mode: ClassifierMode,
    openai_api_key: Option<String>,
) -> Box<dyn Classifier> {
    match mode {
        ClassifierMode::Rules => Box::new(rules::RuleClassifier),
        ClassifierMode::Ai => Box::new(openai::OpenAiClassifier::new(
            openai_api_key.unwrap_or_default(),
        )),
    }
}
