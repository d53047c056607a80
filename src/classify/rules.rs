//! Deterministic keyword-tier classifier.
//!
//! Tiers are checked in fixed priority order: offer and interview signals
//! are stronger and rarer than the generic "application" language that shows
//! up in nearly every recruiting email, so they must win when both appear.

use async_trait::async_trait;

use super::{ApplicationStatus, ClassificationResult, Classifier, ClassifyError, DetectionMode};

/// Offer signals (tier 1, highest priority).
pub const OFFER_KEYWORDS: &[&str] = &[
    "offer",
    "we are pleased to",
    "congratulations",
];

/// Interview signals (tier 2).
pub const INTERVIEW_KEYWORDS: &[&str] = &[
    "interview",
    "scheduled",
    "calendar invite",
];

/// Rejection signals (tier 3).
pub const REJECTION_KEYWORDS: &[&str] = &[
    "unfortunately",
    "we regret",
    "not moving forward",
];

/// Application-received signals (tier 4, lowest priority).
pub const APPLIED_KEYWORDS: &[&str] = &[
    "applied",
    "application",
    "submission received",
];

/// Classify message text by the first matching keyword tier.
///
/// Matching is substring containment on lower-cased text. Returns `None`
/// when no tier matches (not job-related).
pub fn classify_text(text: &str) -> Option<ApplicationStatus> {
    let text = text.to_lowercase();
    let tiers: [(&[&str], ApplicationStatus); 4] = [
        (OFFER_KEYWORDS, ApplicationStatus::Offer),
        (INTERVIEW_KEYWORDS, ApplicationStatus::InterviewScheduled),
        (REJECTION_KEYWORDS, ApplicationStatus::Rejected),
        (APPLIED_KEYWORDS, ApplicationStatus::Applied),
    ];
    for (keywords, status) in tiers {
        if keywords.iter().any(|kw| text.contains(kw)) {
            return Some(status);
        }
    }
    None
}

/// Pure, deterministic classifier. No I/O, never fails.
pub struct RuleClassifier;

#[async_trait]
impl Classifier for RuleClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        Ok(ClassificationResult {
            status: classify_text(text),
            mode: DetectionMode::RuleBased,
        })
    }

    fn mode(&self) -> DetectionMode {
        DetectionMode::RuleBased
    }
}
