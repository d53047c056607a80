//! AI classifier backed by the OpenAI chat-completions API.
//!
//! The model is asked for a strict JSON object. Two failure modes, handled
//! differently on purpose:
//! - Service unreachable / non-2xx: propagated as [`ClassifyError`] so the
//!   message is excluded from the batch and re-seen on the next poll.
//! - Response arrives but does not parse (or names an unknown status):
//!   fail-safe negative classification, no retry. The watermark still
//!   advances past the message, which is what "confident negative" means.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ApplicationStatus, ClassificationResult, Classifier, ClassifyError, DetectionMode};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// The constrained verdict the model is instructed to return.
#[derive(Debug, Deserialize)]
struct AiVerdict {
    #[serde(default)]
    is_job_related: bool,
    #[serde(default)]
    status: Option<String>,
}

pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, api_key }
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "Analyze the following email and determine:\n\
         1. Is it related to a job application? (yes/no)\n\
         2. If yes, what is the status? (Applied, Interview Scheduled, Offer, Rejected)\n\n\
         Email text: {}\n\n\
         Respond with only a JSON object:\n\
         {{\"is_job_related\": true/false, \"status\": \"Applied/Interview Scheduled/Offer/Rejected\"}}",
        text
    )
}

/// Parse the model's verdict. Anything short of a well-formed, known-status,
/// job-related verdict is a negative classification.
fn parse_verdict(content: &str) -> Option<ApplicationStatus> {
    let verdict: AiVerdict = match serde_json::from_str(content.trim()) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("AI verdict is not valid JSON ({}), treating as not job-related", e);
            return None;
        }
    };
    if !verdict.is_job_related {
        return None;
    }
    match verdict.status.as_deref().and_then(ApplicationStatus::parse) {
        Some(status) => Some(status),
        None => {
            log::debug!(
                "AI verdict has unknown status {:?}, treating as not job-related",
                verdict.status
            );
            None
        }
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifyError> {
        let body = serde_json::json!({
            "model": MODEL,
            "messages": [{"role": "user", "content": build_prompt(text)}],
            "temperature": 0,
        });

        let resp = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");

        Ok(ClassificationResult {
            status: parse_verdict(content),
            mode: DetectionMode::AiBased,
        })
    }

    fn mode(&self) -> DetectionMode {
        DetectionMode::AiBased
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_verdict_valid() {
        assert_eq!(
            parse_verdict(r#"{"is_job_related": true, "status": "Interview Scheduled"}"#),
            Some(ApplicationStatus::InterviewScheduled)
        );
    }

    #[test]
    fn test_parse_verdict_not_job_related() {
        assert_eq!(
            parse_verdict(r#"{"is_job_related": false, "status": "Offer"}"#),
            None
        );
    }

    #[test]
    fn test_parse_verdict_non_json_is_negative() {
        assert_eq!(parse_verdict("Sure! Here is my analysis: it's a job email."), None);
        assert_eq!(parse_verdict(""), None);
    }

    #[test]
    fn test_parse_verdict_unknown_status_is_negative() {
        assert_eq!(
            parse_verdict(r#"{"is_job_related": true, "status": "Ghosted"}"#),
            None
        );
        assert_eq!(parse_verdict(r#"{"is_job_related": true}"#), None);
    }

    #[test]
    fn test_parse_verdict_tolerates_surrounding_whitespace() {
        assert_eq!(
            parse_verdict("\n  {\"is_job_related\": true, \"status\": \"Offer\"}  \n"),
            Some(ApplicationStatus::Offer)
        );
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"is_job_related\": true, \"status\": \"Applied\"}"}}
            ]
        }"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(parse_verdict(&resp.choices[0].message.content), Some(ApplicationStatus::Applied));
    }

    #[test]
    fn test_chat_response_empty_choices() {
        let resp: ChatResponse = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(resp.choices.is_empty());
    }

    #[test]
    fn test_prompt_names_all_statuses() {
        let prompt = build_prompt("hello");
        for status in ApplicationStatus::ALL {
            assert!(prompt.contains(status.as_str()));
        }
    }
}
