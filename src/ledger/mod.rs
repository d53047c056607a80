//! Ledger data model and sheet-row codec.
//!
//! The ledger lives in a tabular store as rows under a fixed header; this
//! module owns the typed view and the (lossy-tolerant) row conversion.

use serde::{Deserialize, Serialize};

use crate::classify::{ApplicationStatus, DetectionMode};
use crate::normalize;
use crate::source::RawMessage;

pub mod dashboard;
pub mod matcher;
pub mod reconcile;

/// Sheet holding application rows.
pub const LEDGER_SHEET: &str = "Applications";
/// Sheet holding the recomputed summary tables.
pub const DASHBOARD_SHEET: &str = "Dashboard";

/// Fixed column order of the ledger sheet.
pub const HEADER: [&str; 9] = [
    "Date",
    "Company",
    "Job Title",
    "Status",
    "Detection Mode",
    "Recruiter Email",
    "Email Link",
    "Account Email",
    "Last Updated",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One application record.
///
/// Identity is the fuzzy (company, job_title) pair, see [`matcher`]. The
/// first five-through-nine columns split into two groups: provenance fields
/// (`date`, `company`, `job_title`, `email_link`, `account_email`) are
/// first-seen authoritative and never overwritten; the rest track the latest
/// event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub date: String,
    pub company: String,
    pub job_title: String,
    pub status: ApplicationStatus,
    pub detection_mode: DetectionMode,
    pub recruiter_email: String,
    pub email_link: String,
    pub account_email: String,
    pub last_updated: String,
}

impl LedgerEntry {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.company.clone(),
            self.job_title.clone(),
            self.status.as_str().to_string(),
            self.detection_mode.as_str().to_string(),
            self.recruiter_email.clone(),
            self.email_link.clone(),
            self.account_email.clone(),
            self.last_updated.clone(),
        ]
    }

    /// Build an entry from a sheet row.
    ///
    /// Short rows are padded with empty cells. Unparseable status or
    /// detection-mode cells fall back to defaults with a warning rather than
    /// dropping the row: write-back is a full overwrite, so a dropped row
    /// would be destroyed.
    pub fn from_row(row: &[String]) -> Self {
        let cell = |i: usize| row.get(i).cloned().unwrap_or_default();

        let status_raw = cell(3);
        let status = ApplicationStatus::parse(&status_raw).unwrap_or_else(|| {
            if !status_raw.is_empty() {
                log::warn!("unknown ledger status {:?}, keeping row as Applied", status_raw);
            }
            ApplicationStatus::Applied
        });

        let mode_raw = cell(4);
        let detection_mode = DetectionMode::parse(&mode_raw).unwrap_or_else(|| {
            if !mode_raw.is_empty() {
                log::warn!("unknown detection mode {:?}, keeping row as Rule-based", mode_raw);
            }
            DetectionMode::RuleBased
        });

        Self {
            date: cell(0),
            company: cell(1),
            job_title: cell(2),
            status,
            detection_mode,
            recruiter_email: cell(5),
            email_link: cell(6),
            account_email: cell(7),
            last_updated: cell(8),
        }
    }
}

/// Parse raw sheet rows into ledger entries, skipping the header row and
/// fully empty rows.
pub fn parse_rows(rows: &[Vec<String>]) -> Vec<LedgerEntry> {
    rows.iter()
        .filter(|row| !row.iter().all(|c| c.trim().is_empty()))
        .filter(|row| row.first().map(String::as_str) != Some(HEADER[0]))
        .map(|row| LedgerEntry::from_row(row))
        .collect()
}

/// Serialize the full ledger back to sheet rows, header first.
pub fn to_rows(entries: &[LedgerEntry]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(entries.len() + 1);
    rows.push(HEADER.iter().map(|h| h.to_string()).collect());
    rows.extend(entries.iter().map(LedgerEntry::to_row));
    rows
}

/// A classified, job-related event ready for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub received_at: i64,
    pub company: String,
    pub job_title: String,
    pub status: ApplicationStatus,
    pub detection_mode: DetectionMode,
    pub recruiter_email: String,
    pub email_link: String,
    pub account_email: String,
}

impl ClassifiedEvent {
    /// Derive an event from a raw message and its classification.
    ///
    /// Company comes from the sender's domain, job title from the subject;
    /// those two drive identity matching downstream.
    pub fn from_message(
        msg: &RawMessage,
        status: ApplicationStatus,
        detection_mode: DetectionMode,
    ) -> Self {
        Self {
            received_at: msg.received_at,
            company: normalize::company_from_sender(&msg.sender),
            job_title: msg.subject.clone(),
            status,
            detection_mode,
            recruiter_email: normalize::extract_email_address(&msg.sender),
            email_link: msg.link.clone(),
            account_email: msg.account.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LedgerEntry {
        LedgerEntry {
            date: "2026-08-01".into(),
            company: "acme".into(),
            job_title: "Backend Engineer".into(),
            status: ApplicationStatus::Applied,
            detection_mode: DetectionMode::RuleBased,
            recruiter_email: "jobs@acme.com".into(),
            email_link: "https://mail.google.com/mail/u/0/#inbox/abc".into(),
            account_email: "me".into(),
            last_updated: "2026-08-01 09:00".into(),
        }
    }

    #[test]
    fn test_row_roundtrip() {
        let e = entry();
        let row = e.to_row();
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[3], "Applied");
        assert_eq!(row[4], "Rule-based");
        assert_eq!(LedgerEntry::from_row(&row), e);
    }

    #[test]
    fn test_from_row_pads_short_rows() {
        let row = vec!["2026-08-01".to_string(), "acme".to_string()];
        let e = LedgerEntry::from_row(&row);
        assert_eq!(e.company, "acme");
        assert_eq!(e.job_title, "");
        assert_eq!(e.status, ApplicationStatus::Applied);
    }

    #[test]
    fn test_from_row_preserves_row_on_bad_status() {
        let mut row = entry().to_row();
        row[3] = "Negotiating".to_string();
        let e = LedgerEntry::from_row(&row);
        assert_eq!(e.status, ApplicationStatus::Applied);
        assert_eq!(e.company, "acme");
    }

    #[test]
    fn test_parse_rows_skips_header_and_blank_rows() {
        let rows = vec![
            HEADER.iter().map(|h| h.to_string()).collect(),
            entry().to_row(),
            vec!["".to_string(), " ".to_string()],
        ];
        let entries = parse_rows(&rows);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], entry());
    }

    #[test]
    fn test_to_rows_emits_header_first() {
        let rows = to_rows(&[entry()]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Date");
        assert_eq!(rows[0][8], "Last Updated");
    }

    #[test]
    fn test_event_from_message() {
        let msg = RawMessage {
            id: "m1".into(),
            subject: "Backend Engineer".into(),
            body: "thanks for applying".into(),
            sender: "Acme Recruiting <jobs@acme.com>".into(),
            received_at: 1_756_000_000,
            account: "personal".into(),
            link: "https://mail.google.com/mail/u/0/#inbox/m1".into(),
        };
        let event = ClassifiedEvent::from_message(
            &msg,
            ApplicationStatus::Applied,
            DetectionMode::RuleBased,
        );
        assert_eq!(event.company, "acme");
        assert_eq!(event.job_title, "Backend Engineer");
        assert_eq!(event.recruiter_email, "jobs@acme.com");
        assert_eq!(event.account_email, "personal");
    }
}
