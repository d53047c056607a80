//! Batch reconciliation of classified events into the ledger.
//!
//! Operates on one in-memory snapshot; the caller owns the
//! snapshot-then-replace transaction boundary (read before, write back
//! after, conflict-check in between).

use chrono::{DateTime, TimeZone, Utc};

use super::{matcher, ClassifiedEvent, LedgerEntry, DATE_FORMAT, LAST_UPDATED_FORMAT};

/// Counts from one reconciliation batch, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub updated: usize,
    pub inserted: usize,
}

/// Apply one classified event to the ledger snapshot.
///
/// A matched row keeps its provenance fields (date, company, job title,
/// email link, account email) and takes the event's status, detection mode,
/// recruiter email, and a fresh last-updated stamp. An unmatched event
/// appends a full new row. Re-applying the identical event is a no-op on
/// every field except `last_updated`.
pub fn apply_event(
    ledger: &mut Vec<LedgerEntry>,
    event: &ClassifiedEvent,
    now: DateTime<Utc>,
) -> bool {
    let last_updated = now.format(LAST_UPDATED_FORMAT).to_string();

    match matcher::find_entry(ledger, &event.company, &event.job_title) {
        Some(index) => {
            let entry = &mut ledger[index];
            entry.status = event.status;
            entry.detection_mode = event.detection_mode;
            entry.recruiter_email = event.recruiter_email.clone();
            entry.last_updated = last_updated;
            true
        }
        None => {
            ledger.push(LedgerEntry {
                date: event_date(event.received_at),
                company: event.company.clone(),
                job_title: event.job_title.clone(),
                status: event.status,
                detection_mode: event.detection_mode,
                recruiter_email: event.recruiter_email.clone(),
                email_link: event.email_link.clone(),
                account_email: event.account_email.clone(),
                last_updated,
            });
            false
        }
    }
}

/// Apply a whole batch in receipt order against a single snapshot.
pub fn apply_events(
    ledger: &mut Vec<LedgerEntry>,
    events: &[ClassifiedEvent],
    now: DateTime<Utc>,
) -> ReconcileStats {
    let mut stats = ReconcileStats::default();
    for event in events {
        if apply_event(ledger, event, now) {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }
    stats
}

fn event_date(received_at: i64) -> String {
    match Utc.timestamp_opt(received_at, 0).single() {
        Some(ts) => ts.format(DATE_FORMAT).to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ApplicationStatus, DetectionMode};

    fn event(company: &str, title: &str, status: ApplicationStatus) -> ClassifiedEvent {
        ClassifiedEvent {
            received_at: 1_756_166_400, // 2025-08-26
            company: company.into(),
            job_title: title.into(),
            status,
            detection_mode: DetectionMode::RuleBased,
            recruiter_email: format!("jobs@{}.com", company),
            email_link: "https://mail.google.com/mail/u/0/#inbox/m1".into(),
            account_email: "personal".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 26, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_insert_into_empty_ledger() {
        let mut ledger = Vec::new();
        let stats = apply_events(
            &mut ledger,
            &[event("acme", "Backend Engineer", ApplicationStatus::Applied)],
            now(),
        );
        assert_eq!(stats, ReconcileStats { updated: 0, inserted: 1 });
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].company, "acme");
        assert_eq!(ledger[0].date, "2025-08-26");
        assert_eq!(ledger[0].last_updated, "2026-08-26 12:00");
    }

    #[test]
    fn test_idempotent_modulo_last_updated() {
        let mut ledger = Vec::new();
        let e = event("acme", "Backend Engineer", ApplicationStatus::Applied);
        apply_events(&mut ledger, std::slice::from_ref(&e), now());
        let first = ledger.clone();

        let later = Utc.with_ymd_and_hms(2026, 8, 26, 13, 30, 0).unwrap();
        let stats = apply_events(&mut ledger, &[e], later);

        assert_eq!(stats, ReconcileStats { updated: 1, inserted: 0 });
        assert_eq!(ledger.len(), 1);
        let mut replay = ledger[0].clone();
        assert_eq!(replay.last_updated, "2026-08-26 13:30");
        replay.last_updated = first[0].last_updated.clone();
        assert_eq!(replay, first[0]);
    }

    #[test]
    fn test_fuzzy_update_preserves_provenance() {
        let mut ledger = Vec::new();
        apply_events(
            &mut ledger,
            &[event("acme", "Backend Engineer", ApplicationStatus::Applied)],
            now(),
        );

        let mut follow_up = event(
            "acme",
            "Backend Engineer II",
            ApplicationStatus::InterviewScheduled,
        );
        follow_up.email_link = "https://mail.google.com/mail/u/0/#inbox/m2".into();
        follow_up.recruiter_email = "scheduler@acme.com".into();
        let stats = apply_events(&mut ledger, &[follow_up], now());

        assert_eq!(stats, ReconcileStats { updated: 1, inserted: 0 });
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].status, ApplicationStatus::InterviewScheduled);
        assert_eq!(ledger[0].recruiter_email, "scheduler@acme.com");
        // Provenance fields keep their first-seen values.
        assert_eq!(ledger[0].job_title, "Backend Engineer");
        assert_eq!(
            ledger[0].email_link,
            "https://mail.google.com/mail/u/0/#inbox/m1"
        );
    }

    #[test]
    fn test_different_company_inserts_new_row() {
        let mut ledger = Vec::new();
        apply_events(
            &mut ledger,
            &[
                event("acme", "Backend Engineer", ApplicationStatus::Applied),
                event("globex", "Backend Engineer", ApplicationStatus::Applied),
            ],
            now(),
        );
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_batch_applies_in_receipt_order() {
        let mut ledger = Vec::new();
        apply_events(
            &mut ledger,
            &[
                event("acme", "Backend Engineer", ApplicationStatus::Applied),
                event("acme", "Backend Engineer", ApplicationStatus::Rejected),
            ],
            now(),
        );
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].status, ApplicationStatus::Rejected);
    }
}
