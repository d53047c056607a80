//! Dashboard summary: derived counts, recomputed in full every cycle.
//!
//! Never updated incrementally; recompute-and-overwrite cannot drift.

use super::LedgerEntry;
use crate::classify::{ApplicationStatus, DetectionMode};

/// Build the dashboard sheet rows: a status count table and a detection-mode
/// count table, stacked with one blank row between them.
pub fn summary_rows(ledger: &[LedgerEntry]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();

    rows.push(vec!["Status".to_string(), "Count".to_string()]);
    for status in ApplicationStatus::ALL {
        let count = ledger.iter().filter(|e| e.status == status).count();
        rows.push(vec![status.as_str().to_string(), count.to_string()]);
    }

    rows.push(vec![String::new()]);

    rows.push(vec!["Detection Mode".to_string(), "Count".to_string()]);
    for mode in DetectionMode::ALL {
        let count = ledger.iter().filter(|e| e.detection_mode == mode).count();
        rows.push(vec![mode.as_str().to_string(), count.to_string()]);
    }

    rows
}
