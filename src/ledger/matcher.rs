//! Fuzzy identity matching for ledger rows.
//!
//! Company equality is exact (case-insensitive); the company name comes from
//! the sender's domain and is unambiguous. Job titles are matched by a
//! partial-string-overlap ratio so "Software Engineer II — Backend" and
//! "Software Engineer II (Backend Team)" reconcile into one row instead of
//! fragmenting the ledger per email-wording variant. No match is ever
//! attempted across company boundaries.

use super::LedgerEntry;

/// Minimum title similarity (0–100) to treat two rows as the same
/// application. Empirically chosen default, tunable.
pub const TITLE_MATCH_THRESHOLD: u32 = 85;

/// Find the first ledger row with the same company and a title similarity at
/// or above [`TITLE_MATCH_THRESHOLD`].
///
/// First-above-threshold is sufficient: duplicate postings under one company
/// are rare enough that best-of-N disambiguation buys nothing.
pub fn find_entry(ledger: &[LedgerEntry], company: &str, job_title: &str) -> Option<usize> {
    ledger.iter().position(|entry| {
        entry.company.eq_ignore_ascii_case(company)
            && title_similarity(&entry.job_title, job_title) >= TITLE_MATCH_THRESHOLD
    })
}

/// Partial-string-overlap ratio on a 0–100 scale.
///
/// The shorter title is slid over every equal-length window of the longer
/// one; the best windowed Levenshtein similarity wins. A title that is a
/// clean substring of a longer variant therefore scores 100.
pub fn title_similarity(a: &str, b: &str) -> u32 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    if shorter.is_empty() {
        return if longer.is_empty() { 100 } else { 0 };
    }

    let longer_chars: Vec<char> = longer.chars().collect();
    let window = shorter.chars().count();

    let mut best: f64 = 0.0;
    for start in 0..=(longer_chars.len() - window) {
        let slice: String = longer_chars[start..start + window].iter().collect();
        let score = strsim::normalized_levenshtein(&shorter, &slice);
        if score > best {
            best = score;
        }
        if best >= 1.0 {
            break;
        }
    }

    (best * 100.0).round() as u32
}
