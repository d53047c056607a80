//! The reconciliation batch: retrieve → classify → match → merge → persist,
//! and the polling loop that drives one batch per cycle.
//!
//! Failure scoping (each failure short-circuits only its own scope):
//! - account retrieval fails → that account skipped this cycle, watermark
//!   untouched, other accounts proceed;
//! - one message's fetch or classification fails → that message excluded
//!   from the batch and from the watermark advance, retried next poll;
//! - ledger snapshot goes stale before write-back → the whole batch is
//!   rejected and retried against a fresh snapshot;
//! - any cycle error is logged and the loop continues.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::classify::Classifier;
use crate::config::{Config, ConfigError};
use crate::ledger::{self, dashboard, reconcile, reconcile::ReconcileStats, ClassifiedEvent};
use crate::normalize;
use crate::source::MessageSource;
use crate::store::{LedgerStore, StoreError};
use crate::watermark::{WatermarkError, WatermarkStore};

/// Why a whole cycle was abandoned. Per-account and per-message failures are
/// absorbed inside the cycle and only logged.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Watermark(#[from] WatermarkError),
}

#[derive(Debug, Default)]
pub struct CycleReport {
    /// Messages classified (positively or negatively).
    pub classified: usize,
    /// Job-related events handed to the reconciler.
    pub events: usize,
    pub stats: ReconcileStats,
    pub skipped_accounts: usize,
    pub skipped_messages: usize,
}

pub struct Poller {
    config: Config,
    source: Arc<dyn MessageSource>,
    store: Arc<dyn LedgerStore>,
    classifier: Arc<dyn Classifier>,
    watermarks: WatermarkStore,
}

impl Poller {
    pub fn new(
        config: Config,
        source: Arc<dyn MessageSource>,
        store: Arc<dyn LedgerStore>,
        classifier: Arc<dyn Classifier>,
        watermarks: WatermarkStore,
    ) -> Self {
        Self {
            config,
            source,
            store,
            classifier,
            watermarks,
        }
    }

    /// Poll forever. Cycle errors never terminate the process.
    pub async fn run(mut self) {
        let interval = Duration::from_secs(self.config.poll_interval_secs);
        loop {
            match self.run_cycle().await {
                Ok(report) => log::info!(
                    "cycle done: {} classified, {} events ({} updated, {} inserted), {} account(s) skipped, {} message(s) deferred",
                    report.classified,
                    report.events,
                    report.stats.updated,
                    report.stats.inserted,
                    report.skipped_accounts,
                    report.skipped_messages
                ),
                Err(e) => log::warn!("cycle abandoned, ledger untouched: {}", e),
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One full reconciliation batch across all configured accounts.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        let mut report = CycleReport::default();
        let mut events: Vec<ClassifiedEvent> = Vec::new();
        // Per-account max receipt time of messages this batch consumed.
        let mut pending_marks: HashMap<String, i64> = HashMap::new();

        let accounts = self.config.accounts.clone();
        for account in &accounts {
            let since = self.watermarks.resolve(account, self.config.start_timestamp)?;

            let ids = match self.source.list_new(account, since).await {
                Ok(ids) => ids,
                Err(e) => {
                    log::warn!("account {}: retrieval failed, skipping this cycle: {}", account, e);
                    report.skipped_accounts += 1;
                    continue;
                }
            };
            if !ids.is_empty() {
                log::info!("account {}: {} new message(s)", account, ids.len());
            }

            for id in ids {
                let msg = match self.source.fetch(account, &id).await {
                    Ok(m) => m,
                    Err(e) => {
                        log::warn!("message {}: fetch failed, retrying next poll: {}", id, e);
                        report.skipped_messages += 1;
                        continue;
                    }
                };

                let text = normalize::normalized_text(&msg.subject, &msg.body);
                let result = match self.classifier.classify(&text).await {
                    Ok(r) => r,
                    Err(e) => {
                        // Service failure, not a verdict: the message stays
                        // below the watermark and is re-seen next poll.
                        log::warn!("message {}: classification failed, retrying next poll: {}", id, e);
                        report.skipped_messages += 1;
                        continue;
                    }
                };

                // A verdict, positive or confident-negative, consumes the
                // message: its timestamp joins the watermark advance.
                let mark = pending_marks.entry(account.clone()).or_insert(since);
                *mark = (*mark).max(msg.received_at);
                report.classified += 1;

                if let Some(status) = result.status {
                    events.push(ClassifiedEvent::from_message(&msg, status, result.mode));
                } else {
                    log::debug!("message {}: not job-related", id);
                }
            }
        }

        report.events = events.len();

        if !events.is_empty() {
            report.stats = self.reconcile_with_retry(&events).await?;
        }

        // Reconciliation and write-back succeeded (or there was nothing to
        // write); only now may watermarks move.
        for (account, mark) in pending_marks {
            self.watermarks.advance(&account, mark);
        }
        self.watermarks.persist()?;

        Ok(report)
    }

    /// Snapshot → apply → verify → write-back, with one immediate retry
    /// against a fresh snapshot if a concurrent writer is detected.
    async fn reconcile_with_retry(
        &self,
        events: &[ClassifiedEvent],
    ) -> Result<ReconcileStats, CycleError> {
        for attempt in 1..=2 {
            match self.try_reconcile(events).await {
                Err(CycleError::Store(StoreError::Conflict)) if attempt == 1 => {
                    log::warn!("ledger changed during the batch; retrying against a fresh snapshot");
                }
                other => return other,
            }
        }
        Err(StoreError::Conflict.into())
    }

    async fn try_reconcile(&self, events: &[ClassifiedEvent]) -> Result<ReconcileStats, CycleError> {
        let snapshot = self.store.read_all(ledger::LEDGER_SHEET).await?;
        let mut entries = ledger::parse_rows(&snapshot);
        let stats = reconcile::apply_events(&mut entries, events, Utc::now());

        // A concurrent edit between snapshot and write-back must not be
        // silently clobbered by our full overwrite: reject the batch instead.
        let current = self.store.read_all(ledger::LEDGER_SHEET).await?;
        if current != snapshot {
            return Err(StoreError::Conflict.into());
        }

        self.store
            .replace_all(ledger::LEDGER_SHEET, ledger::to_rows(&entries))
            .await?;
        self.store
            .replace_all(ledger::DASHBOARD_SHEET, dashboard::summary_rows(&entries))
            .await?;
        Ok(stats)
    }
}
