//! Shared mutable state of one campaign run: the queue and the counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::recipient::Recipient;

use super::queue::WorkQueue;
use super::types::{CampaignPhase, CampaignProgress, CampaignSummary};

#[derive(Debug, Default)]
struct Counters {
    completed: usize,
    failed: usize,
    in_progress: usize,
    skipped: usize,
    persistence_failures: usize,
}

/// Queue plus counters. Lock order is always counters, then queue, so a
/// snapshot never sees a recipient that is neither queued nor counted.
/// Neither lock is held across an await point.
pub(crate) struct CampaignState {
    total: usize,
    queue: WorkQueue,
    counters: Mutex<Counters>,
    cancel_requested: AtomicBool,
    cancel_tx: watch::Sender<bool>,
    finished: AtomicBool,
}

impl CampaignState {
    pub(crate) fn new(recipients: Vec<Recipient>) -> Self {
        let total = recipients.len();
        let (cancel_tx, _) = watch::channel(false);
        Self {
            total,
            queue: recipients.into_iter().collect(),
            counters: Mutex::new(Counters::default()),
            cancel_requested: AtomicBool::new(false),
            cancel_tx,
            finished: AtomicBool::new(false),
        }
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the next recipient and mark it in progress in one step.
    pub(crate) fn claim(&self) -> Option<Recipient> {
        let mut counters = self.counters();
        let recipient = self.queue.try_dequeue()?;
        counters.in_progress += 1;
        Some(recipient)
    }

    /// Move one in-progress recipient to its final counter.
    pub(crate) fn finish(&self, succeeded: bool, skipped: bool, persisted: bool) {
        let mut counters = self.counters();
        counters.in_progress = counters.in_progress.saturating_sub(1);
        if succeeded {
            counters.completed += 1;
        } else {
            counters.failed += 1;
        }
        if skipped {
            counters.skipped += 1;
        }
        if !persisted {
            counters.persistence_failures += 1;
        }
    }

    /// Returns `true` the first time it is called. The flag never resets.
    pub(crate) fn request_cancel(&self) -> bool {
        let first = !self.cancel_requested.swap(true, Ordering::SeqCst);
        if first {
            self.cancel_tx.send_replace(true);
        }
        first
    }

    pub(crate) fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribe_cancel(&self) -> watch::Receiver<bool> {
        self.cancel_tx.subscribe()
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> CampaignProgress {
        let counters = self.counters();
        let remaining = self.queue.size();
        let cancel_requested = self.is_cancel_requested();

        let phase = if self.is_finished() {
            CampaignPhase::Completed
        } else if cancel_requested {
            CampaignPhase::Cancelling
        } else if remaining == 0 && counters.in_progress > 0 {
            CampaignPhase::Draining
        } else {
            CampaignPhase::Running
        };

        CampaignProgress {
            total: self.total,
            completed: counters.completed,
            failed: counters.failed,
            in_progress: counters.in_progress,
            remaining,
            skipped: counters.skipped,
            persistence_failures: counters.persistence_failures,
            cancel_requested,
            phase,
        }
    }

    pub(crate) fn summary(
        &self,
        campaign_id: Uuid,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> CampaignSummary {
        let progress = self.snapshot();
        CampaignSummary {
            campaign_id,
            total: progress.total,
            completed: progress.completed,
            failed: progress.failed,
            skipped: progress.skipped,
            cancelled: progress.cancel_requested,
            persistence_failures: progress.persistence_failures,
            started_at,
            finished_at,
        }
    }
}
