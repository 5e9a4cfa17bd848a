//! Types for campaign dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::outcome::OutcomeRecord;
use crate::recipient::Recipient;
use crate::telephony::CallStatus;

use super::error::CallError;

/// Caller identity used for every call of a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerId {
    /// Caller id in E.164 form.
    pub from_number: String,
    /// Country calling code for bare national recipients.
    pub country_code: String,
}

/// Lifecycle of a started campaign run. A handle exists only once
/// `CampaignController::start` has accepted the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignPhase {
    /// Workers are pulling from a non-empty queue.
    Running,
    /// Queue is empty; the last in-flight calls are finishing.
    Draining,
    /// Cancel requested; undialed recipients are being skipped.
    Cancelling,
    /// All workers have exited. Counters are final.
    Completed,
}

/// Point-in-time snapshot of campaign counters.
///
/// `completed + failed + in_progress + remaining == total` holds for every
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    /// Recipients still waiting in the queue.
    pub remaining: usize,
    /// Recipients skipped because of a cancel (included in `failed`).
    pub skipped: usize,
    /// Outcomes that could not be written to the logs.
    pub persistence_failures: usize,
    pub cancel_requested: bool,
    pub phase: CampaignPhase,
}

impl CampaignProgress {
    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed() as f64 * 100.0 / self.total as f64
    }

    pub fn is_consistent(&self) -> bool {
        self.completed + self.failed + self.in_progress + self.remaining == self.total
    }
}

/// Final report of a finished campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: Uuid,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub persistence_failures: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CampaignSummary {
    /// Results were lost if any outcome failed to persist.
    pub fn is_degraded(&self) -> bool {
        self.persistence_failures > 0
    }
}

/// How a recipient's attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Delivered,
    Failed,
    /// Cancel was requested before dialing.
    Skipped,
}

/// Transient per-recipient record, discarded once written to the outcome log.
#[derive(Debug, Clone)]
pub struct CallAttempt {
    pub recipient: Recipient,
    pub call_id: Option<String>,
    pub status: CallStatus,
    pub outcome: Option<AttemptOutcome>,
    pub error: Option<CallError>,
    placed_at: Option<Instant>,
}

impl CallAttempt {
    pub fn new(recipient: Recipient) -> Self {
        Self {
            recipient,
            call_id: None,
            status: CallStatus::Unknown,
            outcome: None,
            error: None,
            placed_at: None,
        }
    }

    pub fn skip(&mut self) {
        self.status = CallStatus::Canceled;
        self.outcome = Some(AttemptOutcome::Skipped);
    }

    pub fn dialed(&mut self, call_id: String) {
        self.call_id = Some(call_id);
        self.status = CallStatus::Initiated;
        self.placed_at = Some(Instant::now());
    }

    /// Classify a terminal status: only `Completed` is a delivery.
    pub fn conclude(&mut self, status: CallStatus) {
        self.status = status;
        self.outcome = Some(if status.is_success() {
            AttemptOutcome::Delivered
        } else {
            AttemptOutcome::Failed
        });
    }

    pub fn fail(&mut self, error: CallError) {
        if let CallError::PollTimeout { last_status, .. } = &error {
            self.status = *last_status;
        }
        self.error = Some(error);
        self.outcome = Some(AttemptOutcome::Failed);
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(AttemptOutcome::Delivered)
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == Some(AttemptOutcome::Skipped)
    }

    /// Seconds since the call was placed, if it was.
    pub fn call_duration_secs(&self) -> Option<f64> {
        self.placed_at.map(|t| t.elapsed().as_secs_f64())
    }

    /// Label for outcome metrics.
    pub fn outcome_label(&self) -> &'static str {
        match (&self.outcome, &self.error) {
            (Some(AttemptOutcome::Skipped), _) => "skipped",
            (_, Some(error)) => error.label(),
            _ => self.status.as_str(),
        }
    }

    /// The log line this attempt commits to.
    pub fn to_record(&self) -> OutcomeRecord {
        let call_id = self.call_id.as_deref();
        match (&self.outcome, &self.error) {
            (Some(AttemptOutcome::Skipped), _) => OutcomeRecord::skipped(&self.recipient),
            (Some(AttemptOutcome::Delivered), _) => {
                OutcomeRecord::success(&self.recipient, call_id.unwrap_or_default(), self.status)
            }
            (_, Some(error)) => OutcomeRecord::failure(&self.recipient, call_id, &error.reason()),
            _ => OutcomeRecord::failure(&self.recipient, call_id, self.status.as_str()),
        }
    }
}
