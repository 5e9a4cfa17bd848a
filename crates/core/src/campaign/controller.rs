//! Campaign controller: validates a run, spawns the worker pool and the
//! progress observer, and hands back a handle for progress and cancel.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::outcome::OutcomeSink;
use crate::recipient::Recipient;
use crate::telephony::TelephonyClient;
use crate::tts::SpeechSynthesizer;
use crate::webhook::WebhookEndpoints;

use super::config::CampaignConfig;
use super::error::CampaignError;
use super::poller::CallStatusPoller;
use super::state::CampaignState;
use super::types::{CallerId, CampaignProgress, CampaignSummary};
use super::worker::{DispatchContext, DispatchWorker};

/// Owns the collaborators of one campaign. Consumed by [`CampaignController::start`];
/// a new campaign needs a new controller.
pub struct CampaignController {
    config: CampaignConfig,
    caller: CallerId,
    endpoints: WebhookEndpoints,
    telephony: Arc<dyn TelephonyClient>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn OutcomeSink>,
}

impl CampaignController {
    /// Create a new controller.
    pub fn new(
        config: CampaignConfig,
        caller: CallerId,
        endpoints: WebhookEndpoints,
        telephony: Arc<dyn TelephonyClient>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn OutcomeSink>,
    ) -> Self {
        Self {
            config,
            caller,
            endpoints,
            telephony,
            synthesizer,
            sink,
        }
    }

    fn validate(&self, recipients: &[Recipient], script: &str) -> Result<(), CampaignError> {
        if recipients.is_empty() {
            return Err(CampaignError::Configuration(
                "no recipients to call".to_string(),
            ));
        }
        if script.trim().is_empty() {
            return Err(CampaignError::Configuration("script is empty".to_string()));
        }
        if self.config.poll_interval_ms == 0 {
            return Err(CampaignError::Configuration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.caller.from_number.trim().is_empty() {
            return Err(CampaignError::Configuration(
                "caller number is not set".to_string(),
            ));
        }
        self.telephony
            .validate()
            .map_err(|e| CampaignError::Configuration(e.to_string()))?;
        Ok(())
    }

    /// Start dispatching `recipients` with `concurrency` workers.
    ///
    /// Fails synchronously with [`CampaignError::Configuration`] before
    /// anything is enqueued. Must be called from within a Tokio runtime.
    pub fn start(
        self,
        recipients: Vec<Recipient>,
        script: &str,
        concurrency: usize,
    ) -> Result<CampaignHandle, CampaignError> {
        self.validate(&recipients, script)?;

        let concurrency = if concurrency == 0 {
            warn!("Concurrency must be at least 1, using 1");
            1
        } else {
            concurrency
        };

        let campaign_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = recipients.len();
        let state = Arc::new(CampaignState::new(recipients));

        let mut poller = CallStatusPoller::new(
            Arc::clone(&self.telephony),
            self.config.poll_interval(),
            self.config.max_wait(),
        );
        if self.config.abandon_in_flight_on_cancel {
            poller = poller.with_cancel(state.subscribe_cancel());
        }

        let ctx = Arc::new(DispatchContext {
            script: script.trim().to_string(),
            personalize: self.config.personalize,
            caller: self.caller,
            endpoints: self.endpoints,
            telephony: self.telephony,
            synthesizer: self.synthesizer,
            sink: self.sink,
            poller,
            shared_audio: OnceCell::new(),
        });

        info!(
            "Starting campaign {}: {} recipients, {} workers",
            campaign_id, total, concurrency
        );

        let (summary_tx, summary_rx) = watch::channel(None);

        let workers: Vec<JoinHandle<()>> = (0..concurrency)
            .map(|id| {
                let worker = DispatchWorker::new(id, Arc::clone(&state), Arc::clone(&ctx));
                tokio::spawn(worker.run())
            })
            .collect();

        let observer = tokio::spawn(observe_progress(
            campaign_id,
            Arc::clone(&state),
            self.config.progress_interval(),
            summary_rx.clone(),
        ));

        let supervisor_state = Arc::clone(&state);
        tokio::spawn(async move {
            for (id, result) in join_all(workers).await.into_iter().enumerate() {
                if let Err(e) = result {
                    error!("Dispatch worker {} terminated abnormally: {}", id, e);
                }
            }

            supervisor_state.mark_finished();
            let summary = supervisor_state.summary(campaign_id, started_at, Utc::now());
            info!(
                "Campaign {} finished: {} completed, {} failed ({} skipped), cancelled={}",
                summary.campaign_id,
                summary.completed,
                summary.failed,
                summary.skipped,
                summary.cancelled
            );
            if summary.is_degraded() {
                error!(
                    "Campaign {}: {} outcomes could not be written to the logs",
                    summary.campaign_id, summary.persistence_failures
                );
            }
            summary_tx.send_replace(Some(summary));

            if let Err(e) = observer.await {
                warn!("Progress observer ended abnormally: {}", e);
            }
        });

        Ok(CampaignHandle {
            id: campaign_id,
            state,
            summary_rx,
        })
    }
}

/// Log progress on a fixed cadence until the campaign summary is published.
async fn observe_progress(
    campaign_id: Uuid,
    state: Arc<CampaignState>,
    interval: Duration,
    mut summary_rx: watch::Receiver<Option<CampaignSummary>>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let progress = state.snapshot();
                info!(
                    "Campaign {}: {:.1}% ({}/{}), {} in progress, {} failed",
                    campaign_id,
                    progress.percent(),
                    progress.processed(),
                    progress.total,
                    progress.in_progress,
                    progress.failed
                );
            }
            changed = summary_rx.changed() => {
                if changed.is_err() || summary_rx.borrow().is_some() {
                    break;
                }
            }
        }
    }
}

/// Host-side handle to a running campaign. Cheap to clone.
#[derive(Clone)]
pub struct CampaignHandle {
    id: Uuid,
    state: Arc<CampaignState>,
    summary_rx: watch::Receiver<Option<CampaignSummary>>,
}

impl CampaignHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the campaign to stop dialing. Recipients not yet dialed are
    /// recorded as skipped; calls already placed are polled to the end
    /// unless the campaign abandons in-flight calls on cancel.
    pub fn request_cancel(&self) {
        if self.state.request_cancel() {
            info!("Cancel requested for campaign {}", self.id);
        }
    }

    /// Point-in-time snapshot; safe to call frequently.
    pub fn progress(&self) -> CampaignProgress {
        self.state.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Wait until every worker has exited and return the final summary.
    pub async fn wait(&self) -> Result<CampaignSummary, CampaignError> {
        let mut rx = self.summary_rx.clone();
        let summary = match rx.wait_for(Option::is_some).await {
            Ok(summary) => summary.clone(),
            Err(_) => None,
        };
        summary.ok_or(CampaignError::Interrupted)
    }
}
