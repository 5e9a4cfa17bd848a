//! Dispatch worker: drains the queue one recipient at a time.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use crate::metrics::{
    CALLS_PLACED, CALL_DURATION, CALL_OUTCOMES, OUTCOME_WRITE_FAILURES, SYNTHESIS_REQUESTS,
};
use crate::outcome::OutcomeSink;
use crate::recipient::Recipient;
use crate::telephony::{PlaceCallRequest, TelephonyClient};
use crate::tts::{AudioRef, SpeechSynthesizer};
use crate::webhook::WebhookEndpoints;

use super::error::CallError;
use super::poller::CallStatusPoller;
use super::state::CampaignState;
use super::types::{CallAttempt, CallerId};

/// Placeholder replaced by the recipient in personalized scripts.
pub const RECIPIENT_PLACEHOLDER: &str = "{recipient}";

/// Everything a worker needs that is fixed for the whole campaign.
pub(crate) struct DispatchContext {
    pub(crate) script: String,
    pub(crate) personalize: bool,
    pub(crate) caller: CallerId,
    pub(crate) endpoints: WebhookEndpoints,
    pub(crate) telephony: Arc<dyn TelephonyClient>,
    pub(crate) synthesizer: Arc<dyn SpeechSynthesizer>,
    pub(crate) sink: Arc<dyn OutcomeSink>,
    pub(crate) poller: CallStatusPoller,
    /// Campaign-wide audio, synthesized by whichever worker needs it first.
    pub(crate) shared_audio: OnceCell<Result<AudioRef, String>>,
}

pub(crate) struct DispatchWorker {
    id: usize,
    state: Arc<CampaignState>,
    ctx: Arc<DispatchContext>,
}

impl DispatchWorker {
    pub(crate) fn new(id: usize, state: Arc<CampaignState>, ctx: Arc<DispatchContext>) -> Self {
        Self { id, state, ctx }
    }

    /// Run until the queue is empty.
    pub(crate) async fn run(self) {
        debug!("Dispatch worker {} started", self.id);
        let mut handled = 0usize;

        while let Some(recipient) = self.state.claim() {
            let attempt = self.process(recipient).await;
            self.report(attempt).await;
            handled += 1;
        }

        debug!(
            "Dispatch worker {} finished after {} recipients",
            self.id, handled
        );
    }

    async fn process(&self, recipient: Recipient) -> CallAttempt {
        let mut attempt = CallAttempt::new(recipient);

        if self.state.is_cancel_requested() {
            debug!("Skipping {}: campaign cancelled", attempt.recipient);
            attempt.skip();
            return attempt;
        }

        let audio = match self.audio_for(&attempt.recipient).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!("No audio for {}: {}", attempt.recipient, e);
                attempt.fail(e);
                return attempt;
            }
        };

        // Synthesis can take a while; a cancel that landed meanwhile still
        // comes before the dial.
        if self.state.is_cancel_requested() {
            debug!("Skipping {}: campaign cancelled", attempt.recipient);
            attempt.skip();
            return attempt;
        }

        let request = PlaceCallRequest {
            to: attempt.recipient.to_e164(&self.ctx.caller.country_code),
            from: self.ctx.caller.from_number.clone(),
            audio_url: self.ctx.endpoints.audio_url(&audio),
            status_callback_url: self.ctx.endpoints.status_callback_url(),
        };

        let call_id = match self.ctx.telephony.place_call(&request).await {
            Ok(call_id) => call_id,
            Err(e) => {
                warn!("Failed to place call to {}: {}", attempt.recipient, e);
                attempt.fail(CallError::Dial(e.to_string()));
                return attempt;
            }
        };
        CALLS_PLACED.inc();
        info!(
            "Worker {} placed call {} to {}",
            self.id, call_id, attempt.recipient
        );
        attempt.dialed(call_id.clone());

        match self.ctx.poller.poll_until_terminal(&call_id).await {
            Ok(status) => {
                info!("Call {} to {} ended: {}", call_id, attempt.recipient, status);
                attempt.conclude(status);
            }
            Err(e) => {
                warn!("Call {} to {} failed: {}", call_id, attempt.recipient, e);
                attempt.fail(e);
            }
        }

        attempt
    }

    /// Per-recipient audio when personalizing, otherwise the shared campaign audio.
    async fn audio_for(&self, recipient: &Recipient) -> Result<AudioRef, CallError> {
        if self.ctx.personalize {
            let text = personalize_script(&self.ctx.script, recipient);
            return synthesize(self.ctx.synthesizer.as_ref(), &text)
                .await
                .map_err(CallError::Synthesis);
        }

        self.ctx
            .shared_audio
            .get_or_init(|| synthesize(self.ctx.synthesizer.as_ref(), &self.ctx.script))
            .await
            .clone()
            .map_err(CallError::Synthesis)
    }

    /// Commit the attempt to the outcome log, then to the counters.
    async fn report(&self, attempt: CallAttempt) {
        let record = attempt.to_record();
        CALL_OUTCOMES
            .with_label_values(&[attempt.outcome_label()])
            .inc();
        if let Some(secs) = attempt.call_duration_secs() {
            let result = if attempt.is_success() { "success" } else { "failed" };
            CALL_DURATION.with_label_values(&[result]).observe(secs);
        }

        let persisted = match self.ctx.sink.append(&record).await {
            Ok(()) => true,
            Err(e) => {
                OUTCOME_WRITE_FAILURES.inc();
                error!(
                    "Failed to persist outcome for {} ({},{}): {}",
                    record.recipient, record.call_ref, record.detail, e
                );
                false
            }
        };

        self.state
            .finish(attempt.is_success(), attempt.is_skipped(), persisted);
    }
}

async fn synthesize(synthesizer: &dyn SpeechSynthesizer, text: &str) -> Result<AudioRef, String> {
    match synthesizer.synthesize(text).await {
        Ok(audio) => {
            SYNTHESIS_REQUESTS.with_label_values(&["success"]).inc();
            debug!("Synthesized audio {}", audio.file_name);
            Ok(audio)
        }
        Err(e) => {
            SYNTHESIS_REQUESTS.with_label_values(&["failure"]).inc();
            error!("Speech synthesis via {} failed: {}", synthesizer.name(), e);
            Err(e.to_string())
        }
    }
}

/// Substitute the recipient into a personalized script.
pub fn personalize_script(script: &str, recipient: &Recipient) -> String {
    script.replace(RECIPIENT_PLACEHOLDER, recipient.as_str())
}
