//! Polls one in-flight call until the provider reports a terminal status.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::{POLL_PROVIDER_ERRORS, POLL_TIMEOUTS};
use crate::telephony::{CallStatus, TelephonyClient};

use super::error::CallError;

/// Fixed-cadence status poller with a hard per-call time budget.
#[derive(Clone)]
pub struct CallStatusPoller {
    telephony: Arc<dyn TelephonyClient>,
    poll_interval: Duration,
    max_wait: Duration,
    cancel: Option<watch::Receiver<bool>>,
}

impl CallStatusPoller {
    pub fn new(telephony: Arc<dyn TelephonyClient>, poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            telephony,
            poll_interval,
            max_wait,
            cancel: None,
        }
    }

    /// Stop waiting between polls once `cancel` turns true.
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Poll `call_id` until a terminal status or until `max_wait` elapses.
    ///
    /// Transient provider errors are retried within the remaining budget;
    /// any other provider error ends the poll with `StatusRejected`. If the budget
    /// runs out right after a provider error the result is
    /// `TransientProvider`, otherwise `PollTimeout`. A single status request
    /// is never allowed to outlive the budget.
    pub async fn poll_until_terminal(&self, call_id: &str) -> Result<CallStatus, CallError> {
        let started = Instant::now();
        let deadline = started + self.max_wait;
        let mut cancel = self.cancel.clone();
        let mut last_status = CallStatus::Unknown;
        let mut last_error: Option<String> = None;

        loop {
            let budget = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(budget, self.telephony.get_call_status(call_id)).await {
                Ok(Ok(status)) if status.is_terminal() => {
                    debug!("Call {} reached terminal status {}", call_id, status);
                    return Ok(status);
                }
                Ok(Ok(status)) => {
                    if status != last_status {
                        debug!("Call {} is {}", call_id, status);
                    }
                    last_status = status;
                    last_error = None;
                }
                Ok(Err(e)) if !e.is_transient() => {
                    POLL_PROVIDER_ERRORS.inc();
                    warn!("Status check for call {} rejected: {}", call_id, e);
                    return Err(CallError::StatusRejected {
                        call_id: call_id.to_string(),
                        message: e.to_string(),
                    });
                }
                Ok(Err(e)) => {
                    POLL_PROVIDER_ERRORS.inc();
                    warn!("Status check for call {} failed: {}", call_id, e);
                    last_error = Some(e.to_string());
                }
                Err(_) => {
                    debug!("Status request for call {} outlived the polling budget", call_id);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                POLL_TIMEOUTS.inc();
                let call_id = call_id.to_string();
                return Err(match last_error {
                    Some(message) => CallError::TransientProvider { call_id, message },
                    None => CallError::PollTimeout {
                        call_id,
                        waited_secs: started.elapsed().as_secs(),
                        last_status,
                    },
                });
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval.min(remaining)) => {}
                _ = cancelled(&mut cancel) => {
                    info!("Stopped polling call {} after cancel", call_id);
                    return Err(CallError::Abandoned {
                        call_id: call_id.to_string(),
                    });
                }
            }
        }
    }
}

/// Resolves once the cancel flag is set; never resolves without a receiver.
async fn cancelled(cancel: &mut Option<watch::Receiver<bool>>) {
    match cancel {
        Some(rx) => {
            if rx.wait_for(|requested| *requested).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending().await,
    }
}
