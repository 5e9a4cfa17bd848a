//! Mock telephony client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::telephony::{CallStatus, PlaceCallRequest, TelephonyClient, TelephonyError};

/// A recorded call placement for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// The request that was made.
    pub request: PlaceCallRequest,
    /// Call id handed back.
    pub call_id: String,
    /// When the request was made.
    pub timestamp: chrono::DateTime<Utc>,
}

/// Internal state for a placed mock call.
#[derive(Debug, Clone)]
struct MockCall {
    to: String,
    /// Remaining statuses; the last one repeats forever.
    statuses: VecDeque<CallStatus>,
    status_requests: usize,
}

/// Transient failures injected into status polls.
#[derive(Debug, Clone)]
struct PollFailure {
    remaining: usize,
    error: TelephonyError,
}

/// Mock implementation of the TelephonyClient trait.
///
/// Behaviour is scripted per destination (`PlaceCallRequest::to`):
/// - Sequence of statuses returned by successive status polls
/// - Placement failures
/// - Transient status poll failures
/// - Artificial latency
///
/// Destinations without a script complete on the first poll.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTelephonyClient::new();
/// client.set_statuses("+15559876543", vec![CallStatus::Ringing, CallStatus::Busy]).await;
///
/// let call_id = client.place_call(&request).await?;
/// assert_eq!(client.placed_calls().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockTelephonyClient {
    /// Recorded place_call requests.
    placed: Arc<RwLock<Vec<RecordedCall>>>,
    /// Live calls by call id.
    calls: Arc<RwLock<HashMap<String, MockCall>>>,
    /// Status scripts by destination.
    scripts: Arc<RwLock<HashMap<String, Vec<CallStatus>>>>,
    /// Placement errors by destination.
    place_errors: Arc<RwLock<HashMap<String, TelephonyError>>>,
    /// Status poll errors by destination.
    poll_failures: Arc<RwLock<HashMap<String, PollFailure>>>,
    /// Simulated latency of place_call.
    place_delay: Arc<RwLock<Duration>>,
    /// Simulated latency of get_call_status.
    status_delay: Arc<RwLock<Duration>>,
    /// Counter for generating unique call ids.
    call_counter: Arc<RwLock<u32>>,
    /// Whether validate() succeeds.
    configured: Arc<RwLock<bool>>,
}

impl Default for MockTelephonyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTelephonyClient {
    /// Create a new mock telephony client.
    pub fn new() -> Self {
        Self {
            placed: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(HashMap::new())),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            place_errors: Arc::new(RwLock::new(HashMap::new())),
            poll_failures: Arc::new(RwLock::new(HashMap::new())),
            place_delay: Arc::new(RwLock::new(Duration::ZERO)),
            status_delay: Arc::new(RwLock::new(Duration::ZERO)),
            call_counter: Arc::new(RwLock::new(0)),
            configured: Arc::new(RwLock::new(true)),
        }
    }

    /// Create a mock whose credentials are missing.
    pub fn unconfigured() -> Self {
        Self {
            configured: Arc::new(RwLock::new(false)),
            ..Self::new()
        }
    }

    /// Script the statuses returned for calls to `to`.
    pub async fn set_statuses(&self, to: &str, statuses: Vec<CallStatus>) {
        self.scripts.write().await.insert(to.to_string(), statuses);
    }

    /// Make placing a call to `to` fail.
    pub async fn fail_place_call(&self, to: &str, error: TelephonyError) {
        self.place_errors
            .write()
            .await
            .insert(to.to_string(), error);
    }

    /// Make the first `count` status polls for calls to `to` fail.
    pub async fn fail_status_polls(&self, to: &str, count: usize, error: TelephonyError) {
        self.poll_failures.write().await.insert(
            to.to_string(),
            PollFailure {
                remaining: count,
                error,
            },
        );
    }

    /// Set the simulated latency of placing a call.
    pub async fn set_place_delay(&self, delay: Duration) {
        *self.place_delay.write().await = delay;
    }

    /// Set the simulated latency of a status poll.
    pub async fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.write().await = delay;
    }

    /// Get all recorded placements.
    pub async fn placed_calls(&self) -> Vec<RecordedCall> {
        self.placed.read().await.clone()
    }

    /// Get the number of calls placed.
    pub async fn placed_count(&self) -> usize {
        self.placed.read().await.len()
    }

    /// Number of status requests made for `call_id`.
    pub async fn status_request_count(&self, call_id: &str) -> usize {
        self.calls
            .read()
            .await
            .get(call_id)
            .map(|c| c.status_requests)
            .unwrap_or(0)
    }
}

#[async_trait]
impl TelephonyClient for MockTelephonyClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn place_call(&self, request: &PlaceCallRequest) -> Result<String, TelephonyError> {
        let delay = *self.place_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.place_errors.read().await.get(&request.to) {
            return Err(err.clone());
        }

        let call_id = {
            let mut counter = self.call_counter.write().await;
            *counter += 1;
            format!("CA{:032}", *counter)
        };

        let statuses = self
            .scripts
            .read()
            .await
            .get(&request.to)
            .cloned()
            .unwrap_or_else(|| vec![CallStatus::Completed]);

        self.calls.write().await.insert(
            call_id.clone(),
            MockCall {
                to: request.to.clone(),
                statuses: statuses.into(),
                status_requests: 0,
            },
        );
        self.placed.write().await.push(RecordedCall {
            request: request.clone(),
            call_id: call_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(call_id)
    }

    async fn get_call_status(&self, call_id: &str) -> Result<CallStatus, TelephonyError> {
        let delay = *self.status_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut calls = self.calls.write().await;
        let call = calls
            .get_mut(call_id)
            .ok_or_else(|| TelephonyError::CallNotFound(call_id.to_string()))?;
        call.status_requests += 1;

        if let Some(failure) = self.poll_failures.write().await.get_mut(&call.to) {
            if failure.remaining > 0 {
                failure.remaining -= 1;
                return Err(failure.error.clone());
            }
        }

        let status = if call.statuses.len() > 1 {
            call.statuses.pop_front()
        } else {
            call.statuses.front().copied()
        };
        Ok(status.unwrap_or(CallStatus::Unknown))
    }

    fn validate(&self) -> Result<(), TelephonyError> {
        match self.configured.try_read() {
            Ok(configured) if *configured => Ok(()),
            _ => Err(TelephonyError::NotConfigured(
                "mock credentials missing".to_string(),
            )),
        }
    }
}
