//! Types for the telephony provider abstraction.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a telephony provider.
#[derive(Debug, Clone, Error)]
pub enum TelephonyError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider refused the request (invalid number, unverified caller id, ...).
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Call not found: {0}")]
    CallNotFound(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Telephony client not configured: {0}")]
    NotConfigured(String),
}

impl TelephonyError {
    /// Whether a repeated request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout | Self::ApiError(_)
        )
    }
}

/// Lifecycle status of a call as reported by the provider.
///
/// Wire names follow the provider's lowercase, hyphenated convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    #[serde(alias = "in-progress")]
    Answered,
    Completed,
    Failed,
    Busy,
    NoAnswer,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl CallStatus {
    /// Terminal statuses end polling; everything else needs another look.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Busy | Self::NoAnswer | Self::Canceled
        )
    }

    /// Only a completed call counts as delivered.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Initiated => "initiated",
            Self::Ringing => "ringing",
            Self::Answered => "answered",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Busy => "busy",
            Self::NoAnswer => "no-answer",
            Self::Canceled => "canceled",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a provider status string. Unrecognized values map to `Unknown`.
    pub fn from_wire(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Self::Queued,
            "initiated" => Self::Initiated,
            "ringing" => Self::Ringing,
            "answered" | "in-progress" => Self::Answered,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "busy" => Self::Busy,
            "no-answer" => Self::NoAnswer,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to place one outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceCallRequest {
    /// Destination in E.164 form (`+15551234567`).
    pub to: String,
    /// Caller id in E.164 form.
    pub from: String,
    /// Publicly reachable URL of the audio to play once answered.
    pub audio_url: String,
    /// Endpoint the provider posts status changes to.
    pub status_callback_url: String,
}

/// Telephony provider capable of placing calls and reporting their status.
#[async_trait]
pub trait TelephonyClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Place a call and return the provider-assigned call id.
    async fn place_call(&self, request: &PlaceCallRequest) -> Result<String, TelephonyError>;

    /// Fetch the current status of a call.
    async fn get_call_status(&self, call_id: &str) -> Result<CallStatus, TelephonyError>;

    /// Check that credentials are present before any call is placed.
    fn validate(&self) -> Result<(), TelephonyError>;
}
